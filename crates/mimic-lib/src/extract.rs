//! Turn-pair extraction.
//!
//! Given every exported message and the id of the speaker being modelled, the
//! extractor:
//!
//! 1. stable-sorts messages by timestamp text (ISO-8601 sorts chronologically
//!    as a string; missing timestamps are empty and sort first, ties keep
//!    arrival order);
//! 2. for every speaker message, walks backward to the nearest earlier message
//!    in the same channel and stops there, whoever wrote it;
//! 3. emits `(respondent text, speaker text)` when that neighbour is a
//!    qualifying respondent and both trimmed texts are non-empty.
//!
//! Messages from other channels are invisible to the backward walk. The walk
//! never continues past the first same-channel message, so each speaker
//! message yields at most one pair.

use serde::Serialize;
use tracing::debug;

use crate::model::export_message::ExportMessage;
use crate::model::turn_pair::TurnPair;

/// Who is being modelled, and optionally whose messages may serve as prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Author id of the speaker whose replies are collected.
    pub speaker_id: String,
    /// When set, only messages from this author qualify as the respondent side.
    /// When `None`, any author other than the speaker qualifies.
    pub respondent_id: Option<String>,
}

impl ExtractConfig {
    pub fn new(speaker_id: impl Into<String>) -> Self {
        ExtractConfig {
            speaker_id: speaker_id.into(),
            respondent_id: None,
        }
    }

    pub fn with_respondent(mut self, respondent_id: impl Into<String>) -> Self {
        self.respondent_id = Some(respondent_id.into());
        self
    }

    fn qualifies_as_respondent(&self, msg: &ExportMessage) -> bool {
        match (&self.respondent_id, msg.author_id.as_deref()) {
            (None, _) => true,
            (Some(wanted), Some(author)) => wanted == author,
            (Some(_), None) => false,
        }
    }
}

/// Counters describing one extraction run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub messages_scanned: usize,
    pub speaker_messages: usize,
    pub pairs_emitted: usize,
    /// Speaker messages with no earlier message in their channel (or no channel).
    pub no_predecessor: usize,
    /// Scans that stopped on an earlier speaker message.
    pub stopped_at_speaker: usize,
    /// Scans that stopped on a respondent excluded by `respondent_id`.
    pub stopped_at_filtered: usize,
    /// Candidate pairs dropped because one side was blank after trimming.
    pub dropped_empty: usize,
}

/// How the backward walk from one speaker message ended.
enum ScanOutcome<'a> {
    Respondent(&'a ExportMessage),
    Speaker,
    Filtered,
    Nothing,
}

/// Stable-sort `messages` by timestamp text, ascending.
pub fn sort_chronologically(messages: &mut [ExportMessage]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}

/// Extract turn-pairs from an unordered message collection.
pub fn extract_pairs(messages: &[ExportMessage], config: &ExtractConfig) -> Vec<TurnPair> {
    extract_pairs_with_stats(messages, config).0
}

/// Same as [`extract_pairs`], also returning run counters.
pub fn extract_pairs_with_stats(
    messages: &[ExportMessage],
    config: &ExtractConfig,
) -> (Vec<TurnPair>, ExtractStats) {
    let mut sorted = messages.to_vec();
    sort_chronologically(&mut sorted);
    pair_sorted(&sorted, config)
}

/// Pair up an already chronologically sorted sequence.
pub fn pair_sorted(
    sorted: &[ExportMessage],
    config: &ExtractConfig,
) -> (Vec<TurnPair>, ExtractStats) {
    let mut stats = ExtractStats {
        messages_scanned: sorted.len(),
        ..ExtractStats::default()
    };
    let mut pairs = Vec::new();

    for (i, msg) in sorted.iter().enumerate() {
        if !msg.is_authored_by(&config.speaker_id) {
            continue;
        }
        stats.speaker_messages = stats.speaker_messages.saturating_add(1);

        match scan_back(sorted, i, config) {
            ScanOutcome::Respondent(prev) => {
                match TurnPair::from_texts(&prev.content, &msg.content) {
                    Some(pair) => {
                        pairs.push(pair);
                        stats.pairs_emitted = stats.pairs_emitted.saturating_add(1);
                    }
                    None => stats.dropped_empty = stats.dropped_empty.saturating_add(1),
                }
            }
            ScanOutcome::Speaker => {
                stats.stopped_at_speaker = stats.stopped_at_speaker.saturating_add(1)
            }
            ScanOutcome::Filtered => {
                stats.stopped_at_filtered = stats.stopped_at_filtered.saturating_add(1)
            }
            ScanOutcome::Nothing => stats.no_predecessor = stats.no_predecessor.saturating_add(1),
        }
    }

    debug!(?stats, "pair extraction finished");
    (pairs, stats)
}

/// Walk backward from `sorted[at]` to the nearest earlier message in its channel.
fn scan_back<'a>(
    sorted: &'a [ExportMessage],
    at: usize,
    config: &ExtractConfig,
) -> ScanOutcome<'a> {
    let Some(channel) = sorted[at].channel_id.as_deref() else {
        return ScanOutcome::Nothing;
    };

    let nearest = sorted[..at]
        .iter()
        .rev()
        .find(|prev| prev.channel_id.as_deref() == Some(channel));

    match nearest {
        None => ScanOutcome::Nothing,
        Some(prev) if prev.is_authored_by(&config.speaker_id) => ScanOutcome::Speaker,
        Some(prev) if config.qualifies_as_respondent(prev) => ScanOutcome::Respondent(prev),
        Some(_) => ScanOutcome::Filtered,
    }
}
