use serde::{Deserialize, Serialize};

/// One few-shot example: what a respondent said and how the speaker answered.
///
/// Both sides are trimmed and non-empty. Provenance (channel, time, ids) is
/// dropped at extraction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPair {
    /// Respondent text (the `user` side of the persisted artifact).
    pub user: String,
    /// Speaker text, persisted under the speaker's name.
    pub speaker: String,
}

impl TurnPair {
    /// Trim both sides and build a pair, or `None` when either side is empty.
    pub fn from_texts(user: &str, speaker: &str) -> Option<Self> {
        let user = user.trim();
        let speaker = speaker.trim();
        if user.is_empty() || speaker.is_empty() {
            return None;
        }
        Some(TurnPair {
            user: user.to_string(),
            speaker: speaker.to_string(),
        })
    }
}
