//! Library entry point for mimic: persona chat built from exported chat logs.
//!
//! The pipeline is:
//! - [`export`] loads chat-log exports and normalizes their key casing,
//! - [`extract`] turns the message pile into ordered (respondent, speaker) pairs,
//! - [`save_pairs_json`] / [`load_pairs_json`] persist that list,
//! - [`sample`], [`prompt`], [`gemini`] and [`persona`] turn the pairs into
//!   few-shot prompts and in-character replies.
//
// Public modules
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod gemini;
pub mod model;
pub mod persona;
pub mod prompt;
pub mod sample;
pub mod utils;

// Re-export primary types for ergonomic use.
pub use config::{Credentials, PersonaConfig};
pub use error::{ExportError, GenerateError};
pub use extract::{extract_pairs, extract_pairs_with_stats, ExtractConfig, ExtractStats};
pub use model::{export_message::ExportMessage, turn_pair::TurnPair};
pub use persona::Persona;

use anyhow::{bail, Context, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Key holding the respondent side in the persisted artifact.
pub const USER_KEY: &str = "user";

/// Serializable view of one pair, keyed by the speaker's name.
///
/// The artifact stores `{"user": ..., "<speaker_name>": ...}` so the file reads
/// naturally for whoever is being modelled; the key order is fixed (`user` first).
struct NamedPair<'a> {
    speaker_name: &'a str,
    pair: &'a TurnPair,
}

impl Serialize for NamedPair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(USER_KEY, &self.pair.user)?;
        map.serialize_entry(self.speaker_name, &self.pair.speaker)?;
        map.end()
    }
}

fn check_speaker_name(speaker_name: &str) -> Result<()> {
    if speaker_name.is_empty() || speaker_name == USER_KEY {
        bail!(
            "speaker name must be non-empty and different from '{}' (got '{}')",
            USER_KEY,
            speaker_name
        );
    }
    Ok(())
}

/// Render pairs as the JSON value written to the artifact.
pub fn pairs_to_value(pairs: &[TurnPair], speaker_name: &str) -> Result<Value> {
    check_speaker_name(speaker_name)?;
    let named: Vec<NamedPair<'_>> = pairs
        .iter()
        .map(|pair| NamedPair { speaker_name, pair })
        .collect();
    Ok(serde_json::to_value(named)?)
}

/// Save pairs to a pretty-printed JSON file.
///
/// # Arguments
///
/// * `pairs` - extracted pairs, in extraction order
/// * `speaker_name` - key used for the speaker side of each entry
/// * `path` - filesystem path to write JSON to
///
/// # Notes
///
/// - Output is indented with two spaces and keeps non-ASCII text as-is.
/// - An empty pair list is written as `[]`; it is not an error.
pub fn save_pairs_json(pairs: &[TurnPair], speaker_name: &str, path: &Path) -> Result<()> {
    check_speaker_name(speaker_name)?;
    let named: Vec<NamedPair<'_>> = pairs
        .iter()
        .map(|pair| NamedPair { speaker_name, pair })
        .collect();

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &named)?;
    writer.flush()?;
    Ok(())
}

/// Load pairs from a file previously written with `save_pairs_json`.
///
/// Every entry must carry both `user` and `speaker_name` as strings; the first
/// entry that does not is reported by index.
pub fn load_pairs_json(path: &Path, speaker_name: &str) -> Result<Vec<TurnPair>> {
    check_speaker_name(speaker_name)?;
    let file = File::open(path).with_context(|| format!("opening pairs file {}", path.display()))?;
    let entries: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decoding pairs file {}", path.display()))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let field = |key: &str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .with_context(|| {
                        format!("{}: entry #{} has no string '{}'", path.display(), i, key)
                    })
            };
            Ok(TurnPair {
                user: field(USER_KEY)?,
                speaker: field(speaker_name)?,
            })
        })
        .collect()
}
