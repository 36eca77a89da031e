use anyhow::Result;
use mimic::export::{discover_exports, load_corpus};
use mimic::{
    extract_pairs, load_pairs_json, pairs_to_value, save_pairs_json, ExportError, ExtractConfig,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Fresh scratch directory under the OS temp dir.
fn scratch_dir(tag: &str) -> Result<PathBuf> {
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
    let mut dir = std::env::temp_dir();
    dir.push(format!("mimic_{}_{}_{}", tag, stamp, seq));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Two documents (one list-shaped with an exchange, one empty list) produce
/// exactly one pair, written in the artifact's fixed layout.
#[test]
fn two_documents_produce_expected_artifact() -> Result<()> {
    let dir = scratch_dir("e2e")?;
    fs::write(
        dir.join("a.json"),
        r#"[
            {"author": {"id": "u1"}, "channel_id": "c1", "timestamp": "2024-01-01T00:00:00Z", "content": "hey"},
            {"author": {"id": "daniel"}, "channel_id": "c1", "timestamp": "2024-01-01T00:00:01Z", "content": "hi back"}
        ]"#,
    )?;
    fs::write(dir.join("b.json"), "[]")?;
    let out = dir.join("pairs.json");

    let paths = discover_exports(&dir, &[out.clone()])?;
    assert_eq!(paths.len(), 2);
    let corpus = load_corpus(&paths, None)?;
    let pairs = extract_pairs(&corpus.messages, &ExtractConfig::new("daniel"));
    save_pairs_json(&pairs, "daniel", &out)?;

    let written = fs::read_to_string(&out)?;
    assert_eq!(
        written,
        "[\n  {\n    \"user\": \"hey\",\n    \"daniel\": \"hi back\"\n  }\n]"
    );

    // A re-run over the same directory must not ingest its own artifact.
    let again = discover_exports(&dir, &[out.clone()])?;
    assert_eq!(again, paths);

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

/// Mixed casings across documents, object-shaped wrappers, and messages
/// interleaved between files all resolve through the global timestamp sort.
#[test]
fn mixed_exports_pair_across_documents() -> Result<()> {
    let dir = scratch_dir("mixed")?;
    fs::write(
        dir.join("1_pascal.json"),
        r#"{"Messages": [
            {"Author": {"Id": "42"}, "ChannelId": "c1", "Timestamp": "2024-02-01T10:00:03Z", "Content": "  sure thing  "}
        ]}"#,
    )?;
    fs::write(
        dir.join("2_lower.json"),
        r#"{"messages": [
            {"author": {"id": "7"}, "channel_id": "c1", "timestamp": "2024-02-01T10:00:02Z", "content": "can you help?"},
            {"author": {"id": "8"}, "channel_id": "c2", "timestamp": "2024-02-01T10:00:02.5Z", "content": "other room"}
        ]}"#,
    )?;

    let paths = discover_exports(&dir, &[])?;
    let corpus = load_corpus(&paths, None)?;
    assert_eq!(corpus.messages.len(), 3);
    assert_eq!(corpus.documents.len(), 2);

    let pairs = extract_pairs(&corpus.messages, &ExtractConfig::new("42"));
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].user, "can you help?");
    assert_eq!(pairs[0].speaker, "sure thing");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn malformed_document_aborts_the_load() -> Result<()> {
    let dir = scratch_dir("bad")?;
    fs::write(dir.join("good.json"), "[]")?;
    fs::write(dir.join("oops.json"), "{ not json")?;

    let paths = discover_exports(&dir, &[])?;
    let err = load_corpus(&paths, None).unwrap_err();
    assert!(matches!(err, ExportError::Parse { .. }), "got {err:?}");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn artifact_round_trips_and_keeps_non_ascii() -> Result<()> {
    let dir = scratch_dir("utf8")?;
    fs::write(
        dir.join("chat.json"),
        r#"[
            {"author": {"id": "u1"}, "channel_id": "c", "timestamp": "1", "content": "ça va? 👋"},
            {"author": {"id": "s"}, "channel_id": "c", "timestamp": "2", "content": "très bien"}
        ]"#,
    )?;
    let out = dir.join("out.json");
    let corpus = load_corpus(&discover_exports(&dir, &[])?, None)?;
    let pairs = extract_pairs(&corpus.messages, &ExtractConfig::new("s"));
    save_pairs_json(&pairs, "sam", &out)?;

    let written = fs::read_to_string(&out)?;
    assert!(written.contains("ça va? 👋"));
    assert!(!written.contains("\\u"));

    let on_disk: serde_json::Value = serde_json::from_str(&written)?;
    assert_eq!(on_disk, pairs_to_value(&pairs, "sam")?);
    assert!(pairs_to_value(&pairs, "user").is_err());

    let loaded = load_pairs_json(&out, "sam")?;
    assert_eq!(loaded, pairs);
    assert!(load_pairs_json(&out, "someone_else").is_err());

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
