use anyhow::Result;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn scratch_dir(tag: &str) -> Result<PathBuf> {
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("mimic_cli_{}_{}", tag, stamp));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn mimic(dir: &PathBuf) -> Result<Command> {
    let mut cmd = Command::cargo_bin("mimic")?;
    cmd.current_dir(dir)
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

const EXPORT: &str = r#"{"messages": [
    {"author": {"id": "u1"}, "channel_id": "c1", "timestamp": "2024-01-01T00:00:00Z", "content": "you around?"},
    {"author": {"id": "s1"}, "channel_id": "c1", "timestamp": "2024-01-01T00:00:05Z", "content": "yeah whats up"},
    {"author": {"id": "s1"}, "channel_id": "c1", "timestamp": "2024-01-01T00:00:06Z", "content": "double text"}
]}"#;

/// `mimic pairs` writes the artifact and reports a JSON summary.
#[test]
fn pairs_command_writes_artifact() -> Result<()> {
    let dir = scratch_dir("pairs")?;
    fs::write(dir.join("export.json"), EXPORT)?;
    let out = dir.join("sam_pairs.json");

    let assert = mimic(&dir)?
        .args(["pairs", "--dir", ".", "--speaker-id", "s1", "--speaker-name", "sam", "--json"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let summary: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(summary["documents"], 1);
    assert_eq!(summary["messages"], 3);
    assert_eq!(summary["pairs"], 1);
    assert_eq!(summary["stats"]["stopped_at_speaker"], 1);

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(
        written,
        serde_json::json!([{"user": "you around?", "sam": "yeah whats up"}])
    );

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

/// A broken export aborts the run and no artifact is written.
#[test]
fn pairs_command_fails_on_bad_export() -> Result<()> {
    let dir = scratch_dir("bad")?;
    fs::write(dir.join("broken.json"), "[{")?;

    mimic(&dir)?
        .args(["pairs", "--dir", ".", "--out", "out.json"])
        .assert()
        .failure();
    assert!(!dir.join("out.json").exists());

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

/// `mimic prompt` runs offline against an existing artifact.
#[test]
fn prompt_command_prints_few_shot_prompt() -> Result<()> {
    let dir = scratch_dir("prompt")?;
    fs::write(
        dir.join("pairs.json"),
        r#"[{"user": "gym later?", "sam": "cant, leg day was yesterday"}]"#,
    )?;

    let assert = mimic(&dir)?
        .args([
            "prompt",
            "--pairs",
            "pairs.json",
            "--speaker-name",
            "sam",
            "--display-name",
            "Sam",
            "--query",
            "hi",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    assert!(stdout.contains("User: gym later?\nSam: cant, leg day was yesterday\n"));
    assert!(stdout.trim_end().ends_with("User: hi\nSam:"));

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

/// `mimic chat` refuses to start without an artifact and says how to build one.
#[test]
fn chat_without_pairs_points_at_pairs_command() -> Result<()> {
    let dir = scratch_dir("chat")?;

    let assert = mimic(&dir)?
        .args(["chat", "--pairs", "missing.json"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone())?;
    assert!(stderr.contains("mimic pairs"), "stderr: {stderr}");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
