// Rust guideline compliant 2026-02-13

mod handler;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mimic::config::Frontend;
use mimic::gemini::{GeminiClient, GeminiOptions};
use mimic::utils::logging;
use mimic::{load_pairs_json, Credentials, Persona, PersonaConfig};
use serenity::all::GatewayIntents;
use serenity::Client;

use crate::handler::PersonaHandler;

/// Discord bot that answers @mentions in the persona's voice.
///
/// Needs `DISCORD_BOT_TOKEN` and `GEMINI_API_KEY` in the environment or a `.env` file.
#[derive(Parser)]
#[command(name = "mimic-discord", version)]
struct Args {
    /// Persona config file (JSON).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pair artifact to sample examples from (defaults to the config's `pairs_file`).
    #[arg(long, value_name = "PATH")]
    pairs: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("info");
    Credentials::load_dotenv();

    let mut cfg = PersonaConfig::load_or_default(args.config.as_deref())?;
    if let Some(p) = args.pairs {
        cfg.pairs_file = p.display().to_string();
    }

    let token = Credentials::discord_token()?;
    let api_key = Credentials::gemini_api_key()?;

    let pairs = load_pairs_json(Path::new(&cfg.pairs_file), &cfg.speaker_name).with_context(|| {
        format!(
            "loading pairs from {} (run `mimic pairs` first to build it)",
            cfg.pairs_file
        )
    })?;
    let client = GeminiClient::new(api_key, GeminiOptions::from_config(&cfg))
        .context("building model client")?;
    tracing::info!(model = %client.model(), pairs = pairs.len(), "persona ready");

    let persona = Persona::new(
        &cfg,
        Frontend::Discord,
        pairs,
        Arc::new(client),
    );

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut bot = Client::builder(&token, intents)
        .event_handler(PersonaHandler::new(Arc::new(persona)))
        .await
        .context("creating Discord client")?;

    bot.start().await.context("Discord client stopped")?;
    Ok(())
}
