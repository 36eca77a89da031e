//! CLI for mimic.
//!
//! Subcommands:
//!  - `pairs`  : scan a directory of chat exports and write the turn-pair artifact.
//!  - `chat`   : console chat with the persona (few-shot prompted from the artifact).
//!  - `prompt` : print the prompt that would be sent for a query, without calling the model.
//!  - `models` : list hosted models available to the API key that support `generateContent`.
//!
//! Usage examples:
//!  mimic pairs --dir ./exports
//!  mimic chat --pairs daniel_pairs_by_channel.json
//!
//! Credentials (`GEMINI_API_KEY`) are read from the environment or a `.env` file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

mod chat;

use mimic::config::Frontend;
use mimic::export::{discover_exports, load_corpus, ProgressCallback};
use mimic::gemini::{GeminiClient, GeminiOptions};
use mimic::utils::logging;
use mimic::{
    extract_pairs_with_stats, load_pairs_json, save_pairs_json, Credentials, Persona,
    PersonaConfig,
};

/// CLI entrypoint.
#[derive(Parser)]
#[command(
    name = "mimic",
    about = "mimic: persona chat few-shot prompted from exported chat logs",
    version
)]
struct Cli {
    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract speaker turn-pairs from chat exports and write them to a JSON file.
    Pairs(PairsArgs),

    /// Chat with the persona on the console.
    Chat(PersonaArgs),

    /// Print the few-shot prompt for a query without calling the model.
    Prompt(PromptArgs),

    /// List models available to the API key that support generateContent.
    Models(ModelsArgs),
}

/// Arguments for the `pairs` subcommand.
#[derive(Args, Debug)]
struct PairsArgs {
    /// Directory holding the exported `*.json` chat logs.
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    dir: PathBuf,

    /// Path to write the pair artifact (defaults to the config's `pairs_file`).
    #[arg(long, short = 'o', value_name = "PATH")]
    out: Option<PathBuf>,

    /// Persona config file (JSON).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Author id of the speaker being modelled.
    #[arg(long)]
    speaker_id: Option<String>,

    /// Key used for the speaker side in the artifact.
    #[arg(long)]
    speaker_name: Option<String>,

    /// Only pair speaker messages with replies to this author id.
    #[arg(long)]
    respondent_id: Option<String>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Persona selection shared by `chat` and `prompt`.
#[derive(Args, Debug)]
struct PersonaArgs {
    /// Persona config file (JSON).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pair artifact to sample examples from (defaults to the config's `pairs_file`).
    #[arg(long, value_name = "PATH")]
    pairs: Option<PathBuf>,

    /// Key used for the speaker side in the artifact.
    #[arg(long)]
    speaker_name: Option<String>,

    /// Name the persona goes by in prompts and output.
    #[arg(long)]
    display_name: Option<String>,

    /// Model name, e.g. gemini-1.5-flash.
    #[arg(long)]
    model: Option<String>,

    /// Few-shot examples per prompt.
    #[arg(long)]
    examples: Option<usize>,
}

/// Arguments for the `prompt` subcommand.
#[derive(Args, Debug)]
struct PromptArgs {
    #[command(flatten)]
    persona: PersonaArgs,

    /// The message to build a prompt for.
    #[arg(short, long)]
    query: String,
}

/// Arguments for the `models` subcommand.
#[derive(Args, Debug)]
struct ModelsArgs {
    /// Persona config file (JSON); only the API settings are used.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    json: bool,
}

impl PersonaArgs {
    /// Config file values with command-line overrides applied.
    fn resolve(&self) -> Result<PersonaConfig> {
        let mut cfg = PersonaConfig::load_or_default(self.config.as_deref())?;
        if let Some(name) = &self.speaker_name {
            cfg.speaker_name = name.clone();
        }
        if let Some(name) = &self.display_name {
            cfg.display_name = name.clone();
        }
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(k) = self.examples {
            cfg.examples = k;
        }
        if let Some(p) = &self.pairs {
            cfg.pairs_file = p.display().to_string();
        }
        Ok(cfg)
    }
}

/// Application entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep console chat readable unless RUST_LOG asks for more.
    let filter = match &cli.command {
        Commands::Chat(_) | Commands::Prompt(_) => "warn",
        Commands::Pairs(_) | Commands::Models(_) => "info",
    };
    logging::init(filter);
    Credentials::load_dotenv();

    match cli.command {
        Commands::Pairs(args) => run_pairs(args),
        Commands::Chat(args) => run_chat(args),
        Commands::Prompt(args) => run_prompt(args),
        Commands::Models(args) => run_models(args),
    }
}

/// Run the `pairs` subcommand.
///
/// This function:
/// 1. Discovers export documents in `--dir` (skipping the output file).
/// 2. Loads and normalizes every document; any bad document aborts the run.
/// 3. Extracts turn-pairs for the configured speaker.
/// 4. Writes the artifact and prints a summary.
fn run_pairs(args: PairsArgs) -> Result<()> {
    let mut cfg = PersonaConfig::load_or_default(args.config.as_deref())?;
    if let Some(id) = args.speaker_id {
        cfg.speaker_id = id;
    }
    if let Some(name) = args.speaker_name {
        cfg.speaker_name = name;
    }
    if args.respondent_id.is_some() {
        cfg.respondent_id = args.respondent_id;
    }
    let out = args.out.unwrap_or_else(|| args.dir.join(&cfg.pairs_file));

    let paths = discover_exports(&args.dir, std::slice::from_ref(&out))
        .with_context(|| format!("scanning {} for exports", args.dir.display()))?;
    if !args.json {
        println!("Found {} JSON files in {}.", paths.len(), args.dir.display());
    }

    let corpus = load_with_progress(&paths, args.json)?;
    if !args.json {
        println!("Loaded a total of {} messages.", corpus.messages.len());
    }

    let (pairs, stats) = extract_pairs_with_stats(&corpus.messages, &cfg.extract_config());
    save_pairs_json(&pairs, &cfg.speaker_name, &out)
        .with_context(|| format!("saving pairs to {}", out.display()))?;

    if args.json {
        let summary = json!({
            "documents": corpus.documents.len(),
            "messages": corpus.messages.len(),
            "pairs": pairs.len(),
            "out": out.display().to_string(),
            "speaker_id": cfg.speaker_id,
            "respondent_id": cfg.respondent_id,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Extract summary: speaker_messages={} pairs={} no_predecessor={} stopped_at_speaker={} stopped_at_filtered={} dropped_empty={}",
            stats.speaker_messages,
            stats.pairs_emitted,
            stats.no_predecessor,
            stats.stopped_at_speaker,
            stats.stopped_at_filtered,
            stats.dropped_empty
        );
        println!("Generated {} pairs in {}", pairs.len(), out.display());
    }
    Ok(())
}

#[cfg(feature = "progress")]
fn load_with_progress(paths: &[PathBuf], quiet: bool) -> Result<mimic::export::Corpus> {
    use indicatif::{ProgressBar, ProgressStyle};

    if quiet || paths.is_empty() {
        return load_corpus(paths, None).context("loading exports");
    }

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("progress bar template")?
            .progress_chars("##-"),
    );

    let total = paths.len();
    let progress_cb: ProgressCallback = Arc::new({
        let bar = bar.clone();
        move |msg: String, fraction: f32| {
            bar.set_message(msg);
            bar.set_position((fraction * total as f32).floor() as u64);
        }
    });

    let corpus = load_corpus(paths, Some(progress_cb));
    match &corpus {
        Ok(_) => bar.finish_with_message("Loaded exports."),
        Err(_) => bar.abandon_with_message("Load failed."),
    }
    corpus.context("loading exports")
}

#[cfg(not(feature = "progress"))]
fn load_with_progress(paths: &[PathBuf], quiet: bool) -> Result<mimic::export::Corpus> {
    let progress_cb: Option<ProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String, _fraction: f32| eprintln!("{msg}")))
    };
    load_corpus(paths, progress_cb).context("loading exports")
}

/// Load the artifact a persona samples from.
fn load_pairs_for(cfg: &PersonaConfig) -> Result<Vec<mimic::TurnPair>> {
    let path = Path::new(&cfg.pairs_file);
    load_pairs_json(path, &cfg.speaker_name).with_context(|| {
        format!(
            "loading pairs from {} (run `mimic pairs` first to build it)",
            path.display()
        )
    })
}

fn gemini_client(cfg: &PersonaConfig) -> Result<GeminiClient> {
    let key = Credentials::gemini_api_key()?;
    let client = GeminiClient::new(key, GeminiOptions::from_config(cfg))
        .context("building model client")?;
    tracing::info!(model = %client.model(), "using model");
    Ok(client)
}

/// Run the `chat` subcommand.
fn run_chat(args: PersonaArgs) -> Result<()> {
    let cfg = args.resolve()?;
    let pairs = load_pairs_for(&cfg)?;
    let client = gemini_client(&cfg)?;
    let persona = Persona::new(
        &cfg,
        Frontend::Console,
        pairs,
        Arc::new(client),
    );

    let rt = tokio::runtime::Runtime::new().context("starting async runtime")?;
    println!(
        "Chat with {} ({} example pairs loaded; type 'quit' to exit)\n",
        persona.display_name(),
        persona.pair_count()
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    chat::chat_loop(stdin.lock(), &mut stdout, persona.display_name(), |query| {
        rt.block_on(persona.reply(query))
    })
    .context("console chat")?;
    Ok(())
}

/// Run the `prompt` subcommand.
fn run_prompt(args: PromptArgs) -> Result<()> {
    let cfg = args.persona.resolve()?;
    let pairs = load_pairs_for(&cfg)?;
    let prompt = cfg.persona_prompt(Frontend::Console);
    println!("{}", prompt.build_sampled(&pairs, cfg.examples, &args.query));
    Ok(())
}

/// Run the `models` subcommand.
fn run_models(args: ModelsArgs) -> Result<()> {
    let cfg = PersonaConfig::load_or_default(args.config.as_deref())?;
    let client = gemini_client(&cfg)?;
    let rt = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let models = rt
        .block_on(client.list_models())
        .context("listing models")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    if models.is_empty() {
        println!("No models support generateContent for this API key.");
        println!("Check the key's project settings, API restrictions and regional availability.");
        return Ok(());
    }

    println!("Available models supporting generateContent:");
    for m in &models {
        println!("  Name: {}", m.name);
        if let Some(display) = &m.display_name {
            println!("  Display Name: {}", display);
        }
        println!(
            "  Supported Methods: {}",
            m.supported_generation_methods.join(", ")
        );
        println!("{}", "-".repeat(40));
    }
    Ok(())
}
