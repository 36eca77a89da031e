/*
Persona configuration and credentials.

- `PersonaConfig` is a plain serde struct; every field has a default so a JSON
  config file only needs the fields it overrides.
- Defaults describe the original deployment (speaker "daniel").
- Credentials come from the environment only. A `.env` file in the working
  directory is loaded first when present.
*/

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractConfig;
use crate::prompt::PersonaPrompt;
use crate::sample::DEFAULT_EXAMPLES;

pub const DEFAULT_SPEAKER_ID: &str = "391754309840404492";
pub const DEFAULT_SPEAKER_NAME: &str = "daniel";
pub const DEFAULT_DISPLAY_NAME: &str = "Daniel";
pub const DEFAULT_PAIRS_FILE: &str = "daniel_pairs_by_channel.json";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1";

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DISCORD_TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";

/// Persona instruction for the console chat.
pub const CONSOLE_INSTRUCTION: &str = "\
You are Daniel. Reply exactly as Daniel would. You are allowed to curse. You're kind of a \
goober and can sometimes be a bit of a gooner, but only sometimes. When discussing your \
interests, elaborate with detail and personal insight. You're a bit of an airhead too. Talk \
about your interests and your information but don't force topics unless relevant to the \
user's query. dont use big words, make typos relatively often, randomly just make your \
message all caps if you feel like it. youre an airhead remember that. Don't bring it up \
unless necessary, but your favorite gun in destiny 2 is the ether doctor, which is literally \
just a regular AR, not even exotic or anything, so no catalyst and no special perks";

/// Persona instruction for the Discord bot.
pub const DISCORD_INSTRUCTION: &str = "\
You are Daniel. Reply exactly as Daniel would. You are allowed to curse. When ASKED about \
your interests (like games, anime, music, IT studies at CSUN, working at Lorelles Coffee \
Shop, or going to the gym. Your favorite manga is berserk), elaborate with detail and \
personal insight, but do NOT just bring up going to the gym, lorelle's coffee shop, or csun \
for literally no reason. Engage in thoughtful conversation, but don't force topics unless \
relevant to the user's query. Avoid using overly enthusiastic phrases like chefs kiss and \
stuff like that. remember youre like a 20 year old kind of nerdy guy whos an airhead and \
heavy into meme/internet culture, but not corny like reddit dialogue. talk normalish. You \
also don't play any riot games games ie. league and valorant.";

/// Which front-end a persona is serving; picks the built-in instruction and
/// sampling profile when the config file leaves them unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frontend {
    Console,
    Discord,
}

impl Frontend {
    pub fn generation(self) -> GenerationConfig {
        match self {
            Frontend::Console => GenerationConfig::console(),
            Frontend::Discord => GenerationConfig::discord(),
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Frontend::Console => CONSOLE_INSTRUCTION,
            Frontend::Discord => DISCORD_INSTRUCTION,
        }
    }
}

/// Sampling parameters sent with every generation request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature (0.0..2.0).
    pub temperature: f32,
    /// Maximum tokens in the reply.
    pub max_output_tokens: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
}

impl GenerationConfig {
    /// Console profile: livelier, longer replies.
    pub fn console() -> Self {
        GenerationConfig {
            temperature: 0.8,
            max_output_tokens: 400,
            top_p: 0.8,
            top_k: 40,
        }
    }

    /// Bot profile: calmer and shorter, suits a shared channel.
    pub fn discord() -> Self {
        GenerationConfig {
            temperature: 0.6,
            max_output_tokens: 300,
            top_p: 0.5,
            top_k: 40,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::console()
    }
}

/// Everything that identifies and tunes one persona.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Author id of the modelled speaker in the chat exports.
    pub speaker_id: String,
    /// Key for the speaker side in the pair artifact.
    pub speaker_name: String,
    /// Label used in prompts and console output.
    pub display_name: String,
    /// Restrict the respondent side to one author id.
    pub respondent_id: Option<String>,
    /// Persona instruction placed at the top of every prompt.
    /// `None` means "use the front-end's built-in instruction".
    pub instruction: Option<String>,
    /// Pair artifact path.
    pub pairs_file: String,
    /// Few-shot examples per prompt.
    pub examples: usize,
    pub model: String,
    pub api_base: String,
    pub api_version: String,
    /// `None` means "use the front-end's profile" (console or bot).
    pub generation: Option<GenerationConfig>,
    pub request_timeout_secs: u64,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        PersonaConfig {
            speaker_id: DEFAULT_SPEAKER_ID.to_string(),
            speaker_name: DEFAULT_SPEAKER_NAME.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            respondent_id: None,
            instruction: None,
            pairs_file: DEFAULT_PAIRS_FILE.to_string(),
            examples: DEFAULT_EXAMPLES,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            generation: None,
            request_timeout_secs: 60,
            max_retries: 1,
        }
    }
}

impl PersonaConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            speaker_id: self.speaker_id.clone(),
            respondent_id: self.respondent_id.clone(),
        }
    }

    /// Prompt template, using the front-end's instruction when the file sets none.
    pub fn persona_prompt(&self, frontend: Frontend) -> PersonaPrompt {
        let instruction = self
            .instruction
            .clone()
            .unwrap_or_else(|| frontend.instruction().to_string());
        PersonaPrompt::new(instruction, self.display_name.clone())
    }

    /// Generation parameters, falling back to the front-end's profile when the file sets none.
    pub fn generation_for(&self, frontend: Frontend) -> GenerationConfig {
        self.generation.clone().unwrap_or_else(|| frontend.generation())
    }
}

/// Secrets read from the environment.
pub struct Credentials;

impl Credentials {
    /// Load `.env` from the working directory if there is one.
    pub fn load_dotenv() {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
    }

    pub fn gemini_api_key() -> Result<String> {
        Self::required(GEMINI_API_KEY_VAR)
    }

    pub fn discord_token() -> Result<String> {
        Self::required(DISCORD_TOKEN_VAR)
    }

    fn required(var: &str) -> Result<String> {
        match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => anyhow::bail!(
                "{var} is not set. Export it (bash: export {var}=...; PowerShell: $env:{var}='...') or add it to a .env file"
            ),
        }
    }
}
