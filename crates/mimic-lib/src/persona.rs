//! In-character replies: sample examples, build the prompt, call the model.
//!
//! [`Persona::reply`] never fails. Model and transport problems are logged and
//! turned into a short notice in the persona's name, so a console loop or bot
//! handler can always print something.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Frontend, GenerationConfig, PersonaConfig};
use crate::error::GenerateError;
use crate::gemini::{Completion, ReplyModel};
use crate::model::turn_pair::TurnPair;
use crate::prompt::PersonaPrompt;

pub struct Persona {
    prompt: PersonaPrompt,
    pairs: Vec<TurnPair>,
    examples: usize,
    generation: GenerationConfig,
    model: Arc<dyn ReplyModel>,
}

impl Persona {
    pub fn new(
        config: &PersonaConfig,
        frontend: Frontend,
        pairs: Vec<TurnPair>,
        model: Arc<dyn ReplyModel>,
    ) -> Self {
        if pairs.is_empty() {
            warn!("persona has no example pairs; replies will be generic");
        }
        Persona {
            prompt: config.persona_prompt(frontend),
            pairs,
            examples: config.examples,
            generation: config.generation_for(frontend),
            model,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.prompt.display_name
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Assemble a prompt for `query` with a fresh random sample of examples.
    pub fn prompt_for(&self, query: &str) -> String {
        self.prompt.build_sampled(&self.pairs, self.examples, query)
    }

    /// Reply to `query` in character, or with a fallback notice.
    pub async fn reply(&self, query: &str) -> String {
        let prompt = self.prompt_for(query);
        match self.model.complete(&prompt, &self.generation).await {
            Ok(Completion::Text(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Completion::Text(_)) => {
                warn!("model returned only whitespace");
                self.notice(Notice::Blank)
            }
            Ok(Completion::Blocked { categories }) => {
                warn!(?categories, "model blocked the response");
                self.notice(Notice::Blocked)
            }
            Ok(Completion::Empty) => {
                warn!("model returned no candidates");
                self.notice(Notice::Blank)
            }
            Err(e) => {
                warn!(error = %e, "model call failed");
                self.notice(Notice::from_error(&e))
            }
        }
    }

    fn notice(&self, kind: Notice) -> String {
        let name = self.display_name();
        let text = match kind {
            Notice::Offline => {
                format!("{name} is momentarily offline due to an API error. Try again later.")
            }
            Notice::NoConnection => format!("{name} can't connect to the internet right now."),
            Notice::TooSlow => format!("{name} took too long to respond. Try again."),
            Notice::Unexpected => format!("{name} encountered an unexpected issue."),
            Notice::Blocked => {
                format!("{name} can't respond to that, it might violate safety guidelines.")
            }
            Notice::Blank => format!("{name} is drawing a blank. Try rephrasing?"),
        };
        info!(notice = %text, "sending fallback reply");
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notice {
    Offline,
    NoConnection,
    TooSlow,
    Unexpected,
    Blocked,
    Blank,
}

impl Notice {
    fn from_error(e: &GenerateError) -> Self {
        match e {
            GenerateError::Http { .. } => Notice::Offline,
            GenerateError::Timeout(_) => Notice::TooSlow,
            GenerateError::Transport(inner) if inner.is_connect() => Notice::NoConnection,
            GenerateError::Transport(_) | GenerateError::Decode(_) => Notice::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Model stub that records prompts and replays a fixed result.
    struct Scripted {
        result: fn() -> Result<Completion, GenerateError>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReplyModel for Scripted {
        async fn complete(
            &self,
            prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<Completion, GenerateError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            (self.result)()
        }
    }

    fn persona(result: fn() -> Result<Completion, GenerateError>) -> (Persona, Arc<Scripted>) {
        let model = Arc::new(Scripted {
            result,
            seen: Mutex::new(Vec::new()),
        });
        let pairs = vec![TurnPair {
            user: "hey".into(),
            speaker: "sup".into(),
        }];
        let p = Persona::new(
            &PersonaConfig::default(),
            Frontend::Console,
            pairs,
            model.clone(),
        );
        (p, model)
    }

    #[tokio::test]
    async fn text_completion_is_trimmed_and_prompt_has_examples() {
        let (p, model) = persona(|| Ok(Completion::Text("  lol ok \n".into())));
        assert_eq!(p.reply("whats up").await, "lol ok");
        let seen = model.seen.lock().unwrap();
        assert!(seen[0].contains("User: hey\nDaniel: sup\n"));
        assert!(seen[0].ends_with("User: whats up\nDaniel:"));
    }

    #[tokio::test]
    async fn failures_become_fallback_notices() {
        let (p, _) = persona(|| {
            Err(GenerateError::Http {
                status: 500,
                message: "boom".into(),
            })
        });
        assert!(p.reply("x").await.contains("momentarily offline"));

        let (p, _) = persona(|| Err(GenerateError::Timeout(5)));
        assert_eq!(p.reply("x").await, "Daniel took too long to respond. Try again.");

        let (p, _) = persona(|| Ok(Completion::Blocked { categories: vec![] }));
        assert!(p.reply("x").await.contains("safety guidelines"));

        let (p, _) = persona(|| Ok(Completion::Empty));
        assert_eq!(p.reply("x").await, "Daniel is drawing a blank. Try rephrasing?");

        let (p, _) = persona(|| Err(GenerateError::Decode("expected value".into())));
        assert_eq!(p.reply("x").await, "Daniel encountered an unexpected issue.");
    }

    #[tokio::test]
    async fn whitespace_only_text_is_treated_as_blank() {
        let (p, _) = persona(|| Ok(Completion::Text(" \n\t ".into())));
        assert_eq!(p.reply("x").await, "Daniel is drawing a blank. Try rephrasing?");
    }

    #[tokio::test]
    async fn console_persona_uses_console_profile_and_instruction() {
        let (p, model) = persona(|| Ok(Completion::Text("k".into())));
        assert_eq!(p.generation, GenerationConfig::console());
        p.reply("x").await;
        assert!(model.seen.lock().unwrap()[0].contains("ether doctor"));
    }
}
