//! Few-shot prompt assembly.
//!
//! Layout:
//!
//! ```text
//! <instruction>
//!
//! User: <example user>
//! <Name>: <example speaker>
//! ...
//! User: <live query>
//! <Name>:
//! ```

use crate::model::turn_pair::TurnPair;
use crate::sample::select_examples;

/// Persona instruction plus the label the speaker's lines carry.
#[derive(Debug, Clone)]
pub struct PersonaPrompt {
    pub instruction: String,
    pub display_name: String,
}

impl PersonaPrompt {
    pub fn new(instruction: impl Into<String>, display_name: impl Into<String>) -> Self {
        PersonaPrompt {
            instruction: instruction.into(),
            display_name: display_name.into(),
        }
    }

    /// Build the full prompt text for `query`.
    ///
    /// With no examples this degrades to instruction + live query.
    pub fn build(&self, examples: &[&TurnPair], query: &str) -> String {
        let name = &self.display_name;
        let mut out = String::with_capacity(self.instruction.len() + 64 * (examples.len() + 1));
        out.push_str(self.instruction.trim_end());
        out.push_str("\n\n");
        for ex in examples {
            out.push_str(&format!("User: {}\n{}: {}\n", ex.user, name, ex.speaker));
        }
        out.push_str(&format!("User: {}\n{}:", query, name));
        out
    }

    /// Build a prompt around a fresh random sample of up to `k` pairs.
    pub fn build_sampled(&self, pairs: &[TurnPair], k: usize, query: &str) -> String {
        let mut rng = rand::thread_rng();
        let examples = select_examples(pairs, k, &mut rng);
        self.build(&examples, query)
    }
}
