// Rust guideline compliant 2026-02-13

use std::sync::Arc;

use mimic::Persona;
use serenity::all::{ActivityData, Context, EventHandler, Message, Ready};
use serenity::async_trait;
use serenity::model::mention::Mentionable;
use tracing::{debug, info, warn};

/// Discord caps a message body at 2000 characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Gateway event handler: answers messages that mention the bot.
pub struct PersonaHandler {
    persona: Arc<Persona>,
}

impl PersonaHandler {
    pub fn new(persona: Arc<Persona>) -> Self {
        Self { persona }
    }
}

#[async_trait]
impl EventHandler for PersonaHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to Discord"
        );
        ctx.set_activity(Some(ActivityData::playing(format!(
            "Chatting with {}",
            self.persona.display_name()
        ))));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let bot_id = ctx.cache.current_user().id;
        if !msg.mentions_user_id(bot_id) {
            return;
        }

        let mention = msg.author.mention().to_string();
        let query = strip_mention(&msg.content, bot_id.get());
        if query.is_empty() {
            if let Err(e) = msg
                .channel_id
                .say(&ctx.http, format!("Yes, {mention}? What do you need?"))
                .await
            {
                warn!(error = %e, "failed to send prompt for a question");
            }
            return;
        }

        debug!(channel = %msg.channel_id, author = %msg.author.name, "answering mention");
        let reply = {
            let _typing = msg.channel_id.start_typing(&ctx.http);
            self.persona.reply(&query).await
        };

        for chunk in chunk_reply(&format!("{mention} {reply}"), MESSAGE_LIMIT) {
            if let Err(e) = msg.channel_id.say(&ctx.http, chunk).await {
                warn!(error = %e, channel = %msg.channel_id, "failed to send reply");
                break;
            }
        }
    }
}

/// Remove every `<@id>` / `<@!id>` mention of the bot and trim the rest.
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@!{bot_id}>"), "")
        .replace(&format!("<@{bot_id}>"), "")
        .trim()
        .to_string()
}

/// Split `text` into pieces of at most `limit` characters, preferring to
/// break after a newline or space in the back half of each piece.
pub fn chunk_reply(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.chars().count() > limit {
        // Byte offset just past the `limit`-th char.
        let hard = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard];
        let cut = window
            .rfind(['\n', ' '])
            .filter(|&i| i >= hard / 2)
            .map(|i| i + 1)
            .unwrap_or(hard);
        chunks.push(rest[..cut].trim_end().to_string());
        rest = &rest[cut..];
    }
    if !rest.trim().is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
