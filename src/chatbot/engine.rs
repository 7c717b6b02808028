//! Chatbot engine - runs one inbound Telegram event end to end:
//! memory window, Gemini invocation, reply delivery, practice voice.

use std::sync::Arc;

use base64::Engine;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chatbot::gemini::GeminiClient;
use crate::chatbot::history::{ConversationStore, ResetOutcome, Turn};
use crate::chatbot::persona::{Persona, PRIMING_ACK};
use crate::chatbot::speech::{ReplyMarker, Synthesizer};
use crate::chatbot::telegram::TelegramClient;

const WELCOME: &str = "Hello! 🎧 I can now hear you.\nSend a voice message or text!";
const RESET_DONE: &str = "🧠 Memory erased! We're starting from zero.";
const RESET_ALREADY_EMPTY: &str = "We're already at zero!";

/// Where a reply should go.
#[derive(Debug, Clone, Copy)]
pub struct Incoming {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
}

/// The chatbot engine. Every model failure degrades to a reply message;
/// nothing here is fatal.
pub struct ChatbotEngine {
    gemini: GeminiClient,
    store: Mutex<ConversationStore>,
    synthesizer: Synthesizer,
    telegram: Arc<TelegramClient>,
}

impl ChatbotEngine {
    pub fn new(
        gemini: GeminiClient,
        store: ConversationStore,
        telegram: Arc<TelegramClient>,
    ) -> Self {
        Self {
            gemini,
            store: Mutex::new(store),
            synthesizer: Synthesizer::new(),
            telegram,
        }
    }

    /// `/start` greeting.
    pub async fn welcome(&self, incoming: &Incoming) {
        self.telegram
            .send_plain(incoming.chat_id, WELCOME, Some(incoming.message_id))
            .await
            .ok();
    }

    /// A plain text message: one tutor exchange with memory.
    pub async fn handle_text(&self, incoming: &Incoming, text: &str) {
        self.converse(incoming, Turn::user_text(text)).await;
    }

    /// A voice message: same exchange, with the recording sent inline.
    pub async fn handle_voice(&self, incoming: &Incoming, ogg_data: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(ogg_data);
        self.converse(incoming, Turn::user_audio("audio/ogg", encoded))
            .await;
    }

    /// `/simplify` follow-up text: a one-shot simplifier invocation.
    /// No memory is read or written and no voice is produced.
    pub async fn simplify(&self, incoming: &Incoming, text: &str) {
        info!("🔄 Simplifying for user {}", incoming.user_id);
        self.telegram.send_typing(incoming.chat_id).await;

        match self
            .gemini
            .generate(&one_shot(Persona::Simplifier, text))
            .await
        {
            Ok(reply) => {
                let formatted = format!("🔄 **Simplified text:**\n\n{reply}");
                self.telegram
                    .send_markdown(incoming.chat_id, &formatted, Some(incoming.message_id))
                    .await
                    .ok();
            }
            Err(e) => {
                warn!("Simplify invocation failed: {e}");
                self.telegram
                    .send_plain(incoming.chat_id, &e.to_string(), Some(incoming.message_id))
                    .await
                    .ok();
            }
        }
    }

    /// `/reset` - drop the user's conversation memory.
    pub async fn reset(&self, incoming: &Incoming) {
        let outcome = {
            let mut store = self.store.lock().await;
            store.reset(incoming.user_id)
        };

        let reply = match outcome {
            ResetOutcome::Cleared => {
                info!("🧠 Cleared memory for user {}", incoming.user_id);
                RESET_DONE
            }
            ResetOutcome::AlreadyEmpty => RESET_ALREADY_EMPTY,
        };

        self.telegram
            .send_plain(incoming.chat_id, reply, Some(incoming.message_id))
            .await
            .ok();
    }

    /// One memory-backed tutor exchange.
    ///
    /// The new turn is committed to memory together with the model's reply
    /// only after the provider call succeeds; failed calls leave the stored
    /// history untouched.
    async fn converse(&self, incoming: &Incoming, new_turn: Turn) {
        self.telegram.send_typing(incoming.chat_id).await;

        let outbound = {
            let mut store = self.store.lock().await;
            store.window(incoming.user_id, Persona::Tutor, &new_turn)
        };

        match self.gemini.generate(&outbound).await {
            Ok(reply) => {
                {
                    let mut store = self.store.lock().await;
                    store.commit(incoming.user_id, new_turn, Turn::model_text(reply.clone()));
                }

                self.telegram
                    .send_markdown(incoming.chat_id, &reply, Some(incoming.message_id))
                    .await
                    .ok();

                self.send_practice_voice(incoming.chat_id, Persona::Tutor, &reply)
                    .await;
            }
            Err(e) => {
                warn!("Model invocation failed: {e}");
                self.telegram
                    .send_plain(incoming.chat_id, &e.to_string(), Some(incoming.message_id))
                    .await
                    .ok();
            }
        }
    }

    /// Read the reply's practice section aloud, if the persona has one and
    /// the reply follows the template. Synthesis failures are logged and
    /// skipped; the text reply already went out.
    async fn send_practice_voice(&self, chat_id: i64, persona: Persona, reply: &str) {
        let Some(word) = persona.speech_marker() else {
            return;
        };
        let marker = ReplyMarker::bold_section(word);

        let Some(text) = self.synthesizer.prepare(reply, &marker) else {
            info!("⚠️ No practice section to read aloud");
            return;
        };

        match self.synthesizer.speak(&text).await {
            Ok(audio) => {
                // Audio only lives in this buffer; sent and dropped.
                self.telegram.send_voice(chat_id, audio).await.ok();
            }
            Err(e) => warn!("{e}"),
        }
    }
}

/// Contents for a memoryless invocation: the persona priming pair plus the
/// input text, nothing else.
fn one_shot(persona: Persona, text: &str) -> Vec<Turn> {
    vec![
        Turn::user_text(persona.instruction()),
        Turn::model_text(PRIMING_ACK),
        Turn::user_text(text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::history::{Role, TurnPayload};

    #[test]
    fn test_one_shot_is_priming_pair_plus_input() {
        let turns = one_shot(Persona::Simplifier, "He dont know nothing");

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(
            turns[0].payload,
            TurnPayload::Text(Persona::Simplifier.instruction().to_string())
        );
        assert_eq!(turns[1], Turn::model_text(PRIMING_ACK));
        assert_eq!(turns[2], Turn::user_text("He dont know nothing"));
    }
}
