//! Chatbot module - tutors English over Telegram, backed by Gemini.

pub mod engine;
pub mod gemini;
pub mod history;
pub mod persona;
pub mod speech;
pub mod telegram;

pub use engine::{ChatbotEngine, Incoming};
pub use gemini::{GeminiClient, GeminiError};
pub use history::{ConversationStore, ResetOutcome, Role, Turn, TurnPayload};
pub use persona::Persona;
pub use speech::{ReplyMarker, Synthesizer};
pub use telegram::TelegramClient;
