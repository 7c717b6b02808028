//! Daily Speaker - a Telegram English-tutor bot backed by Gemini.
//!
//! Text and voice messages become tutor exchanges with per-user conversation
//! memory; the reply's practice section is also read aloud as a voice note.

pub mod chatbot;
pub mod config;
