//! Telegram client using teloxide.

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile, MessageId, ParseMode, ReplyParameters};
use tracing::{debug, info, warn};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a Markdown-formatted reply.
    ///
    /// Model output regularly breaks Telegram's entity parsing (unbalanced
    /// `*` and friends), which Telegram rejects with a Bad Request. That is
    /// recovered locally by resending the same text as plain text.
    pub async fn send_markdown(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let chat_id = ChatId(chat_id);
        let mut request = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Markdown);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        match request.await {
            Ok(msg) => Ok(msg.id.0 as i64),
            Err(e) => {
                warn!("Markdown send rejected, retrying as plain text: {e}");
                self.send_plain(chat_id.0, text, reply_to_message_id).await
            }
        }
    }

    /// Send a reply without any parse mode.
    pub async fn send_plain(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let chat_id = ChatId(chat_id);
        let mut request = self.bot.send_message(chat_id, text);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Send a voice message from in-memory audio bytes.
    pub async fn send_voice(&self, chat_id: i64, voice_data: Vec<u8>) -> Result<i64, String> {
        info!("🔊 Sending voice to chat {} ({} bytes)", chat_id, voice_data.len());

        let input_file = InputFile::memory(voice_data).file_name("voice.ogg");

        self.bot
            .send_voice(ChatId(chat_id), input_file)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send voice: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Download a voice message by file_id. Telegram serves OGG Opus.
    pub async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;

        debug!("📥 Downloaded voice ({} bytes)", data.len());
        Ok(data)
    }

    /// Show the "typing..." indicator while a model call is in flight.
    pub async fn send_typing(&self, chat_id: i64) {
        if let Err(e) = self
            .bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
        {
            debug!("Failed to send chat action: {e}");
        }
    }
}
