use std::collections::HashSet;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::info;

use daily_speaker::chatbot::{
    ChatbotEngine, ConversationStore, GeminiClient, Incoming, TelegramClient,
};
use daily_speaker::config::Config;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Welcome message.
    Start,
    /// Erase your conversation memory.
    Reset,
    /// Simplify the next text you send.
    Simplify,
}

struct BotState {
    engine: ChatbotEngine,
    telegram: Arc<TelegramClient>,
    /// Users whose next text message is the `/simplify` input.
    awaiting_simplify: Mutex<HashSet<i64>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: check your environment: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Model is picked once; the choice holds for the process lifetime.
    let mut gemini = GeminiClient::new(config.google_api_key.clone());
    gemini.discover_model().await;
    info!("🚀 Daily Speaker ready (model: {})", gemini.model());

    let telegram = Arc::new(TelegramClient::new(bot.clone()));
    let state = Arc::new(BotState {
        engine: ChatbotEngine::new(gemini, ConversationStore::new(), telegram.clone()),
        telegram,
        awaiting_simplify: Mutex::new(HashSet::new()),
    });

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn incoming(msg: &Message) -> Option<Incoming> {
    let user = msg.from.as_ref()?;
    Some(Incoming {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        user_id: user.id.0 as i64,
    })
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(incoming) = incoming(&msg) else {
        return Ok(());
    };

    match cmd {
        Command::Start => state.engine.welcome(&incoming).await,
        Command::Reset => state.engine.reset(&incoming).await,
        Command::Simplify => {
            {
                let mut awaiting = state.awaiting_simplify.lock().await;
                awaiting.insert(incoming.user_id);
            }
            state
                .telegram
                .send_plain(
                    incoming.chat_id,
                    "Send the English text you want simplified.",
                    Some(incoming.message_id),
                )
                .await
                .ok();
        }
    }

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(incoming) = incoming(&msg) else {
        return Ok(());
    };

    if let Some(voice) = msg.voice() {
        match state.telegram.download_voice(&voice.file.id.0).await {
            Ok(ogg_data) => state.engine.handle_voice(&incoming, &ogg_data).await,
            Err(e) => {
                state
                    .telegram
                    .send_plain(
                        incoming.chat_id,
                        &format!("Error processing audio: {e}"),
                        Some(incoming.message_id),
                    )
                    .await
                    .ok();
            }
        }
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let simplify_pending = {
        let mut awaiting = state.awaiting_simplify.lock().await;
        awaiting.remove(&incoming.user_id)
    };

    if simplify_pending {
        state.engine.simplify(&incoming, text).await;
    } else {
        state.engine.handle_text(&incoming, text).await;
    }

    Ok(())
}
