mod config;
mod document;
mod messages;
mod quiz;

use std::sync::Arc;

use config::Config;
use document::DocumentError;
use dotenv::dotenv;
use log::{debug, error, info, warn};
use quiz::{ai_helper::GenerateError, ai_helper::QuizHelper, QuizSession};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    net::Download,
    prelude::*,
    types::{ChatAction, Document, KeyboardRemove, ParseMode},
};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveSource,
    ReceiveQuestionCount {
        source: String,
    },
    Quiz {
        session: QuizSession,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // a missing .env is fine, the variables may come from the environment
    dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env()?;
    info!("Starting quiz generator bot with model {}...", config.model);

    let bot = Bot::new(config.bot_token.clone());
    let quiz_helper = Arc::new(QuizHelper::from_config(&config)?);

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(dptree::filter(is_new_quiz_request).endpoint(new_quiz))
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveSource].endpoint(receive_source))
            .branch(
                dptree::case![State::ReceiveQuestionCount { source }]
                    .endpoint(receive_question_count),
            )
            .branch(dptree::case![State::Quiz { session }].endpoint(quiz_step)),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new(), quiz_helper])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

fn is_new_quiz_request(msg: Message) -> bool {
    matches!(
        msg.text().map(str::trim),
        Some(messages::NEW_QUIZ) | Some(messages::NEW_QUIZ_COMMAND)
    )
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        format!("{}\n\n{}", messages::GREETING_TEXT, messages::ASK_SOURCE_TEXT),
    )
    .await?;

    dialogue.update(State::ReceiveSource).await?;
    Ok(())
}

/// Drops whatever quiz was running and asks for a new source.
async fn new_quiz(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, messages::ASK_SOURCE_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await?;

    dialogue.update(State::ReceiveSource).await?;
    Ok(())
}

async fn receive_source(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let source = if let Some(doc) = msg.document() {
        let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
        match read_document(&bot, doc).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Rejected document from chat {}: {}", msg.chat.id, e);
                bot.send_message(msg.chat.id, e.to_string()).await?;
                return Ok(());
            }
        }
    } else if let Some(text) = msg.text() {
        text.trim().to_string()
    } else {
        bot.send_message(msg.chat.id, messages::UNSUPPORTED_SOURCE_TEXT)
            .await?;
        return Ok(());
    };

    if source.is_empty() {
        bot.send_message(msg.chat.id, messages::EMPTY_SOURCE_TEXT)
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, messages::ask_question_count_text())
        .reply_markup(messages::question_count_keyboard())
        .await?;

    dialogue
        .update(State::ReceiveQuestionCount { source })
        .await?;
    Ok(())
}

async fn read_document(bot: &Bot, doc: &Document) -> Result<String, DocumentError> {
    let mime_type = doc.mime_type.as_ref().map(|m| m.essence_str());
    if !document::is_pdf(mime_type, doc.file_name.as_deref()) {
        return Err(DocumentError::NotPdf);
    }
    if doc.file.size > document::MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge(doc.file.size));
    }

    let file = bot
        .get_file(doc.file.id.clone())
        .await
        .map_err(|e| DocumentError::Download(e.to_string()))?;
    let mut bytes = Vec::with_capacity(doc.file.size as usize);
    bot.download_file(&file.path, &mut bytes)
        .await
        .map_err(|e| DocumentError::Download(e.to_string()))?;

    debug!("Downloaded {} bytes of {:?}", bytes.len(), doc.file_name);

    // text extraction is CPU bound
    tokio::task::spawn_blocking(move || document::extract_text(&bytes))
        .await
        .map_err(|e| DocumentError::Unreadable(e.to_string()))?
}

async fn receive_question_count(
    bot: Bot,
    dialogue: QuizDialogue,
    source: String,
    msg: Message,
    quiz_helper: Arc<QuizHelper>,
) -> HandlerResult {
    let Some(amount) = msg.text().and_then(messages::parse_question_count) else {
        bot.send_message(msg.chat.id, messages::ask_question_count_text())
            .reply_markup(messages::question_count_keyboard())
            .await?;
        return Ok(());
    };

    // We don't really care about the result here, it only shows that the bot is busy
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let raw = match quiz_helper.generate_quiz(&source, amount).await {
        Ok(raw) => raw,
        Err(GenerateError::EmptySource) => {
            bot.send_message(msg.chat.id, messages::EMPTY_SOURCE_TEXT)
                .reply_markup(KeyboardRemove::new())
                .await?;
            dialogue.update(State::ReceiveSource).await?;
            return Ok(());
        }
        Err(e) => {
            // no retry, a failed request simply produces no questions
            error!("Quiz generation failed for chat {}: {}", msg.chat.id, e);
            String::new()
        }
    };

    let parsed = quiz::parse(&raw);
    if parsed.is_empty() {
        bot.send_message(msg.chat.id, messages::NO_VALID_QUESTIONS_TEXT)
            .reply_markup(messages::question_count_keyboard())
            .await?;
        return Ok(());
    }

    info!(
        "Chat {} got {} question(s), {} skipped",
        msg.chat.id,
        parsed.questions.len(),
        parsed.diagnostics.len()
    );
    bot.send_message(
        msg.chat.id,
        messages::quiz_ready_text(parsed.questions.len(), parsed.diagnostics.len()),
    )
    .await?;

    let session = QuizSession::new(parsed.questions);
    let (text, keyboard) = messages::render(&session);
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    dialogue.update(State::Quiz { session }).await?;
    Ok(())
}

async fn quiz_step(
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, messages::USE_BUTTONS_TEXT)
            .await?;
        return Ok(());
    };

    let action = messages::action_for(text.trim());
    let (next, text, keyboard) = messages::respond(&session, action);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    if next.is_finished() {
        let (score, total) = next.final_score();
        info!("Chat {} finished a quiz with {}/{}", msg.chat.id, score, total);
    }

    dialogue.update(State::Quiz { session: next }).await?;
    Ok(())
}
