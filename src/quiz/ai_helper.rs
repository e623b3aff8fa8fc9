use chatgpt::config::ChatGPTEngine;
use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;
use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::quiz::{MAX_QUESTIONS, MIN_QUESTIONS};

const SYSTEM_MESSAGE: &str = "You are an educator and help in making quizzes";

const FORMAT_EXAMPLE: &str = "Question: What is the nickname of Manchester United Football Club?
Options:
a) The Red Devils
b) The Blues
c) The Gunners
d) The Citizens
Answer: a)";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no source text to build a quiz from")]
    EmptySource,
    #[error("question count must be between 1 and 10, got {0}")]
    InvalidAmount(usize),
    #[error("text generation failed: {0}")]
    Backend(#[from] chatgpt::err::Error),
}

pub struct QuizHelper {
    chat_gpt: ChatGPT,
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT) -> Self {
        Self { chat_gpt }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut gpt = ChatGPT::new(config.chatgpt_api_key.as_str())?;

        gpt.config.engine = engine_for(&config.model);
        gpt.config.timeout = config.timeout;

        Ok(Self::new(gpt))
    }

    /// Asks the model for `amount` questions about `paragraph` and returns its
    /// raw reply. Nothing is sent for an empty paragraph or an amount outside
    /// the allowed range.
    pub async fn generate_quiz(
        &self,
        paragraph: &str,
        amount: usize,
    ) -> std::result::Result<String, GenerateError> {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            return Err(GenerateError::EmptySource);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&amount) {
            return Err(GenerateError::InvalidAmount(amount));
        }

        debug!(
            "Generating {} question(s) from {} characters of text",
            amount,
            paragraph.chars().count()
        );

        let mut conversation = self.chat_gpt.new_conversation_directed(SYSTEM_MESSAGE);
        let response: CompletionResponse = conversation
            .send_message(build_quiz_prompt(paragraph, amount))
            .await?;
        let content = response.message().clone().content;

        debug!("Completion: {:?}", content);

        Ok(content)
    }
}

pub fn build_quiz_prompt(paragraph: &str, amount: usize) -> String {
    format!(
        "Based on the following paragraph: '{}' \
        Provide {} multiple-choice questions with four options, and indicate the correct answer clearly. \
        Start every question with \"Question:\" and repeat the format below for each of them. \
        Format your response as follows:\n{}",
        paragraph.trim(),
        amount,
        FORMAT_EXAMPLE
    )
}

fn engine_for(model: &str) -> ChatGPTEngine {
    match model {
        "gpt-3.5-turbo" => ChatGPTEngine::Gpt35Turbo,
        "gpt-4" => ChatGPTEngine::Gpt4,
        // read once at startup, so leaking the name is bounded
        other => ChatGPTEngine::Custom(Box::leak(other.to_string().into_boxed_str())),
    }
}
