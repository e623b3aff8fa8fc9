use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::html;

use crate::quiz::{Action, Phase, QuizSession, MAX_QUESTIONS, MIN_QUESTIONS};

pub const SUBMIT: &str = "Submit";
pub const NEXT_QUESTION: &str = "Next question";
pub const NEW_QUIZ: &str = "New quiz";
pub const NEW_QUIZ_COMMAND: &str = "/new";

pub const GREETING_TEXT: &str = "Hi! I turn any text into a multiple-choice quiz.";
pub const ASK_SOURCE_TEXT: &str =
    "Enter a paragraph of your choice, or upload a PDF document to build the quiz from.";
pub const EMPTY_SOURCE_TEXT: &str = "Please enter a paragraph before generating the quiz.";
pub const UNSUPPORTED_SOURCE_TEXT: &str = "Please send the paragraph as text or as a PDF document.";
pub const NO_VALID_QUESTIONS_TEXT: &str = "No valid questions available. Please try again later.";
pub const USE_BUTTONS_TEXT: &str = "Please answer with one of the buttons.";

pub fn ask_question_count_text() -> String {
    format!(
        "How many questions should the quiz have? ({}-{})",
        MIN_QUESTIONS, MAX_QUESTIONS
    )
}

pub fn question_count_keyboard() -> KeyboardMarkup {
    let buttons: Vec<KeyboardButton> = (MIN_QUESTIONS..=MAX_QUESTIONS)
        .map(|n| KeyboardButton::new(n.to_string()))
        .collect();
    KeyboardMarkup::new(buttons.chunks(5).map(|row| row.to_vec()).collect::<Vec<_>>())
}

/// Parses the question count typed or picked by the user.
pub fn parse_question_count(text: &str) -> Option<usize> {
    text.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (MIN_QUESTIONS..=MAX_QUESTIONS).contains(n))
}

pub fn quiz_ready_text(question_count: usize, skipped: usize) -> String {
    let mut text = format!("Your quiz is ready: {} question(s).", question_count);
    if skipped > 0 {
        text.push_str(&format!(
            " {} malformed question(s) from the generator were skipped.",
            skipped
        ));
    }
    text
}

pub fn action_for(text: &str) -> Action {
    match text {
        SUBMIT => Action::Submit,
        NEXT_QUESTION => Action::Advance,
        option => Action::Select(option.to_string()),
    }
}

/// Redraws the quiz after an interaction: HTML text plus the buttons that are
/// currently allowed.
pub fn render(session: &QuizSession) -> (String, KeyboardMarkup) {
    if session.phase() != Phase::InProgress {
        let (score, total) = session.final_score();
        let text = format!("<b>Quiz Over!</b>\nYour final score: {}/{}", score, total);
        return (text, single_button(NEW_QUIZ));
    }

    if let Some(feedback) = session.feedback() {
        let text = format!(
            "{}\n\n<b>Score:</b> {}",
            html::escape(&feedback.to_string()),
            session.score()
        );
        return (text, single_button(NEXT_QUESTION));
    }

    let mut text = format!(
        "<b>Question {} of {}</b>\n<b>Score:</b> {}\n\n",
        session.question_number(),
        session.question_count(),
        session.score()
    );
    if let Some(question) = session.current_question() {
        text.push_str(&html::escape(&question.text));
    }

    let mut rows = option_rows(session);
    if let Some(selected) = session.selected_option() {
        text.push_str(&format!("\n\nYour answer: <i>{}</i>", html::escape(selected)));
        rows.push(vec![KeyboardButton::new(SUBMIT)]);
    }

    (text, KeyboardMarkup::new(rows))
}

/// Applies one user action and returns the updated session with the reply
/// to send. An action that changes nothing is answered with a hint, except
/// picking the already selected option, which just redraws the view.
pub fn respond(session: &QuizSession, action: Action) -> (QuizSession, String, KeyboardMarkup) {
    let next = session.clone().apply(action.clone());

    let reselected = matches!(
        &action,
        Action::Select(option) if session.selected_option() == Some(option.as_str())
    );
    if next == *session && !reselected {
        let (_, keyboard) = render(session);
        return (next, refusal_text(&action, session).to_string(), keyboard);
    }

    let (text, keyboard) = render(&next);
    (next, text, keyboard)
}

/// Explains why an action changed nothing.
pub fn refusal_text(action: &Action, session: &QuizSession) -> &'static str {
    match action {
        Action::Select(_) if session.is_answer_submitted() => {
            "Your answer is already submitted, press \"Next question\"."
        }
        Action::Select(_) => USE_BUTTONS_TEXT,
        Action::Submit if session.is_answer_submitted() => {
            "This answer is already submitted, press \"Next question\"."
        }
        Action::Submit => "Choose an answer before submitting.",
        Action::Advance => "Submit your answer before moving on.",
    }
}

fn option_rows(session: &QuizSession) -> Vec<Vec<KeyboardButton>> {
    session
        .current_question()
        .map(|question| {
            question
                .options
                .iter()
                .map(|option| vec![KeyboardButton::new(option.clone())])
                .collect()
        })
        .unwrap_or_default()
}

fn single_button(label: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(label)]])
}
