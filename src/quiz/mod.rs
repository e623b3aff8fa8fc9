pub mod ai_helper;
pub mod parser;
pub mod session;

pub use parser::parse;
pub use session::{Action, Phase, QuizSession};

/// Smallest and largest amount of questions a user may ask for.
pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 10;

/// Every question carries exactly this many options, labelled `a)`..`d)`.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub text: String,
    /// Normalized option lines, e.g. `"b) Paris"`, in presentation order.
    pub options: Vec<String>,
    /// One of `options`, byte-for-byte.
    pub correct_option: String,
}

impl Question {
    /// Returns `None` unless there are exactly four distinct options and the
    /// correct one is among them (ignoring case).
    pub fn new(text: String, options: Vec<String>, correct_option: String) -> Option<Self> {
        if options.len() != OPTIONS_PER_QUESTION {
            return None;
        }
        let unique = options
            .iter()
            .enumerate()
            .all(|(i, option)| !options[..i].contains(option));
        if !unique {
            return None;
        }
        if !options.iter().any(|o| same_answer(o, &correct_option)) {
            return None;
        }

        Some(Self {
            text,
            options,
            correct_option,
        })
    }

    pub fn is_correct(&self, option: &str) -> bool {
        same_answer(option, &self.correct_option)
    }
}

/// Answers are compared trimmed and case-insensitively.
pub fn same_answer(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
