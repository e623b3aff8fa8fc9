use std::fmt;

use crate::quiz::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    Finished,
}

/// Outcome of the last submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Feedback {
    Correct,
    Wrong { correct_option: String },
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Correct => write!(f, "Correct! 🎉"),
            Feedback::Wrong { correct_option } => {
                write!(f, "Wrong! The correct answer was: {}", correct_option)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Select(String),
    Submit,
    Advance,
}

/// Progress through one generated quiz. The question list never changes
/// after creation; a new quiz means a new session.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    questions: Vec<Question>,
    current_question: usize,
    score: usize,
    /// Index into the current question's options.
    selected: Option<usize>,
    feedback: Option<Feedback>,
    answer_submitted: bool,
}

impl QuizSession {
    /// `questions` are expected in presentation order (already shuffled).
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.questions.is_empty() {
            Phase::NotStarted
        } else if self.current_question < self.questions.len() {
            Phase::InProgress
        } else {
            Phase::Finished
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase() {
            Phase::InProgress => self.questions.get(self.current_question),
            _ => None,
        }
    }

    /// 1-based number of the question on screen.
    pub fn question_number(&self) -> usize {
        self.current_question + 1
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected_option(&self) -> Option<&str> {
        let question = self.current_question()?;
        self.selected
            .and_then(|i| question.options.get(i))
            .map(String::as_str)
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn is_answer_submitted(&self) -> bool {
        self.answer_submitted
    }

    /// `(score, total)`, valid at any point of the quiz.
    pub fn final_score(&self) -> (usize, usize) {
        (self.score, self.questions.len())
    }

    /// Marks `option` as the chosen answer. Ignored when the quiz is not in
    /// progress, the answer was already submitted, or `option` is not one of
    /// the current options.
    pub fn select_answer(&mut self, option: &str) -> bool {
        if self.answer_submitted {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        let Some(index) = question.options.iter().position(|o| o == option) else {
            return false;
        };

        self.selected = Some(index);
        true
    }

    /// Scores the selected option once per question. Returns `None` if
    /// nothing was done.
    pub fn submit_answer(&mut self) -> Option<&Feedback> {
        if self.answer_submitted {
            return None;
        }
        let question = self.current_question()?;
        let selected = self.selected.and_then(|i| question.options.get(i))?;

        let feedback = if question.is_correct(selected) {
            Feedback::Correct
        } else {
            Feedback::Wrong {
                correct_option: question.correct_option.clone(),
            }
        };

        if feedback == Feedback::Correct {
            self.score += 1;
        }
        self.answer_submitted = true;
        self.feedback = Some(feedback);
        self.feedback.as_ref()
    }

    /// Moves to the next question once the current one has feedback.
    pub fn advance(&mut self) -> bool {
        if self.phase() != Phase::InProgress || self.selected.is_none() || self.feedback.is_none()
        {
            return false;
        }

        self.current_question += 1;
        self.selected = None;
        self.feedback = None;
        self.answer_submitted = false;
        true
    }

    pub fn apply(mut self, action: Action) -> Self {
        match action {
            Action::Select(option) => {
                self.select_answer(&option);
            }
            Action::Submit => {
                self.submit_answer();
            }
            Action::Advance => {
                self.advance();
            }
        }
        self
    }
}
