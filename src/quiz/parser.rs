use std::fmt;
use std::sync::OnceLock;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::quiz::{Question, OPTIONS_PER_QUESTION};

/// Question line, four options and the answer line.
const MIN_BLOCK_LINES: usize = 2 + OPTIONS_PER_QUESTION;

/// Reason a question block was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("expected at least 6 lines (question, 4 options, answer), found {0}")]
    TooFewLines(usize),
    #[error("option line without a `letter)` label: {0:?}")]
    MalformedOption(String),
    #[error("expected 4 options, found {0}")]
    WrongOptionCount(usize),
    #[error("option label `{0})` appears more than once")]
    DuplicateLabel(char),
    #[error("no `Answer:` line")]
    MissingAnswer,
    #[error("answer line does not name an option letter: {0:?}")]
    UnreadableAnswer(String),
    #[error("correct answer `{0}` not found in options")]
    AnswerNotInOptions(char),
}

/// A dropped block together with its 1-based position in the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub block: usize,
    pub error: BlockError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "question block {}: {}", self.block, self.error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedQuiz {
    pub questions: Vec<Question>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedQuiz {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

struct Patterns {
    marker: Regex,
    option: Regex,
    answer_label: Regex,
    answer_letter: Regex,
    options_header: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        marker: Regex::new(r"(?mi)^[ \t#*]*(?:\d+[.)][ \t#*]*)?(?:example[ \t]+)?question\b")
            .unwrap(),
        option: Regex::new(r"^\(?([A-Da-d])\)[ \t]*(.+)$").unwrap(),
        answer_label: Regex::new(r"(?i)^(?:correct[ \t]+)?answer[ \t]*:").unwrap(),
        answer_letter: Regex::new(r"(?i)^(?:correct[ \t]+)?answer[ \t]*:[ \t]*\(?([a-z])\b").unwrap(),
        options_header: Regex::new(r"(?i)^options?[ \t]*:?$").unwrap(),
    })
}

/// Parses a generated reply and shuffles the surviving questions.
pub fn parse(raw: &str) -> ParsedQuiz {
    parse_with_rng(raw, &mut rand::thread_rng())
}

pub fn parse_with_rng<R: Rng + ?Sized>(raw: &str, rng: &mut R) -> ParsedQuiz {
    let mut parsed = ParsedQuiz::default();

    for (index, block) in split_blocks(raw).into_iter().enumerate() {
        match parse_block(block) {
            Ok(question) => parsed.questions.push(question),
            Err(error) => {
                let diagnostic = Diagnostic {
                    block: index + 1,
                    error,
                };
                warn!("Skipping {}", diagnostic);
                parsed.diagnostics.push(diagnostic);
            }
        }
    }

    parsed.questions.shuffle(rng);
    debug!(
        "Parsed {} question(s), skipped {}",
        parsed.questions.len(),
        parsed.diagnostics.len()
    );
    parsed
}

/// Returns the text following each question marker, dropping the preamble
/// before the first marker and blocks that are blank.
fn split_blocks(raw: &str) -> Vec<&str> {
    let starts: Vec<_> = patterns()
        .marker
        .find_iter(raw)
        .map(|m| (m.start(), m.end()))
        .collect();

    match starts.first() {
        Some((first, _)) if !raw[..*first].trim().is_empty() => {
            debug!("Ignoring preamble before the first question");
        }
        None if !raw.trim().is_empty() => {
            warn!("Reply contains no question marker, nothing to parse");
        }
        _ => {}
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let body_end = starts.get(i + 1).map_or(raw.len(), |&(next, _)| next);
            &raw[body_start..body_end]
        })
        .filter(|block| !block.trim().is_empty())
        .collect()
}

/// Strips surrounding whitespace, markdown emphasis and list bullets.
fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '•' | '*') || c.is_whitespace())
        .trim_end_matches('*')
        .trim()
}

fn parse_block(block: &str) -> Result<Question, BlockError> {
    let patterns = patterns();

    let (head, tail) = block.split_once('\n').unwrap_or((block, ""));
    let head = head.replace("**", "");

    let question_text = match head.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => head
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
            .trim()
            .to_string(),
    };
    let question_line_counted = !question_text.is_empty();
    let remaining: Vec<&str> = tail.lines().map(clean_line).filter(|l| !l.is_empty()).collect();

    let line_count = remaining.len() + usize::from(question_line_counted);
    if line_count < MIN_BLOCK_LINES {
        return Err(BlockError::TooFewLines(line_count));
    }

    let mut remaining = remaining.into_iter();
    let question_text = if question_line_counted {
        question_text
    } else {
        // marker line had no text after the label, the question follows it
        remaining.next().unwrap_or_default().to_string()
    };

    let mut options: Vec<(char, String)> = Vec::with_capacity(OPTIONS_PER_QUESTION);
    let mut answer = None;

    for line in remaining {
        let line = line.replace("**", "");
        let line = line.trim();

        if patterns.answer_label.is_match(line) {
            let letter = patterns
                .answer_letter
                .captures(line)
                .and_then(|caps| caps[1].chars().next())
                .ok_or_else(|| BlockError::UnreadableAnswer(line.to_string()))?;
            answer = Some(letter.to_ascii_lowercase());
            break;
        }

        if patterns.options_header.is_match(line) {
            continue;
        }

        let caps = patterns
            .option
            .captures(line)
            .ok_or_else(|| BlockError::MalformedOption(line.to_string()))?;
        let label = caps[1]
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or_default();
        options.push((label, caps[2].trim().to_string()));
    }

    let answer = answer.ok_or(BlockError::MissingAnswer)?;

    if options.len() != OPTIONS_PER_QUESTION {
        return Err(BlockError::WrongOptionCount(options.len()));
    }
    for (i, (label, _)) in options.iter().enumerate() {
        if options[..i].iter().any(|(seen, _)| seen == label) {
            return Err(BlockError::DuplicateLabel(*label));
        }
    }

    let correct_option = options
        .iter()
        .find(|(label, _)| *label == answer)
        .map(|(label, text)| format!("{}) {}", label, text))
        .ok_or(BlockError::AnswerNotInOptions(answer))?;

    let options = options
        .into_iter()
        .map(|(label, text)| format!("{}) {}", label, text))
        .collect();

    Question::new(question_text, options, correct_option)
        .ok_or(BlockError::AnswerNotInOptions(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parse_seeded(raw: &str) -> ParsedQuiz {
        parse_with_rng(raw, &mut StdRng::seed_from_u64(7))
    }

    fn block(question: &str, answer: &str) -> String {
        format!(
            "Question: {}\nOptions:\na) One\nb) Two\nc) Three\nd) Four\nAnswer: {}\n\n",
            question, answer
        )
    }

    #[test]
    fn parses_single_well_formed_block() {
        let parsed = parse_seeded("Question: X?\na) A\nb) B\nc) C\nd) D\nAnswer: b");

        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.questions.len(), 1);
        let question = &parsed.questions[0];
        assert_eq!(question.text, "X?");
        assert_eq!(question.options, vec!["a) A", "b) B", "c) C", "d) D"]);
        assert_eq!(question.correct_option, "b) B");
    }

    #[test]
    fn parses_the_prompted_example_format() {
        let raw = "Example Question: What is the nickname of Manchester United Football Club?\n\
                   Options:\n\
                   a) The Red Devils\n\
                   b) The Blues\n\
                   c) The Gunners\n\
                   d) The Citizens\n\
                   Answer: a)";
        let parsed = parse_seeded(raw);

        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(
            parsed.questions[0].text,
            "What is the nickname of Manchester United Football Club?"
        );
        assert_eq!(parsed.questions[0].correct_option, "a) The Red Devils");
    }

    #[test]
    fn every_valid_block_survives() {
        let raw: String = (1..=5)
            .map(|n| block(&format!("Q{}?", n), "c)"))
            .collect::<Vec<_>>()
            .join("");
        let parsed = parse_seeded(&format!("Here are your questions:\n\n{}", raw));

        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.questions.len(), 5);
        for question in &parsed.questions {
            assert_eq!(question.options.len(), 4);
            assert!(question.options.iter().any(|o| question.is_correct(o)));
        }
    }

    #[test]
    fn shuffle_keeps_every_question_once() {
        let raw: String = (1..=6).map(|n| block(&format!("Q{}?", n), "a")).collect();
        let parsed = parse_seeded(&raw);

        let mut texts: Vec<_> = parsed.questions.iter().map(|q| q.text.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["Q1?", "Q2?", "Q3?", "Q4?", "Q5?", "Q6?"]);
        // options are never reordered
        for question in &parsed.questions {
            assert_eq!(question.options, vec!["a) One", "b) Two", "c) Three", "d) Four"]);
        }
    }

    #[test]
    fn block_without_answer_is_dropped() {
        let raw = format!(
            "{}Question: Broken?\na) A\nb) B\nc) C\nd) D\nExplanation is missing\n\n{}",
            block("First?", "a"),
            block("Last?", "d")
        );
        let parsed = parse_seeded(&raw);

        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].block, 2);
    }

    #[test]
    fn missing_answer_line_is_reported() {
        let raw = "Question: Broken?\na) A\nb) B\nc) C\nd) D\nOptions:";
        let parsed = parse_seeded(raw);

        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.diagnostics[0].error, BlockError::MissingAnswer);
    }

    #[test]
    fn option_without_parenthesis_drops_whole_block() {
        let raw = format!(
            "Question: Broken?\na) A\nb B\nc) C\nd) D\nAnswer: a\n\n{}",
            block("Fine?", "b")
        );
        let parsed = parse_seeded(&raw);

        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].text, "Fine?");
        assert_eq!(
            parsed.diagnostics[0].error,
            BlockError::MalformedOption("b B".to_string())
        );
    }

    #[test]
    fn short_block_is_reported() {
        let parsed = parse_seeded("Question: Tiny?\na) A\nAnswer: a");

        assert!(parsed.is_empty());
        assert_eq!(parsed.diagnostics[0].error, BlockError::TooFewLines(3));
    }

    #[test]
    fn answer_letter_must_match_an_option() {
        let parsed = parse_seeded("Question: X?\na) A\nb) B\nc) C\nd) D\nAnswer: e");

        assert!(parsed.is_empty());
        assert_eq!(parsed.diagnostics[0].error, BlockError::AnswerNotInOptions('e'));
    }

    #[test]
    fn unreadable_answer_is_reported() {
        let parsed = parse_seeded("Question: X?\na) A\nb) B\nc) C\nd) D\nAnswer: Berlin");

        assert_eq!(
            parsed.diagnostics[0].error,
            BlockError::UnreadableAnswer("Answer: Berlin".to_string())
        );
    }

    #[test]
    fn repeated_label_is_rejected() {
        let parsed = parse_seeded("Question: X?\na) A\na) B\nc) C\nd) D\nAnswer: a");

        assert_eq!(parsed.diagnostics[0].error, BlockError::DuplicateLabel('a'));
    }

    #[test]
    fn wrong_option_count_is_reported() {
        let parsed = parse_seeded("Question: X?\nOptions:\na) A\nb) B\nc) C\nAnswer: a");

        assert_eq!(parsed.diagnostics[0].error, BlockError::WrongOptionCount(3));
    }

    #[test]
    fn labels_and_answer_are_case_insensitive() {
        let raw = "**Question 1:** Capital of Italy?\n\
                   A) Paris\n\
                   (B)   Rome \n\
                   C) Madrid\n\
                   D) Berlin\n\
                   **Answer:** B)\n\
                   Explanation: Rome has been the capital since 1871.";
        let parsed = parse_seeded(raw);

        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let question = &parsed.questions[0];
        assert_eq!(question.text, "Capital of Italy?");
        assert_eq!(question.options, vec!["a) Paris", "b) Rome", "c) Madrid", "d) Berlin"]);
        assert_eq!(question.correct_option, "b) Rome");
    }

    #[test]
    fn question_text_may_follow_the_marker_line() {
        let raw = "Question 3:\nWhich one is even?\na) 1\nb) 3\nc) 4\nd) 5\nAnswer: c";
        let parsed = parse_seeded(raw);

        assert_eq!(parsed.questions[0].text, "Which one is even?");
        assert_eq!(parsed.questions[0].correct_option, "c) 4");
    }

    #[test]
    fn numbered_questions_are_recognized() {
        let raw = "Here is your quiz:\n\n\
                   1. Question: X?\na) A\nb) B\nc) C\nd) D\nAnswer: b\n\n\
                   2) **Question:** Y?\na) A\nb) B\nc) C\nd) D\nAnswer: d";
        let mut parsed = parse_seeded(raw);
        parsed.questions.sort_by(|a, b| a.text.cmp(&b.text));

        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.questions[0].text, "X?");
        assert_eq!(parsed.questions[0].correct_option, "b) B");
        assert_eq!(parsed.questions[1].correct_option, "d) D");
    }

    #[test]
    fn labels_outside_a_to_d_drop_the_block() {
        let parsed = parse_seeded("Question 1: X?\nw) A\nx) B\ny) C\nz) D\nAnswer: x");

        assert!(parsed.is_empty());
        assert_eq!(
            parsed.diagnostics[0].error,
            BlockError::MalformedOption("w) A".to_string())
        );
    }

    #[test]
    fn bulleted_options_are_accepted() {
        let raw = "Question 1: X?\n- a) A\n- b) B\n\u{2022} c) C\n* d) D\nAnswer: c";
        let parsed = parse_seeded(raw);

        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(parsed.questions[0].options, vec!["a) A", "b) B", "c) C", "d) D"]);
        assert_eq!(parsed.questions[0].correct_option, "c) C");
    }

    #[test]
    fn empty_reply_yields_no_questions() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\n").diagnostics.is_empty());
        assert!(parse("Sorry, I cannot help with that.").is_empty());
    }
}
