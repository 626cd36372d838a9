use crate::error::{GincanaError, Result};
use serde::{Deserialize, Serialize};

/// One multiple-choice question; `correct` indexes into `options`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: usize,
}

/// Ordered answer key. A question's position is its identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(GincanaError::ConfigurationUnavailable(
                "comprehension quiz has no questions".to_string(),
            ));
        }

        for (idx, question) in self.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(GincanaError::ConfigurationUnavailable(format!(
                    "question {} needs at least two options",
                    idx + 1
                )));
            }
            if question.correct >= question.options.len() {
                return Err(GincanaError::ConfigurationUnavailable(format!(
                    "question {} marks option {} correct but only has {}",
                    idx + 1,
                    question.correct + 1,
                    question.options.len()
                )));
            }
        }

        Ok(())
    }

    /// Slots for the user's answers, all unanswered
    pub fn blank_responses(&self) -> Vec<Option<usize>> {
        vec![None; self.questions.len()]
    }

    pub fn grade(&self, responses: &[Option<usize>]) -> usize {
        let key: Vec<usize> = self.questions.iter().map(|q| q.correct).collect();
        grade(&key, responses)
    }
}

/// Count the positions where the selected option equals the key.
/// Unanswered slots never match; entries past the shorter side are ignored.
pub fn grade<T: PartialEq>(answer_key: &[T], responses: &[Option<T>]) -> usize {
    answer_key
        .iter()
        .zip(responses)
        .filter(|(expected, selected)| selected.as_ref() == Some(*expected))
        .count()
}
