use crate::comprehension::Quiz;
use crate::error::{GincanaError, Result};
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;

static PASSAGE_DIR: Dir = include_dir!("src/passages/sets");

pub const DEFAULT_SET: &str = "frases";

/// A reference text, optionally with its comprehension quiz
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Passage {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub quiz: Option<Quiz>,
}

impl Passage {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            title: "Texto personalizado".to_string(),
            text: text.into(),
            quiz: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PassageSet {
    pub name: String,
    pub passages: Vec<Passage>,
}

impl PassageSet {
    /// Load one of the built-in sets by name
    pub fn load(name: &str) -> Result<Self> {
        let file = PASSAGE_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| {
                GincanaError::ConfigurationUnavailable(format!("unknown passage set '{name}'"))
            })?;

        let contents = file.contents_utf8().ok_or_else(|| {
            GincanaError::ConfigurationUnavailable(format!("passage set '{name}' is not UTF-8"))
        })?;

        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let set: PassageSet = serde_json::from_str(json).map_err(|e| {
            GincanaError::ConfigurationUnavailable(format!("malformed passage set: {e}"))
        })?;

        if set.passages.is_empty() {
            return Err(GincanaError::ConfigurationUnavailable(format!(
                "passage set '{}' is empty",
                set.name
            )));
        }

        Ok(set)
    }

    /// Names of every built-in set
    pub fn available() -> Vec<String> {
        let mut names: Vec<String> = PASSAGE_DIR
            .files()
            .filter_map(|f| f.path().file_stem())
            .filter_map(|stem| stem.to_str())
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn pick_random(&self) -> Result<&Passage> {
        let rng = &mut rand::thread_rng();
        self.passages.choose(rng).ok_or_else(|| {
            GincanaError::ConfigurationUnavailable(format!("passage set '{}' is empty", self.name))
        })
    }

    pub fn find(&self, title: &str) -> Option<&Passage> {
        self.passages
            .iter()
            .find(|p| p.title.eq_ignore_ascii_case(title))
    }
}
