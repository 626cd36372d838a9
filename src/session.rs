use crate::comprehension::Quiz;
use crate::error::{GincanaError, Result};
use crate::normalize::normalize;
use crate::record::ResultRecord;
use crate::timer::SessionTimer;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    #[strum(serialize = "agent id")]
    IdInput,
    #[strum(serialize = "countdown")]
    Countdown,
    #[strum(serialize = "reading")]
    Reading,
    #[strum(serialize = "typing")]
    Typing,
    #[strum(serialize = "comprehension")]
    Comprehension,
    #[strum(serialize = "results")]
    Results,
}

pub const DEFAULT_COUNTDOWN_SECS: u64 = 5;

/// Static input for one session, resolved before it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub reference_text: String,
    pub typing_duration: Duration,
    pub countdown: Option<Duration>,
    pub reading: bool,
    pub quiz: Option<Quiz>,
}

impl SessionConfig {
    /// Minimal path: agent id, typing, results
    pub fn typing_only(reference_text: impl Into<String>, typing_duration: Duration) -> Self {
        Self {
            reference_text: reference_text.into(),
            typing_duration,
            countdown: None,
            reading: false,
            quiz: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if normalize(&self.reference_text).is_empty() {
            return Err(GincanaError::ConfigurationUnavailable(
                "reference text is empty".to_string(),
            ));
        }
        if self.typing_duration.is_zero() {
            return Err(GincanaError::ConfigurationUnavailable(
                "typing duration must be positive".to_string(),
            ));
        }
        if let Some(ref quiz) = self.quiz {
            quiz.validate()?;
        }
        Ok(())
    }

    /// First phase after the agent id has been accepted
    pub fn first_phase(&self) -> SessionPhase {
        if self.countdown.is_some() {
            SessionPhase::Countdown
        } else if self.reading {
            SessionPhase::Reading
        } else {
            SessionPhase::Typing
        }
    }

    pub fn typing_secs_limit(&self) -> f64 {
        self.typing_duration.as_secs_f64()
    }
}

/// All mutable state of one attempt. Reset replaces it with the default.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub agent_id: String,
    // Timer of the phase currently running, if it is timed
    pub timer: Option<SessionTimer>,
    pub reading_secs: Option<f64>,
    pub typing_secs: Option<f64>,
    pub submitted: String,
    pub responses: Vec<Option<usize>>,
    // Results
    pub record: Option<ResultRecord>,
    pub saving: bool,
    pub saved: bool,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::IdInput,
            agent_id: String::new(),
            timer: None,
            reading_secs: None,
            typing_secs: None,
            submitted: String::new(),
            responses: Vec::new(),
            record: None,
            saving: false,
            saved: false,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comprehension::Question;
    use assert_matches::assert_matches;

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::IdInput.to_string(), "agent id");
        assert_eq!(SessionPhase::Comprehension.to_string(), "comprehension");
    }

    #[test]
    fn test_phase_serializes_screaming() {
        let json = serde_json::to_string(&SessionPhase::IdInput).unwrap();
        assert_eq!(json, "\"ID_INPUT\"");
    }

    #[test]
    fn test_default_state() {
        let state = SessionState::default();

        assert_eq!(state.phase, SessionPhase::IdInput);
        assert!(state.agent_id.is_empty());
        assert!(state.timer.is_none());
        assert!(state.record.is_none());
        assert!(!state.saved);
        assert!(!state.saving);
    }

    #[test]
    fn test_first_phase() {
        let mut config = SessionConfig::typing_only("hola", Duration::from_secs(60));
        assert_eq!(config.first_phase(), SessionPhase::Typing);

        config.reading = true;
        assert_eq!(config.first_phase(), SessionPhase::Reading);

        config.countdown = Some(Duration::from_secs(DEFAULT_COUNTDOWN_SECS));
        assert_eq!(config.first_phase(), SessionPhase::Countdown);
    }

    #[test]
    fn test_validate_rejects_blank_reference() {
        let config = SessionConfig::typing_only(" \n\t", Duration::from_secs(60));
        assert_matches!(
            config.validate(),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let config = SessionConfig::typing_only("hola", Duration::ZERO);
        assert_matches!(
            config.validate(),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }

    #[test]
    fn test_validate_checks_quiz() {
        let mut config = SessionConfig::typing_only("hola", Duration::from_secs(60));
        config.quiz = Some(Quiz::new(vec![Question {
            prompt: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct: 2,
        }]));

        assert_matches!(
            config.validate(),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }
}
