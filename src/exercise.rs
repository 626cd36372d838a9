use crate::comprehension::Quiz;
use crate::error::{GincanaError, Result};
use crate::record::{build_at, ResultRecord};
use crate::scoring::{score, ScoreResult};
use crate::session::{SessionConfig, SessionPhase, SessionState};
use crate::store::ResultStore;
use crate::timer::{clamp_elapsed, Clock, SessionTimer, SystemClock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadySaved,
}

/// One agent's attempt: drives the phases from agent id entry to results.
///
/// Nothing here sleeps or spawns. The host calls [`Exercise::tick`] on its
/// own schedule and forwards user actions; every timed transition is
/// derived from the clock at that moment.
#[derive(Debug)]
pub struct Exercise<C: Clock = SystemClock> {
    config: SessionConfig,
    clock: C,
    state: SessionState,
}

impl Exercise<SystemClock> {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Exercise<C> {
    pub fn with_clock(config: SessionConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: SessionState::default(),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn agent_id(&self) -> &str {
        &self.state.agent_id
    }

    pub fn reference_text(&self) -> &str {
        &self.config.reference_text
    }

    pub fn submitted(&self) -> &str {
        &self.state.submitted
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.config.quiz.as_ref()
    }

    pub fn responses(&self) -> &[Option<usize>] {
        &self.state.responses
    }

    pub fn record(&self) -> Option<&ResultRecord> {
        self.state.record.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.state.saved
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    /// Time left in the current timed phase
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.state.timer.and_then(|timer| timer.remaining(now))
    }

    /// Time spent so far in the current phase
    pub fn elapsed(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.state.timer.map(|timer| timer.elapsed(now))
    }

    /// Unrounded metrics of the finished attempt
    pub fn score(&self) -> Option<ScoreResult> {
        let typing_secs = self.state.typing_secs?;
        Some(score(
            &self.config.reference_text,
            &self.state.submitted,
            typing_secs,
            self.state.reading_secs,
        ))
    }

    pub fn set_agent_id(&mut self, agent_id: &str) -> Result<()> {
        self.require(SessionPhase::IdInput, "change the agent id")?;
        self.state.agent_id = agent_id.trim().to_string();
        Ok(())
    }

    /// Leave agent id entry for the first configured phase
    pub fn start(&mut self) -> Result<SessionPhase> {
        self.require(SessionPhase::IdInput, "start")?;
        if self.state.agent_id.trim().is_empty() {
            return Err(GincanaError::Validation(
                "an agent id is required to start".to_string(),
            ));
        }

        let now = self.clock.now();
        let first = self.config.first_phase();
        tracing::info!(agent_id = %self.state.agent_id, "session started");
        self.enter(first, now);
        Ok(first)
    }

    /// Re-evaluate the timers. Returns the new phase if one expired.
    pub fn tick(&mut self) -> Option<SessionPhase> {
        let now = self.clock.now();
        let expired = self
            .state
            .timer
            .is_some_and(|timer| timer.is_expired(now));
        if !expired {
            return None;
        }

        match self.state.phase {
            SessionPhase::Countdown => {
                let next = if self.config.reading {
                    SessionPhase::Reading
                } else {
                    SessionPhase::Typing
                };
                self.enter(next, now);
                Some(next)
            }
            SessionPhase::Typing => {
                tracing::info!("typing time is up");
                Some(self.complete_typing(now))
            }
            _ => None,
        }
    }

    pub fn finish_reading(&mut self) -> Result<SessionPhase> {
        self.require(SessionPhase::Reading, "finish reading")?;
        let now = self.clock.now();
        let elapsed = self.frozen_elapsed(now);
        self.state.reading_secs = Some(clamp_elapsed(elapsed, None));
        self.enter(SessionPhase::Typing, now);
        Ok(SessionPhase::Typing)
    }

    pub fn type_char(&mut self, c: char) -> Result<()> {
        self.require_typing("type")?;
        self.state.submitted.push(c);
        Ok(())
    }

    pub fn backspace(&mut self) -> Result<()> {
        self.require_typing("delete")?;
        self.state.submitted.pop();
        Ok(())
    }

    /// Replace the submission with the surface's current text
    pub fn set_submitted(&mut self, text: &str) -> Result<()> {
        self.require_typing("edit the text")?;
        self.state.submitted = text.to_string();
        Ok(())
    }

    /// Early finish; the submission is frozen from here on
    pub fn finish_typing(&mut self) -> Result<SessionPhase> {
        self.require(SessionPhase::Typing, "finish typing")?;
        let now = self.clock.now();
        Ok(self.complete_typing(now))
    }

    pub fn select_answer(&mut self, question: usize, option: usize) -> Result<()> {
        self.require(SessionPhase::Comprehension, "answer")?;
        let options = self
            .config
            .quiz
            .as_ref()
            .and_then(|quiz| quiz.questions.get(question))
            .map(|q| q.options.len())
            .ok_or_else(|| {
                GincanaError::Validation(format!("there is no question {}", question + 1))
            })?;
        if option >= options {
            return Err(GincanaError::Validation(format!(
                "question {} has no option {}",
                question + 1,
                option + 1
            )));
        }

        if let Some(slot) = self.state.responses.get_mut(question) {
            *slot = Some(option);
        }
        Ok(())
    }

    /// Submit the quiz; unanswered questions simply count as wrong
    pub fn submit_answers(&mut self) -> Result<SessionPhase> {
        self.require(SessionPhase::Comprehension, "submit answers")?;
        let now = self.clock.now();
        self.enter(SessionPhase::Results, now);
        Ok(SessionPhase::Results)
    }

    /// Hand the record to the store once. Repeated calls after a save are
    /// no-ops; a failed save can be retried without losing the record.
    pub fn save(&mut self, store: &mut dyn ResultStore) -> Result<SaveOutcome> {
        self.require(SessionPhase::Results, "save")?;
        if self.state.saved || self.state.saving {
            tracing::debug!("save skipped, result already saved");
            return Ok(SaveOutcome::AlreadySaved);
        }

        self.state.saving = true;
        let outcome = match self.state.record {
            Some(ref record) => store.append(record),
            None => Err(GincanaError::Persistence(
                "no result has been computed".to_string(),
            )),
        };
        self.state.saving = false;

        match outcome {
            Ok(()) => {
                self.state.saved = true;
                self.state.last_error = None;
                tracing::info!(agent_id = %self.state.agent_id, "result saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                let message = match e {
                    GincanaError::Persistence(message) => message,
                    other => other.to_string(),
                };
                tracing::error!(error = %message, "saving result failed");
                self.state.last_error = Some(message.clone());
                Err(GincanaError::Persistence(message))
            }
        }
    }

    /// Abandon everything and go back to agent id entry
    pub fn reset(&mut self) {
        tracing::info!(from = %self.state.phase, "session reset");
        self.state = SessionState::default();
    }

    fn require(&self, phase: SessionPhase, action: &'static str) -> Result<()> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(GincanaError::WrongPhase {
                phase: self.state.phase,
                action,
            })
        }
    }

    /// Edits are accepted only while typing time remains
    fn require_typing(&mut self, action: &'static str) -> Result<()> {
        self.tick();
        self.require(SessionPhase::Typing, action)
    }

    fn frozen_elapsed(&self, now: Instant) -> f64 {
        self.state
            .timer
            .map(|timer| timer.elapsed(now).as_secs_f64())
            .unwrap_or(0.0)
    }

    fn complete_typing(&mut self, now: Instant) -> SessionPhase {
        let elapsed = self.frozen_elapsed(now);
        self.state.typing_secs = Some(clamp_elapsed(
            elapsed,
            Some(self.config.typing_secs_limit()),
        ));

        let next = if self.config.quiz.is_some() {
            SessionPhase::Comprehension
        } else {
            SessionPhase::Results
        };
        self.enter(next, now);
        next
    }

    fn enter(&mut self, phase: SessionPhase, now: Instant) {
        tracing::info!(from = %self.state.phase, to = %phase, "phase transition");
        self.state.phase = phase;
        self.state.timer = match phase {
            SessionPhase::Countdown => Some(SessionTimer::start(now, self.config.countdown)),
            SessionPhase::Reading => Some(SessionTimer::start(now, None)),
            SessionPhase::Typing => {
                Some(SessionTimer::start(now, Some(self.config.typing_duration)))
            }
            SessionPhase::IdInput | SessionPhase::Comprehension | SessionPhase::Results => None,
        };

        match phase {
            SessionPhase::Comprehension => {
                self.state.responses = self
                    .config
                    .quiz
                    .as_ref()
                    .map(Quiz::blank_responses)
                    .unwrap_or_default();
            }
            SessionPhase::Results => self.build_record(),
            _ => {}
        }
    }

    fn build_record(&mut self) {
        if self.state.record.is_some() {
            return;
        }

        let record = build_at(
            &self.state.agent_id,
            &self.config.reference_text,
            &self.state.submitted,
            self.state.typing_secs.unwrap_or(crate::timer::MIN_ELAPSED_SECS),
            self.state.reading_secs,
            self.config.quiz.as_ref(),
            &self.state.responses,
            self.clock.wall_time(),
        );
        tracing::info!(
            agent_id = %record.agent_id,
            wpm = record.wpm,
            accuracy = record.accuracy,
            errors = record.errors,
            "result computed"
        );
        self.state.record = Some(record);
    }
}
