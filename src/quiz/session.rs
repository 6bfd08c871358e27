use serde::{Deserialize, Serialize};

use super::{Countdown, QuestionBank, QuizError, QuizQuestion, QuizSummary, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Answering,
    Revealed,
    Completed,
}

/// What a learner sees when returning to a question they already answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisitPolicy {
    /// Selection and reveal are cleared and the timer restarts.
    #[default]
    Reset,
    /// The question is shown revealed again with the earlier answer.
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitTrigger {
    User,
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuestionSlot {
    Unanswered {
        selected: Option<usize>,
    },
    Answered {
        selected: Option<usize>,
        correct: bool,
        trigger: SubmitTrigger,
    },
}

impl Default for QuestionSlot {
    fn default() -> Self {
        Self::Unanswered { selected: None }
    }
}

impl QuestionSlot {
    pub fn selected(&self) -> Option<usize> {
        match *self {
            Self::Unanswered { selected } | Self::Answered { selected, .. } => selected,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Result of a question's first reveal. Later reveals never change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub selected: Option<usize>,
    pub correct: bool,
    pub trigger: SubmitTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reveal {
    pub question_index: usize,
    pub selected: Option<usize>,
    pub correct_option: usize,
    pub correct: bool,
    pub explanation: String,
    pub trigger: SubmitTrigger,
    /// True when this reveal added a point to the score.
    pub awarded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not answering; the countdown is paused.
    Idle,
    Running { remaining: u32 },
    /// The countdown hit zero and the question was submitted.
    Expired(Reveal),
}

/// State machine for one pass through a question bank.
#[derive(Debug, Clone)]
pub struct QuizSession {
    bank: QuestionBank,
    policy: RevisitPolicy,
    index: usize,
    phase: Phase,
    slots: Vec<QuestionSlot>,
    outcomes: Vec<Option<Outcome>>,
    countdown: Countdown,
    generation: u64,
}

impl QuizSession {
    pub fn new(bank: QuestionBank, policy: RevisitPolicy) -> Result<Self> {
        bank.validate()?;
        let total = bank.questions.len();
        let countdown = Countdown::new(bank.questions[0].time_limit_secs);
        Ok(Self {
            bank,
            policy,
            index: 0,
            phase: Phase::Answering,
            slots: vec![QuestionSlot::default(); total],
            outcomes: vec![None; total],
            countdown,
            generation: 0,
        })
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn policy(&self) -> RevisitPolicy {
        self.policy
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.bank.questions.len()
    }

    /// Bumped on every question change; tag timers with it to discard stale ticks.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The active question, `None` once completed.
    pub fn current(&self) -> Option<&QuizQuestion> {
        match self.phase {
            Phase::Completed => None,
            Phase::Answering | Phase::Revealed => self.bank.questions.get(self.index),
        }
    }

    fn question(&self) -> &QuizQuestion {
        &self.bank.questions[self.index]
    }

    pub fn slot(&self, index: usize) -> Option<QuestionSlot> {
        self.slots.get(index).copied()
    }

    pub fn selected(&self) -> Option<usize> {
        self.slots[self.index].selected()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn score(&self) -> usize {
        self.outcomes
            .iter()
            .flatten()
            .filter(|outcome| outcome.correct)
            .count()
    }

    pub fn answered(&self) -> usize {
        self.outcomes.iter().flatten().count()
    }

    pub fn outcome(&self, index: usize) -> Option<Outcome> {
        self.outcomes.get(index).copied().flatten()
    }

    fn require(&self, action: &'static str, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(QuizError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    pub fn select_option(&mut self, option: usize) -> Result<()> {
        self.require("select", &[Phase::Answering])?;
        let options = self.question().options.len();
        if option >= options {
            return Err(QuizError::OptionOutOfRange {
                index: option,
                options,
            });
        }
        self.slots[self.index] = QuestionSlot::Unanswered {
            selected: Some(option),
        };
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Reveal> {
        self.submit_with(SubmitTrigger::User)
    }

    /// The single path into `Revealed`. A second submit returns the existing reveal.
    fn submit_with(&mut self, trigger: SubmitTrigger) -> Result<Reveal> {
        if self.phase == Phase::Revealed
            && let Some(reveal) = self.reveal()
        {
            return Ok(reveal);
        }
        self.require("submit", &[Phase::Answering])?;

        let selected = self.selected();
        if trigger == SubmitTrigger::User && selected.is_none() {
            return Err(QuizError::NoSelection);
        }
        let correct = selected.is_some_and(|option| self.question().is_correct(option));
        self.slots[self.index] = QuestionSlot::Answered {
            selected,
            correct,
            trigger,
        };
        self.phase = Phase::Revealed;

        let awarded = match self.outcomes[self.index] {
            Some(_) => false,
            None => {
                self.outcomes[self.index] = Some(Outcome {
                    selected,
                    correct,
                    trigger,
                });
                correct
            }
        };
        log::info!(
            "question {} submitted by {trigger:?}: {} (score {}/{})",
            self.question().id,
            if correct { "correct" } else { "incorrect" },
            self.score(),
            self.total()
        );

        let mut reveal = self.reveal().ok_or(QuizError::InvalidTransition {
            action: "submit",
            phase: self.phase,
        })?;
        reveal.awarded = awarded;
        Ok(reveal)
    }

    /// The reveal for the active question while `Revealed`.
    pub fn reveal(&self) -> Option<Reveal> {
        if self.phase != Phase::Revealed {
            return None;
        }
        let QuestionSlot::Answered {
            selected,
            correct,
            trigger,
        } = self.slots[self.index]
        else {
            return None;
        };
        let question = self.question();
        Some(Reveal {
            question_index: self.index,
            selected,
            correct_option: question.correct_option,
            correct,
            explanation: question.explanation.clone(),
            trigger,
            awarded: false,
        })
    }

    /// One elapsed second of the active question's countdown.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Answering {
            return TickOutcome::Idle;
        }
        if !self.countdown.tick() {
            return TickOutcome::Running {
                remaining: self.countdown.remaining(),
            };
        }
        match self.submit_with(SubmitTrigger::Timer) {
            Ok(reveal) => TickOutcome::Expired(reveal),
            Err(error) => {
                log::error!("timed submit failed: {error}");
                TickOutcome::Idle
            }
        }
    }

    /// Moves on from a revealed question; after the last one the session completes.
    pub fn next(&mut self) -> Result<Phase> {
        self.require("next", &[Phase::Revealed])?;
        if self.index + 1 >= self.total() {
            self.phase = Phase::Completed;
            self.generation = self.generation.saturating_add(1);
            log::info!("quiz completed: {}/{}", self.score(), self.total());
        } else {
            self.go_to(self.index + 1);
        }
        Ok(self.phase)
    }

    /// Steps back one question. Already at the first question this does nothing.
    pub fn previous(&mut self) -> Result<Phase> {
        self.require("previous", &[Phase::Answering, Phase::Revealed])?;
        if let Some(index) = self.index.checked_sub(1) {
            self.go_to(index);
        }
        Ok(self.phase)
    }

    fn go_to(&mut self, index: usize) {
        self.index = index;
        self.generation = self.generation.saturating_add(1);
        let limit = self.question().time_limit_secs;
        self.countdown.restart(limit);

        let slot = &mut self.slots[index];
        match self.policy {
            RevisitPolicy::Reset => {
                *slot = QuestionSlot::default();
                self.phase = Phase::Answering;
            }
            RevisitPolicy::Preserve if slot.is_answered() => self.phase = Phase::Revealed,
            RevisitPolicy::Preserve => self.phase = Phase::Answering,
        }
        log::debug!("question {} ({:?})", index + 1, self.phase);
    }

    pub fn restart(&mut self) {
        self.slots.fill(QuestionSlot::default());
        self.outcomes.fill(None);
        self.index = 0;
        self.phase = Phase::Answering;
        self.generation = self.generation.saturating_add(1);
        let limit = self.question().time_limit_secs;
        self.countdown.restart(limit);
        log::info!("quiz restarted");
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary::from_session(self)
    }
}
