use serde::Serialize;

use super::{Phase, QuizSession, SubmitTrigger};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOutcome {
    pub id: String,
    pub selected: Option<usize>,
    pub correct_option: usize,
    pub answered: bool,
    pub correct: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSummary {
    pub title: Option<String>,
    pub completed: bool,
    pub score: usize,
    pub total: usize,
    pub answered: usize,
    pub percent: u32,
    /// `score/total`, e.g. `2/3`.
    pub score_label: String,
    /// Rounded percentage, e.g. `67%`.
    pub percent_label: String,
    pub questions: Vec<QuestionOutcome>,
}

pub fn percent(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (score as f64 * 100.0 / total as f64).round() as u32
}

impl QuizSummary {
    pub fn from_session(session: &QuizSession) -> Self {
        let (score, total) = (session.score(), session.total());
        let percent = percent(score, total);
        let questions = session
            .bank()
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let outcome = session.outcome(index);
                QuestionOutcome {
                    id: question.id.clone(),
                    selected: outcome.and_then(|outcome| outcome.selected),
                    correct_option: question.correct_option,
                    answered: outcome.is_some(),
                    correct: outcome.is_some_and(|outcome| outcome.correct),
                    timed_out: outcome.is_some_and(|outcome| {
                        outcome.trigger == SubmitTrigger::Timer && outcome.selected.is_none()
                    }),
                }
            })
            .collect();

        Self {
            title: session.bank().title.clone(),
            completed: session.phase() == Phase::Completed,
            score,
            total,
            answered: session.answered(),
            percent,
            score_label: format!("{score}/{total}"),
            percent_label: format!("{percent}%"),
            questions,
        }
    }
}

impl std::fmt::Display for QuizSummary {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} ({})", self.score_label, self.percent_label)
    }
}
