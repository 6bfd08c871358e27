use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::quiz::{
    Difficulty, QuestionBank, QuizSession, QuizSummary, RevisitPolicy, TickOutcome, load_bank,
};

use super::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankReport {
    pub title: Option<String>,
    pub questions: usize,
    pub images: usize,
    pub total_time_secs: u64,
    pub by_difficulty: BTreeMap<String, usize>,
    pub categories: Vec<String>,
}

impl BankReport {
    pub fn new(bank: &QuestionBank) -> Self {
        let mut by_difficulty = BTreeMap::new();
        let mut categories = Vec::new();
        for question in &bank.questions {
            let difficulty = match question.difficulty {
                Difficulty::Easy => "easy",
                Difficulty::Medium => "medium",
                Difficulty::Hard => "hard",
            };
            *by_difficulty.entry(difficulty.to_string()).or_insert(0) += 1;
            if !question.category.is_empty() && !categories.contains(&question.category) {
                categories.push(question.category.clone());
            }
        }
        Self {
            title: bank.title.clone(),
            questions: bank.questions.len(),
            images: bank.questions.iter().map(|q| q.image_ids().len()).sum(),
            total_time_secs: bank
                .questions
                .iter()
                .map(|question| u64::from(question.time_limit_secs))
                .sum(),
            by_difficulty,
            categories,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuizService {
    policy: RevisitPolicy,
}

impl QuizService {
    pub fn new(policy: RevisitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RevisitPolicy {
        self.policy
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<QuestionBank> {
        Ok(load_bank(path)?)
    }

    pub fn check(&self, path: impl AsRef<Path>) -> Result<BankReport> {
        Ok(BankReport::new(&self.load(path)?))
    }

    pub fn start(&self, bank: QuestionBank) -> Result<QuizSession> {
        Ok(QuizSession::new(bank, self.policy)?)
    }

    /// Plays the quiz with fixed answers. `None`, or a missing entry, lets the clock run out.
    pub fn run_scripted(&self, bank: QuestionBank, answers: &[Option<usize>]) -> Result<QuizSummary> {
        let mut session = self.start(bank)?;
        for index in 0..session.total() {
            match answers.get(index).copied().flatten() {
                Some(option) => {
                    session.select_option(option)?;
                    session.submit()?;
                }
                None => while !matches!(session.tick(), TickOutcome::Expired(_) | TickOutcome::Idle) {},
            }
            session.next()?;
        }
        Ok(session.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::{BankReport, QuizService};
    use crate::quiz::{Difficulty, ImageInfo, QuestionBank, QuizQuestion, RevisitPolicy};
    use crate::runtime::AppError;

    fn bank() -> QuestionBank {
        let question = |id: &str, correct_option, time_limit_secs, difficulty| QuizQuestion {
            id: id.to_string(),
            prompt: "Finding?".to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_option,
            explanation: String::new(),
            difficulty,
            category: "Neuro".to_string(),
            time_limit_secs,
            image_info: ImageInfo {
                images: vec!["a.png".to_string(), "b.png".to_string()],
                ..ImageInfo::default()
            },
        };
        QuestionBank::new(vec![
            question("q1", 0, 120, Difficulty::Easy),
            question("q2", 1, 180, Difficulty::Hard),
            question("q3", 2, 90, Difficulty::Hard),
        ])
    }

    #[test]
    fn scripted_run_with_a_timeout() {
        let service = QuizService::new(RevisitPolicy::Reset);
        let summary = service
            .run_scripted(bank(), &[Some(0), None, Some(2)])
            .expect("run");
        assert!(summary.completed);
        assert_eq!(summary.score_label, "2/3");
        assert_eq!(summary.percent_label, "67%");

        let summary = service.run_scripted(bank(), &[Some(1)]).expect("run");
        assert_eq!(summary.score, 0);
        assert_eq!(summary.answered, 3);
    }

    #[test]
    fn scripted_run_rejects_bad_options() {
        let service = QuizService::default();
        assert!(matches!(
            service.run_scripted(bank(), &[Some(5)]),
            Err(AppError::Quiz(_))
        ));
    }

    #[test]
    fn bank_report_counts() {
        let report = BankReport::new(&bank());
        assert_eq!(report.questions, 3);
        assert_eq!(report.images, 6);
        assert_eq!(report.total_time_secs, 390);
        assert_eq!(report.by_difficulty.get("hard"), Some(&2));
        assert_eq!(report.categories, vec!["Neuro".to_string()]);
    }
}
