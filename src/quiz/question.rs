use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{QuizError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Study context shown next to a question. `images` are viewer identifiers in stack order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInfo {
    pub modality: String,
    pub body_part: String,
    pub study_date: Option<String>,
    pub findings: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correct_answer")]
    pub correct_option: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: String,
    #[serde(alias = "time_limit")]
    pub time_limit_secs: u32,
    #[serde(default)]
    pub image_info: ImageInfo,
}

impl QuizQuestion {
    pub fn image_ids(&self) -> &[String] {
        &self.image_info.images
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QuizError::InvalidBank(
                "question id must not be empty".to_string(),
            ));
        }
        if self.options.len() < 2 {
            return Err(QuizError::InvalidBank(format!(
                "question `{}` needs at least two options, found {}",
                self.id,
                self.options.len()
            )));
        }
        if self.correct_option >= self.options.len() {
            return Err(QuizError::InvalidBank(format!(
                "question `{}` marks option {} correct but has {} option(s)",
                self.id,
                self.correct_option,
                self.options.len()
            )));
        }
        if self.time_limit_secs == 0 {
            return Err(QuizError::InvalidBank(format!(
                "question `{}` has a zero time limit",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl QuestionBank {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            title: None,
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(QuizError::InvalidBank(
                "question bank must include at least one question".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for question in &self.questions {
            question.validate()?;
            if !seen.insert(question.id.as_str()) {
                return Err(QuizError::InvalidBank(format!(
                    "question id `{}` appears more than once",
                    question.id
                )));
            }
        }
        Ok(())
    }
}
