use std::sync::Arc;

use crate::config::AppConfig;

use super::{ImageService, QuizService};

/// Configuration plus the services built from it. Viewers mounted through one context share
/// a single runtime module loader.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<AppConfig>,
    image_service: ImageService,
    quiz_service: QuizService,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::with_config(AppConfig::default())
    }
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        let config = Arc::new(config);
        Self {
            image_service: ImageService::new(Arc::clone(&config)),
            quiz_service: QuizService::new(config.quiz.revisit_policy),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn image_service(&self) -> &ImageService {
        &self.image_service
    }

    pub fn quiz_service(&self) -> &QuizService {
        &self.quiz_service
    }
}
