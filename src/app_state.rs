use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        model_service::{LanguageModel, OpenAiModel},
        question_service::{GenerationLimits, QuestionService},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub question_service: Arc<QuestionService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiModel::new(&config));
        Self::with_model(config, model)
    }

    /// Builds the state around any provider, e.g. a stub in tests.
    pub fn with_model(config: Config, model: Arc<dyn LanguageModel>) -> Self {
        let question_service = Arc::new(QuestionService::new(
            model,
            GenerationLimits::from(&config),
        ));

        Self {
            question_service,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn app_state_builds_without_network() {
        let state = AppState::new(Config::test_config());
        assert_eq!(state.config.openai_model, "test-model");
    }
}
