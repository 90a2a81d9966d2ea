use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use secrecy::ExposeSecret;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

/// Text deltas as the provider produces them.
pub type TextStream = BoxStream<'static, AppResult<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Opens a streamed completion. Errors here mean the stream never started.
    async fn stream_text(&self, prompt: &Prompt) -> AppResult<TextStream>;
}

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.openai_api_key.expose_secret())
            .with_api_base(&config.openai_api_base);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.openai_model.clone(),
            temperature: config.generation_temperature,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn stream_text(&self, prompt: &Prompt) -> AppResult<TextStream> {
        log::debug!(
            "Opening completion stream, model: {}, prompt length: {} chars",
            self.model_name,
            prompt.user.len()
        );

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .temperature(self.temperature)
            .stream(true)
            .build()?;

        let stream = self.client.chat().create_stream(request).await.map_err(|e| {
            log::warn!("Provider rejected completion request: {}", e);
            AppError::from(e)
        })?;

        Ok(stream
            .map(|chunk| match chunk {
                Ok(response) => Ok(response
                    .choices
                    .into_iter()
                    .filter_map(|choice| choice.delta.content)
                    .collect::<String>()),
                Err(e) => Err(AppError::from(e)),
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_model_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OpenAiModel>();
    }

    #[test]
    fn openai_model_uses_configured_model() {
        let model = OpenAiModel::new(&Config::test_config());
        assert_eq!(model.model_name, "test-model");
    }
}
