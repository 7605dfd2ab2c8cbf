use notechat_core::{AppConfig, Error, Result, think};
use reqwest::Client as HttpClient;
use std::path::Path;
use std::sync::Arc;

use crate::mock::MockProvider;
use crate::sse;
use crate::types::*;

/// Chat-completion backend
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Single-shot completion: `choices[0].message.content`, trimmed
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Streamed completion as cumulative snapshots.
    ///
    /// HTTP failures are reported here, before any snapshot is produced.
    async fn stream_completion(&self, request: CompletionRequest) -> Result<SnapshotStream>;

    /// Single-shot completion with reasoning blocks rendered for display
    async fn request_once(&self, request: CompletionRequest) -> Result<String> {
        let reply = self.complete(request).await?;
        Ok(think::render(&reply))
    }
}

/// Provider for any OpenAI-compatible chat-completions endpoint
pub struct OpenAiCompatProvider {
    client: HttpClient,
    api_key: String,
}

impl OpenAiCompatProvider {
    /// No request timeout is set; the transport defaults apply.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { client: HttpClient::new(), api_key: api_key.into() }
    }

    /// Send the request and fail on any non-2xx status
    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let params = &request.params;
        tracing::info!(
            url = %params.api_url,
            model = %params.model,
            stream,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&params.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request.wire_body(stream))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion request failed");
            return Err(Error::http(status.as_u16(), body));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiCompatProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let response = self.send(&request, false).await?;
        let body = response.text().await.map_err(transport)?;

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| Error::Decode(format!("invalid completion body: {}", e)))?;

        parsed
            .into_content()
            .ok_or_else(|| Error::Decode("response has no choices[0].message.content".to_string()))
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<SnapshotStream> {
        let response = self.send(&request, true).await?;

        // The body stream owns the connection; dropping the snapshots closes it.
        Ok(Box::pin(sse::snapshots(response.bytes_stream())))
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

/// Builds the provider the application talks to
pub struct ProviderFactory;

impl ProviderFactory {
    /// A scripted provider when `mock` is given, otherwise the HTTP provider
    pub fn create(app: &AppConfig, mock: Option<&Path>) -> Result<Arc<dyn Provider>> {
        match mock {
            Some(path) => Ok(Arc::new(MockProvider::from_file(path)?)),
            None => Ok(Arc::new(OpenAiCompatProvider::new(app.secrets.api_key.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notechat_core::{Config, Secrets};

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiCompatProvider::new("test-key");
        assert_eq!(provider.api_key, "test-key");
    }

    #[test]
    fn test_factory_http_provider() {
        let config = Config::default();
        let secrets = Secrets::resolve(&config, |_| None);
        let app = AppConfig::new(config, secrets);
        assert!(ProviderFactory::create(&app, None).is_ok());
    }

    #[test]
    fn test_factory_missing_mock_file() {
        let app = AppConfig::new(Config::default(), Secrets::resolve(&Config::default(), |_| None));
        let result = ProviderFactory::create(&app, Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = OpenAiCompatProvider::new("k");
        let mut params = notechat_core::CompletionParams::default();
        params.api_url = "http://127.0.0.1:9/v1/chat/completions".to_string();

        let result = provider.complete(CompletionRequest::new(vec![], params)).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
