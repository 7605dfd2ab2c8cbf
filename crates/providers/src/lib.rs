pub mod adapter;
pub mod mock;
pub mod sse;
pub mod summary;
pub mod types;

pub use adapter::{OpenAiCompatProvider, Provider, ProviderFactory};
pub use mock::{MockProvider, MockResponse};
pub use summary::summarize;
pub use types::{CompletionRequest, SnapshotStream, WireRequest};

pub use notechat_core::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use notechat_core::{ChatMessage, CompletionParams};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_provider_is_object_safe() {
        let provider: Arc<dyn Provider> =
            Arc::new(MockProvider::new(vec![MockResponse::Text { content: "ok".to_string() }]));

        let request = CompletionRequest::new(vec![ChatMessage::user("ping")], CompletionParams::default());
        assert_eq!(provider.complete(request).await.unwrap(), "ok");
    }
}
