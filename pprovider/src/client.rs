//! A ready-to-call client for one provider, model, and key.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::adapters::anthropic::SequencePolicy;
use crate::adapters::{anthropic, google, openai};
use crate::{
    Completion, Diagnostic, HttpRequest, HttpTransport, Message, ProviderError,
    ProviderId, ProviderOperationHooks, SecretString,
};

/// Closed set of wire protocols, picked once when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderProtocol {
    OpenAi,
    Anthropic { sequence_policy: SequencePolicy },
    Google,
}

impl ProviderProtocol {
    pub fn for_provider(provider: ProviderId, sequence_policy: SequencePolicy) -> Self {
        match provider {
            ProviderId::OpenAi => Self::OpenAi,
            ProviderId::Anthropic => Self::Anthropic { sequence_policy },
            ProviderId::Google => Self::Google,
        }
    }

    pub fn provider(self) -> ProviderId {
        match self {
            Self::OpenAi => ProviderId::OpenAi,
            Self::Anthropic { .. } => ProviderId::Anthropic,
            Self::Google => ProviderId::Google,
        }
    }

    /// Formats `history` and builds the outbound request. Fails before any I/O when the
    /// formatted body would be empty.
    pub fn prepare(
        self,
        model: &str,
        api_key: &SecretString,
        history: &[Message],
    ) -> Result<(HttpRequest, Vec<Diagnostic>), ProviderError> {
        let (request, diagnostics, empty) = match self {
            Self::OpenAi => {
                let formatted = openai::format_messages(history);
                let request = openai::build_request(model, api_key, &formatted.body)?;
                (request, formatted.diagnostics, formatted.body.is_empty())
            }
            Self::Anthropic { sequence_policy } => {
                let formatted = anthropic::format_messages(history, sequence_policy)?;
                let request = anthropic::build_request(model, api_key, &formatted.body)?;
                (request, formatted.diagnostics, formatted.body.is_empty())
            }
            Self::Google => {
                let formatted = google::format_messages(history);
                let request = google::build_request(model, api_key, &formatted.body)?;
                (request, formatted.diagnostics, formatted.body.is_empty())
            }
        };

        if empty {
            return Err(ProviderError::invalid_request(
                "message formatting resulted in empty payload",
            ));
        }

        Ok((request, diagnostics))
    }

    pub fn parse(self, response: Value) -> Result<Completion, ProviderError> {
        match self {
            Self::OpenAi => openai::parse_response(response),
            Self::Anthropic { .. } => anthropic::parse_response(response),
            Self::Google => google::parse_response(response),
        }
    }
}

pub struct ProviderClient {
    protocol: ProviderProtocol,
    model_name: String,
    api_key: SecretString,
    transport: Arc<dyn HttpTransport>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl ProviderClient {
    pub fn new(
        protocol: ProviderProtocol,
        model_name: impl Into<String>,
        api_key: SecretString,
        transport: Arc<dyn HttpTransport>,
        hooks: Arc<dyn ProviderOperationHooks>,
    ) -> Self {
        Self {
            protocol,
            model_name: model_name.into(),
            api_key,
            transport,
            hooks,
        }
    }

    pub fn protocol(&self) -> ProviderProtocol {
        self.protocol
    }

    pub fn provider(&self) -> ProviderId {
        self.protocol.provider()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Format, call, parse. Returned text is trimmed; blank text comes back as `None`.
    pub async fn complete(&self, history: &[Message]) -> Result<Completion, ProviderError> {
        let provider = self.provider();
        let started = Instant::now();
        self.hooks.on_call_start(provider, &self.model_name);

        let result = self.complete_inner(history).await;
        match &result {
            Ok(completion) => {
                self.hooks
                    .on_success(provider, &self.model_name, started.elapsed(), completion)
            }
            Err(error) => {
                self.hooks
                    .on_failure(provider, &self.model_name, started.elapsed(), error)
            }
        }

        result
    }

    async fn complete_inner(&self, history: &[Message]) -> Result<Completion, ProviderError> {
        let (request, mut diagnostics) =
            self.protocol
                .prepare(&self.model_name, &self.api_key, history)?;
        let response = self.transport.post_json(request).await?;
        let mut completion = self.protocol.parse(response)?.normalized();

        diagnostics.append(&mut completion.diagnostics);
        completion.diagnostics = diagnostics;
        Ok(completion)
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("protocol", &self.protocol)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoopOperationHooks, ProviderErrorKind, ProviderFuture};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct CannedTransport {
        response: Value,
        calls: Mutex<u32>,
    }

    impl HttpTransport for CannedTransport {
        fn post_json<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
            Box::pin(async move {
                *self.calls.lock().expect("calls lock") += 1;
                Ok(self.response.clone())
            })
        }
    }

    fn client(protocol: ProviderProtocol, response: Value) -> (ProviderClient, Arc<CannedTransport>) {
        let transport = Arc::new(CannedTransport {
            response,
            calls: Mutex::new(0),
        });
        let client = ProviderClient::new(
            protocol,
            "model-x",
            SecretString::new("key"),
            transport.clone(),
            Arc::new(NoopOperationHooks),
        );
        (client, transport)
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_call() {
        let (client, transport) = client(ProviderProtocol::OpenAi, json!({}));
        let error = client.complete(&[]).await.expect_err("empty history should fail");

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert_eq!(*transport.calls.lock().expect("calls lock"), 0);
    }

    #[tokio::test]
    async fn google_history_of_only_system_messages_is_empty() {
        let (client, transport) = client(ProviderProtocol::Google, json!({}));
        let error = client
            .complete(&[Message::system("be brief")])
            .await
            .expect_err("nothing left to send");

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert_eq!(*transport.calls.lock().expect("calls lock"), 0);
    }

    #[tokio::test]
    async fn completion_is_trimmed_and_keeps_format_diagnostics() {
        let (client, _transport) = client(
            ProviderProtocol::Anthropic {
                sequence_policy: SequencePolicy::Warn,
            },
            json!({"type": "message", "content": [{"type": "text", "text": "  Hi!\n"}]}),
        );

        let completion = client
            .complete(&[Message::assistant("hello"), Message::user("hi")])
            .await
            .expect("completion should succeed");

        assert_eq!(completion.text.as_deref(), Some("Hi!"));
        assert_eq!(completion.diagnostics, vec![Diagnostic::FirstMessageNotUser]);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_absent() {
        let (client, _transport) = client(
            ProviderProtocol::OpenAi,
            json!({"choices": [{"message": {"content": "   "}}]}),
        );
        let completion = client
            .complete(&[Message::user("hi")])
            .await
            .expect("completion should succeed");
        assert_eq!(completion.text, None);
    }
}
