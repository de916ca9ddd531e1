//! Turns a model identifier plus a user into a [`ProviderClient`].

use std::sync::Arc;

use pcommon::UserId;

use crate::adapters::anthropic::SequencePolicy;
use crate::{
    CredentialResolver, HttpTransport, ModelIdentifier, NoopOperationHooks, ProviderClient,
    ProviderError, ProviderOperationHooks, ProviderProtocol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderOptions {
    pub anthropic_sequence_policy: SequencePolicy,
}

impl ProviderOptions {
    pub fn with_anthropic_sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.anthropic_sequence_policy = policy;
        self
    }
}

#[derive(Clone)]
pub struct ClientFactory {
    resolver: CredentialResolver,
    transport: Arc<dyn HttpTransport>,
    hooks: Arc<dyn ProviderOperationHooks>,
    options: ProviderOptions,
}

impl ClientFactory {
    pub fn new(resolver: CredentialResolver, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            resolver,
            transport,
            hooks: Arc::new(NoopOperationHooks),
            options: ProviderOptions::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Fails with `Configuration` for an unknown service, a missing model name, or when
    /// neither the user nor the system has a key for the provider.
    pub async fn create(
        &self,
        user: &UserId,
        model_identifier: &str,
    ) -> Result<ProviderClient, ProviderError> {
        let identifier = ModelIdentifier::parse(model_identifier)?;
        let provider = identifier.provider();

        let api_key = self
            .resolver
            .resolve(user, provider)
            .await
            .into_secret()
            .ok_or_else(|| {
                ProviderError::configuration(format!(
                    "API key for service '{provider}' is missing."
                ))
            })?;

        let protocol =
            ProviderProtocol::for_provider(provider, self.options.anthropic_sequence_policy);
        Ok(ProviderClient::new(
            protocol,
            identifier.model_name(),
            api_key,
            self.transport.clone(),
            self.hooks.clone(),
        ))
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        HttpRequest, InMemoryCredentialStore, ProviderErrorKind, ProviderFuture, ProviderId,
        SecretCipher, StaticSystemCredentials,
    };
    use serde_json::Value;

    #[derive(Debug)]
    struct UnusedTransport;

    impl HttpTransport for UnusedTransport {
        fn post_json<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
            Box::pin(async { Err(ProviderError::other("not used")) })
        }
    }

    fn factory(system: StaticSystemCredentials) -> ClientFactory {
        let cipher =
            Arc::new(SecretCipher::from_key(&SecretCipher::generate_key()).expect("valid key"));
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            cipher,
            Arc::new(system),
        );
        ClientFactory::new(resolver, Arc::new(UnusedTransport))
    }

    #[tokio::test]
    async fn create_dispatches_on_service_token() {
        let factory = factory(
            StaticSystemCredentials::new()
                .with_key(ProviderId::OpenAi, "sk")
                .with_key(ProviderId::Anthropic, "ak")
                .with_key(ProviderId::Google, "gk"),
        )
        .with_options(
            ProviderOptions::default().with_anthropic_sequence_policy(SequencePolicy::Reject),
        );
        let user = UserId::new("alice");

        let openai = factory.create(&user, "openai_gpt-4").await.expect("openai");
        assert_eq!(openai.protocol(), ProviderProtocol::OpenAi);
        assert_eq!(openai.model_name(), "gpt-4");

        let anthropic = factory
            .create(&user, "anthropic_claude-3-opus")
            .await
            .expect("anthropic");
        assert_eq!(
            anthropic.protocol(),
            ProviderProtocol::Anthropic {
                sequence_policy: SequencePolicy::Reject
            }
        );

        let google = factory
            .create(&user, "google_gemini-2.0-flash")
            .await
            .expect("google");
        assert_eq!(google.provider(), ProviderId::Google);
    }

    #[tokio::test]
    async fn missing_key_fails_fast_with_configuration_error() {
        let factory = factory(StaticSystemCredentials::new());
        let error = factory
            .create(&UserId::new("alice"), "anthropic_claude-3-haiku")
            .await
            .expect_err("no key anywhere");

        assert_eq!(error.kind, ProviderErrorKind::Configuration);
        assert_eq!(error.message, "API key for service 'anthropic' is missing.");
    }

    #[tokio::test]
    async fn unsupported_service_is_configuration_error() {
        let factory = factory(StaticSystemCredentials::new());
        let error = factory
            .create(&UserId::new("alice"), "mistral_large")
            .await
            .expect_err("unknown service");

        assert_eq!(error.kind, ProviderErrorKind::Configuration);
        assert_eq!(error.message, "Unsupported AI service: mistral");
    }
}
