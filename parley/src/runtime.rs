//! Runtime wiring: stores, credentials, transport, hooks, and the chat service.

use std::sync::Arc;

use pchat::{ChatPolicy, ChatService, TurnHooks};
use pmemory::{ChatStores, create_chat_stores};
use pobserve::{
    CompositeHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
use pprovider::{
    ClientFactory, CredentialManager, CredentialResolver, EnvSystemCredentials, HttpTransport,
    ModelCatalog, ProviderOperationHooks, ProviderOptions, ReqwestTransport, SecretCipher,
    SystemCredentialSource,
};

use crate::config::{AppConfig, ConfigError, ConfigErrorKind, ENCRYPTION_KEY_VAR};

#[derive(Clone)]
pub struct RuntimeBundle {
    pub stores: ChatStores,
    pub chat: ChatService,
    pub credentials: CredentialManager,
    pub resolver: CredentialResolver,
}

impl std::fmt::Debug for RuntimeBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBundle")
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

/// Seams that differ between production and tests.
pub struct RuntimeParts {
    pub transport: Arc<dyn HttpTransport>,
    pub system_credentials: Arc<dyn SystemCredentialSource>,
    pub catalog: ModelCatalog,
    pub provider_hooks: Arc<dyn ProviderOperationHooks>,
    pub turn_hooks: Arc<dyn TurnHooks>,
}

impl RuntimeParts {
    /// Reqwest transport, environment system keys, tracing plus metrics hooks.
    pub fn production(config: &AppConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.provider_timeout)
            .map_err(|error| ConfigError::startup(error.message))?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            system_credentials: Arc::new(EnvSystemCredentials),
            catalog: ModelCatalog::default(),
            provider_hooks: observability_provider_hooks(),
            turn_hooks: observability_turn_hooks(),
        }
    }

    pub fn with_system_credentials(mut self, source: Arc<dyn SystemCredentialSource>) -> Self {
        self.system_credentials = source;
        self
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_provider_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.provider_hooks = hooks;
        self
    }

    pub fn with_turn_hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.turn_hooks = hooks;
        self
    }
}

impl std::fmt::Debug for RuntimeParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeParts")
            .field("transport", &self.transport)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

pub fn observability_provider_hooks() -> Arc<dyn ProviderOperationHooks> {
    Arc::new(SafeProviderHooks::new(CompositeHooks::new(
        TracingObservabilityHooks,
        MetricsObservabilityHooks,
    )))
}

pub fn observability_turn_hooks() -> Arc<dyn TurnHooks> {
    Arc::new(SafeTurnHooks::new(CompositeHooks::new(
        TracingObservabilityHooks,
        MetricsObservabilityHooks,
    )))
}

pub fn build_runtime_from_env() -> Result<RuntimeBundle, ConfigError> {
    build_runtime(AppConfig::from_env()?)
}

pub fn build_runtime(config: AppConfig) -> Result<RuntimeBundle, ConfigError> {
    let parts = RuntimeParts::production(&config)?;
    build_runtime_with(config, parts)
}

pub fn build_runtime_with(
    config: AppConfig,
    parts: RuntimeParts,
) -> Result<RuntimeBundle, ConfigError> {
    let cipher = SecretCipher::from_key(config.encryption_key.expose()).map_err(|error| {
        ConfigError::new(
            ConfigErrorKind::InvalidSetting,
            format!("{ENCRYPTION_KEY_VAR} is not a usable key: {}", error.message),
        )
    })?;
    let cipher = Arc::new(cipher);

    let stores = create_chat_stores(config.store.clone())
        .map_err(|error| ConfigError::startup(format!("failed to open store: {}", error.message)))?;

    let resolver = CredentialResolver::new(
        Arc::clone(&stores.credentials),
        Arc::clone(&cipher),
        parts.system_credentials,
    );
    let credentials = CredentialManager::new(Arc::clone(&stores.credentials), cipher);

    let factory = ClientFactory::new(resolver.clone(), parts.transport)
        .with_hooks(parts.provider_hooks)
        .with_options(
            ProviderOptions::default()
                .with_anthropic_sequence_policy(config.anthropic_sequence_policy),
        );

    let chat = ChatService::builder(
        factory,
        Arc::clone(&stores.conversations),
        Arc::clone(&stores.messages),
    )
    .catalog(parts.catalog)
    .hooks(parts.turn_hooks)
    .policy(ChatPolicy::default().with_serialize_turns(config.serialize_turns))
    .build();

    tracing::info!(
        store = ?config.store,
        serialize_turns = config.serialize_turns,
        provider_timeout_secs = config.provider_timeout.as_secs(),
        "parley runtime ready"
    );

    Ok(RuntimeBundle {
        stores,
        chat,
        credentials,
        resolver,
    })
}
