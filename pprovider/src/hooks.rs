//! Callbacks around each outbound provider call.

use std::time::Duration;

use crate::{Completion, ProviderError, ProviderId};

pub trait ProviderOperationHooks: Send + Sync {
    fn on_call_start(&self, _provider: ProviderId, _model: &str) {}

    fn on_success(
        &self,
        _provider: ProviderId,
        _model: &str,
        _elapsed: Duration,
        _completion: &Completion,
    ) {
    }

    fn on_failure(
        &self,
        _provider: ProviderId,
        _model: &str,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
