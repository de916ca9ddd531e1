use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pchat::{TurnHooks, TurnReport, TurnState};
use pcommon::ConversationId;
use pprovider::{Completion, ProviderError, ProviderId, ProviderOperationHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_call_start(&self, provider: ProviderId, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_call_start(provider, model)
        }));
    }

    fn on_success(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        completion: &Completion,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, model, elapsed, completion)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, model, elapsed, error)
        }));
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_turn_start(&self, conversation_id: &ConversationId, model_identifier: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(conversation_id, model_identifier)
        }));
    }

    fn on_state(&self, conversation_id: &ConversationId, state: TurnState) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_state(conversation_id, state)
        }));
    }

    fn on_turn_finish(
        &self,
        conversation_id: &ConversationId,
        report: &TurnReport,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_finish(conversation_id, report, elapsed)
        }));
    }
}

/// Forwards every event to `first`, then to `second`.
pub struct CompositeHooks<A, B> {
    first: A,
    second: B,
}

impl<A, B> CompositeHooks<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> ProviderOperationHooks for CompositeHooks<A, B>
where
    A: ProviderOperationHooks,
    B: ProviderOperationHooks,
{
    fn on_call_start(&self, provider: ProviderId, model: &str) {
        self.first.on_call_start(provider, model);
        self.second.on_call_start(provider, model);
    }

    fn on_success(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        completion: &Completion,
    ) {
        self.first.on_success(provider, model, elapsed, completion);
        self.second.on_success(provider, model, elapsed, completion);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        self.first.on_failure(provider, model, elapsed, error);
        self.second.on_failure(provider, model, elapsed, error);
    }
}

impl<A, B> TurnHooks for CompositeHooks<A, B>
where
    A: TurnHooks,
    B: TurnHooks,
{
    fn on_turn_start(&self, conversation_id: &ConversationId, model_identifier: &str) {
        self.first.on_turn_start(conversation_id, model_identifier);
        self.second.on_turn_start(conversation_id, model_identifier);
    }

    fn on_state(&self, conversation_id: &ConversationId, state: TurnState) {
        self.first.on_state(conversation_id, state);
        self.second.on_state(conversation_id, state);
    }

    fn on_turn_finish(
        &self,
        conversation_id: &ConversationId,
        report: &TurnReport,
        elapsed: Duration,
    ) {
        self.first.on_turn_finish(conversation_id, report, elapsed);
        self.second.on_turn_finish(conversation_id, report, elapsed);
    }
}
