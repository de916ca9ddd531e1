//! Tracing-based observability hooks for provider calls and chat turns.
//!
//! ```rust
//! use pchat::TurnHooks;
//! use pobserve::TracingObservabilityHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{TurnHooks, TurnOutcome, TurnReport, TurnState};
use pcommon::ConversationId;
use pprovider::{Completion, ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_call_start(&self, provider: ProviderId, model: &str) {
        tracing::info!(
            phase = "provider",
            event = "call_start",
            provider = %provider,
            model
        );
    }

    fn on_success(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        completion: &Completion,
    ) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            model,
            elapsed_ms = elapsed.as_millis() as u64,
            has_text = completion.text.is_some(),
            diagnostics = completion.diagnostics.len()
        );
        for diagnostic in &completion.diagnostics {
            tracing::warn!(
                phase = "provider",
                event = "diagnostic",
                provider = %provider,
                model,
                diagnostic = %diagnostic
            );
        }
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            model,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error_class = ?error.class(),
            retryable = error.retryable,
            error = %error
        );
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, conversation_id: &ConversationId, model_identifier: &str) {
        tracing::info!(
            phase = "turn",
            event = "turn_start",
            conversation_id = %conversation_id,
            model = model_identifier
        );
    }

    fn on_state(&self, conversation_id: &ConversationId, state: TurnState) {
        tracing::debug!(
            phase = "turn",
            event = "state",
            conversation_id = %conversation_id,
            state = state.as_str()
        );
    }

    fn on_turn_finish(
        &self,
        conversation_id: &ConversationId,
        report: &TurnReport,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match &report.outcome {
            TurnOutcome::Failed { failure, .. } => tracing::error!(
                phase = "turn",
                event = "turn_finish",
                conversation_id = %conversation_id,
                state = report.state().as_str(),
                elapsed_ms,
                failure_class = ?failure.class,
                error = %failure.detail
            ),
            _ => tracing::info!(
                phase = "turn",
                event = "turn_finish",
                conversation_id = %conversation_id,
                state = report.state().as_str(),
                elapsed_ms,
                diagnostics = report.diagnostics.len()
            ),
        }
    }
}
