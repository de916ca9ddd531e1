//! Metrics-based observability hooks for provider calls and chat turns.
//!
//! ```rust
//! use pobserve::MetricsObservabilityHooks;
//! use pprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{TurnHooks, TurnOutcome, TurnReport};
use pcommon::ConversationId;
use pprovider::{Completion, ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_call_start(&self, provider: ProviderId, model: &str) {
        metrics::counter!(
            "parley_provider_call_start_total",
            "provider" => provider.to_string(),
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_success(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        completion: &Completion,
    ) {
        metrics::counter!(
            "parley_provider_success_total",
            "provider" => provider.to_string(),
            "model" => model.to_string(),
            "has_text" => completion.text.is_some().to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
        if !completion.diagnostics.is_empty() {
            metrics::counter!(
                "parley_provider_diagnostics_total",
                "provider" => provider.to_string()
            )
            .increment(completion.diagnostics.len() as u64);
        }
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "parley_provider_failure_total",
            "provider" => provider.to_string(),
            "model" => model.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "parley_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, _conversation_id: &ConversationId, model_identifier: &str) {
        metrics::counter!(
            "parley_turn_start_total",
            "model" => model_identifier.to_string()
        )
        .increment(1);
    }

    fn on_turn_finish(
        &self,
        _conversation_id: &ConversationId,
        report: &TurnReport,
        elapsed: Duration,
    ) {
        let state = report.state().as_str();
        match &report.outcome {
            TurnOutcome::Failed { failure, .. } => metrics::counter!(
                "parley_turn_finish_total",
                "state" => state,
                "failure_class" => format!("{:?}", failure.class)
            )
            .increment(1),
            _ => metrics::counter!("parley_turn_finish_total", "state" => state).increment(1),
        }
        metrics::histogram!("parley_turn_duration_seconds", "state" => state)
            .record(elapsed.as_secs_f64());
    }
}
