//! Observability hooks for provider calls and chat turns.
//!
//! ```rust
//! use pobserve::{
//!     CompositeHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks,
//!     TracingObservabilityHooks,
//! };
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _turn_hooks = SafeTurnHooks::new(CompositeHooks::new(
//!     TracingObservabilityHooks,
//!     MetricsObservabilityHooks,
//! ));
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{CompositeHooks, SafeProviderHooks, SafeTurnHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        CompositeHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks,
        TracingObservabilityHooks,
    };
}
