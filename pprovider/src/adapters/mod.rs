//! Wire formats for each supported provider.
//!
//! Each adapter exposes the same three steps: `format_messages` shapes history into the
//! provider body, `build_request` attaches endpoint, auth, and model, and `parse_response`
//! reads the reply envelope.

pub mod anthropic;
pub mod google;
pub mod openai;
