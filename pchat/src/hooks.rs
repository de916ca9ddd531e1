//! Callbacks around chat turn phases.

use std::time::Duration;

use pcommon::ConversationId;

use crate::{TurnReport, TurnState};

pub trait TurnHooks: Send + Sync {
    fn on_turn_start(&self, _conversation_id: &ConversationId, _model_identifier: &str) {}

    fn on_state(&self, _conversation_id: &ConversationId, _state: TurnState) {}

    fn on_turn_finish(
        &self,
        _conversation_id: &ConversationId,
        _report: &TurnReport,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
