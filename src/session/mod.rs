//! Per-conversation trade lifecycle: state machine and session storage.

mod lifecycle;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub use lifecycle::{
    FlowIntent, LifecycleSession, RenderHint, Reply, Stage, TradeFlow, HELP_TEXT,
};

/// Sessions keyed by conversation identity.
///
/// Each conversation owns exactly one [`LifecycleSession`]; sessions never
/// share state, so concurrent conversations cannot observe or block each
/// other.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, LifecycleSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or replace) the session for a conversation.
    pub fn open(&mut self, conversation_id: &str, intent: FlowIntent) -> &mut LifecycleSession {
        let session = LifecycleSession::new(intent);
        match self.sessions.entry(conversation_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(session);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(session),
        }
    }

    pub fn get_mut(&mut self, conversation_id: &str) -> Option<&mut LifecycleSession> {
        self.sessions.get_mut(conversation_id)
    }

    /// Drop a conversation's session entirely.
    pub fn end(&mut self, conversation_id: &str) {
        self.sessions.remove(conversation_id);
    }

    /// Remove sessions that already reached their terminal stage.
    pub fn sweep_terminated(&mut self) {
        self.sessions.retain(|_, s| s.stage != Stage::Terminated);
    }
}
