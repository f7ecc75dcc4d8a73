//! Secret-free audit trail of vault mutations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened. Variants never carry credentials, mnemonics, or blob
/// contents; addresses and chain names are the only payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VaultAction {
    VaultGenerated,
    VaultRecovered { scanned: u32 },
    VaultUnlocked,
    AccountAdded { address: String },
    AccountDeleted { address: String },
    AccountRelabeled { address: String },
    KeyringRestored,
    NetworkChanged { chain: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub action: VaultAction,
}

impl VaultEvent {
    pub fn now(action: VaultAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
        }
    }
}

/// Events kept per session before the oldest fall off.
pub const EVENT_LOG_CAPACITY: usize = 256;

/// Fixed-capacity event log so a long-lived session never accumulates
/// unboundedly. Recording past capacity evicts the oldest entry.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: VecDeque<VaultEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: VaultAction) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(VaultEvent::now(action));
    }

    /// Retained events, oldest first.
    pub fn snapshot(&self) -> Vec<VaultEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
