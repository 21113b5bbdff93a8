//! Best-effort duplicate-submission suppressor.
//!
//! Protects a single process against rapid repeated clicks and re-entrant
//! calls from the same user: an in-flight flag plus a short cooldown after a
//! successful creation. This is advisory only; the store-enforced
//! idempotency key is what actually prevents duplicate orders across
//! processes, tabs, and network retries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// A creation for this user is already running.
    InFlight,
    /// A creation for this user succeeded within the cooldown window.
    Cooldown,
}

impl GuardRejection {
    pub fn message(&self) -> &'static str {
        match self {
            GuardRejection::InFlight => "an order submission is already in progress",
            GuardRejection::Cooldown => "an order was just submitted, please wait a moment",
        }
    }
}

#[derive(Debug, Default)]
struct GuardEntry {
    in_flight: bool,
    last_success: Option<Instant>,
}

#[derive(Debug)]
pub struct SubmissionGuard {
    cooldown: Duration,
    entries: Mutex<HashMap<Uuid, GuardEntry>>,
}

impl SubmissionGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Claims the in-flight slot for `user`. The caller must pair every
    /// successful `begin` with exactly one `complete`.
    pub fn begin(&self, user: Uuid) -> Result<(), GuardRejection> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(user).or_default();

        if entry.in_flight {
            return Err(GuardRejection::InFlight);
        }
        if let Some(at) = entry.last_success {
            if at.elapsed() < self.cooldown {
                return Err(GuardRejection::Cooldown);
            }
        }

        entry.in_flight = true;
        Ok(())
    }

    pub fn complete(&self, user: Uuid, success: bool) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(user).or_default();
        entry.in_flight = false;
        if success {
            entry.last_success = Some(Instant::now());
        }
    }
}
