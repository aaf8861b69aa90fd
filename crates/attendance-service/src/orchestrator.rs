//! Check-in orchestration
//!
//! Decodes a token, looks the registration up and applies the attendance
//! transition. Scanned and typed ids share one path so both produce the same
//! `CheckInResult`.

use checkin_common::{ticket, CheckInResult, Registration, Result};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::{RegistrationStore, Transition};

/// How the id reached the door
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInSource {
    Scan,
    Manual,
}

impl fmt::Display for CheckInSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckInSource::Scan => f.write_str("scan"),
            CheckInSource::Manual => f.write_str("manual"),
        }
    }
}

/// Coordinates check-in attempts against a registration store
///
/// Storage failures are returned as `Err` and never retried here: a retry is
/// only safe once the caller has re-checked the registration.
#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn RegistrationStore>,
}

impl CheckInService {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn RegistrationStore {
        self.store.as_ref()
    }

    /// Check in from a scanned token (`REG_TICKET:<id>` or a bare id)
    pub async fn check_in(&self, raw_token: &str) -> Result<CheckInResult> {
        let registration_id = ticket::decode(raw_token.trim()).trim();
        self.process(registration_id, CheckInSource::Scan).await
    }

    /// Check in from an id typed by staff; no ticket decoding
    pub async fn check_in_manual(&self, typed_id: &str) -> Result<CheckInResult> {
        self.process(typed_id.trim(), CheckInSource::Manual).await
    }

    /// Look up a registration without changing it
    pub async fn lookup(&self, registration_id: &str) -> Result<Option<Registration>> {
        let registration_id = registration_id.trim();
        if registration_id.is_empty() {
            return Ok(None);
        }
        self.store.find(registration_id).await
    }

    async fn process(&self, registration_id: &str, source: CheckInSource) -> Result<CheckInResult> {
        let Some(registration) = self.lookup(registration_id).await? else {
            warn!("Check-in denied ({}): unknown registration '{}'", source, registration_id);
            return Ok(CheckInResult::unknown());
        };

        if registration.is_attended() {
            warn!(
                "Check-in denied ({}): registration {} already attended",
                source, registration.id
            );
            return Ok(CheckInResult::already_attended(registration));
        }

        // The read above is only a fast path; the store decides atomically.
        let result = match self.store.mark_attended(&registration.id, Utc::now()).await? {
            Transition::Marked(registration) => {
                info!(
                    "Check-in approved ({}): registration {} for event {}",
                    source, registration.id, registration.event_id
                );
                CheckInResult::Approved { registration }
            }
            Transition::AlreadyAttended(registration) => {
                warn!(
                    "Check-in denied ({}): registration {} attended concurrently",
                    source, registration.id
                );
                CheckInResult::already_attended(registration)
            }
            Transition::NotFound => {
                warn!(
                    "Check-in denied ({}): registration {} disappeared before marking",
                    source, registration.id
                );
                CheckInResult::unknown()
            }
        };

        Ok(result)
    }
}
