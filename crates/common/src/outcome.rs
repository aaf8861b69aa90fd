//! Check-in outcomes
//!
//! Both expected refusals are values, not errors: callers must handle them
//! and can still show the attendee card on an `AlreadyAttended` denial.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::Registration;

/// Why a check-in was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// No registration matches the token
    UnknownRegistration,
    /// The registration was checked in earlier
    AlreadyAttended,
}

impl DenialReason {
    /// Message shown to door staff
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::UnknownRegistration => "No registration matches this ticket",
            DenialReason::AlreadyAttended => "This ticket has already been checked in",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one check-in attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInResult {
    /// The registration moved to `Attended` during this call
    Approved { registration: Registration },
    /// Nothing was written
    Denied {
        reason: DenialReason,
        registration: Option<Registration>,
    },
}

impl CheckInResult {
    pub fn unknown() -> Self {
        CheckInResult::Denied {
            reason: DenialReason::UnknownRegistration,
            registration: None,
        }
    }

    pub fn already_attended(registration: Registration) -> Self {
        CheckInResult::Denied {
            reason: DenialReason::AlreadyAttended,
            registration: Some(registration),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, CheckInResult::Approved { .. })
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            CheckInResult::Approved { .. } => None,
            CheckInResult::Denied { reason, .. } => Some(*reason),
        }
    }

    pub fn registration(&self) -> Option<&Registration> {
        match self {
            CheckInResult::Approved { registration } => Some(registration),
            CheckInResult::Denied { registration, .. } => registration.as_ref(),
        }
    }
}

/// Wire shape: `{ approved, reason?, message?, registration? }`
#[derive(Serialize)]
struct WireResult<'a> {
    approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<DenialReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registration: Option<&'a Registration>,
}

impl Serialize for CheckInResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let reason = self.reason();
        WireResult {
            approved: self.is_approved(),
            reason,
            message: reason.map(|r| r.message()),
            registration: self.registration(),
        }
        .serialize(serializer)
    }
}
