//! Registration records and the attendance state machine
//!
//! A registration is one attendee's claim on a seat at one event. It starts
//! `Pending` and moves to `Attended` exactly once; there is no way back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ticket::TICKET_PREFIX;
use crate::{Error, Result};

/// Check that an id can be reached by a check-in
///
/// Check-ins trim their input and `POST /attendance/{id}` decodes its path
/// segment like a scan, so ids must be non-empty, already trimmed, free of
/// `/`, and must not start with the ticket prefix.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidRecord("registration id is empty".to_string()));
    }
    if id.trim() != id {
        return Err(Error::InvalidRecord(format!(
            "registration id '{}' has surrounding whitespace",
            id
        )));
    }
    if id.starts_with(TICKET_PREFIX) {
        return Err(Error::InvalidRecord(format!(
            "registration id '{}' starts with {}",
            id, TICKET_PREFIX
        )));
    }
    if id.contains('/') {
        return Err(Error::InvalidRecord(format!(
            "registration id '{}' contains '/'",
            id
        )));
    }
    Ok(())
}

/// Attendance state of a registration
///
/// The check-in time lives inside the `Attended` variant, so a record can
/// never be attended without a time or carry a time while pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Attendance {
    Pending,
    Attended {
        #[serde(rename = "attendedAt")]
        attended_at: DateTime<Utc>,
    },
}

impl Attendance {
    /// Status label as stored and sent over the wire
    pub fn label(&self) -> &'static str {
        match self {
            Attendance::Pending => "Pending",
            Attendance::Attended { .. } => "Attended",
        }
    }

    /// Rebuild the state from its stored status label and timestamp
    ///
    /// Rejects records where the two disagree.
    pub fn from_parts(status: &str, attended_at: Option<&str>) -> Result<Self> {
        let attended_at = attended_at.filter(|s| !s.is_empty());

        match (status, attended_at) {
            ("Pending", None) => Ok(Attendance::Pending),
            ("Attended", Some(raw)) => {
                let attended_at = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| Error::InvalidRecord(format!("bad attendedAt '{}': {}", raw, e)))?
                    .with_timezone(&Utc);
                Ok(Attendance::Attended { attended_at })
            }
            ("Pending", Some(_)) => Err(Error::InvalidRecord(
                "pending registration carries attendedAt".to_string(),
            )),
            ("Attended", None) => Err(Error::InvalidRecord(
                "attended registration is missing attendedAt".to_string(),
            )),
            (other, _) => Err(Error::InvalidRecord(format!("unknown status '{}'", other))),
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected `mark` on a registration that is already attended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyAttended {
    /// When the original check-in happened
    pub attended_at: DateTime<Utc>,
}

/// One attendee's registration for one event
///
/// Display fields are a snapshot taken at registration time and do not follow
/// later edits to the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Unique, immutable registration id
    pub id: String,

    /// Event this registration belongs to
    pub event_id: String,

    pub attendee_name: String,
    pub department: String,
    pub year: String,
    pub event_title: String,

    #[serde(flatten)]
    pub attendance: Attendance,
}

impl Registration {
    /// Create a new pending registration
    pub fn new(
        id: String,
        event_id: String,
        attendee_name: String,
        department: String,
        year: String,
        event_title: String,
    ) -> Self {
        Self {
            id,
            event_id,
            attendee_name,
            department,
            year,
            event_title,
            attendance: Attendance::Pending,
        }
    }

    pub fn is_attended(&self) -> bool {
        matches!(self.attendance, Attendance::Attended { .. })
    }

    pub fn attended_at(&self) -> Option<DateTime<Utc>> {
        match self.attendance {
            Attendance::Pending => None,
            Attendance::Attended { attended_at } => Some(attended_at),
        }
    }

    /// Apply the `mark` transition
    ///
    /// `Pending` becomes `Attended` stamped with `at`. A registration that is
    /// already attended is left untouched and the original time is returned.
    pub fn mark_attended(&mut self, at: DateTime<Utc>) -> std::result::Result<(), AlreadyAttended> {
        match self.attendance {
            Attendance::Pending => {
                self.attendance = Attendance::Attended { attended_at: at };
                Ok(())
            }
            Attendance::Attended { attended_at } => Err(AlreadyAttended { attended_at }),
        }
    }
}
