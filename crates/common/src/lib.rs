//! Shared domain types for event check-in
//!
//! - `ticket`: QR token encoding and decoding
//! - `registration`: registration records and the attendance state machine
//! - `outcome`: the closed set of check-in results

pub mod error;
pub mod outcome;
pub mod registration;
pub mod ticket;

pub use error::{Error, Result};
pub use outcome::{CheckInResult, DenialReason};
pub use registration::{validate_id, AlreadyAttended, Attendance, Registration};
