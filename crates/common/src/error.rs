use thiserror::Error;

/// Infrastructure failures.
///
/// Unknown registrations and repeated check-ins are not errors; they are
/// reported through [`crate::CheckInResult`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Invalid registration record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, Error>;
