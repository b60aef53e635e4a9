//! # Error Types
//!
//! All errors use `thiserror`. [`ValidationError`] is the only error a user
//! ever sees verbatim: its `Display` text is rendered back into the form
//! that produced it, so messages are written for staff, not operators.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Form or record validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A stored password hash could not be parsed.
    #[error("malformed password hash")]
    MalformedHash,

    /// CSV input could not be read at all.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single user-facing validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or only whitespace.
    #[error("{field} cannot be empty")]
    Required {
        /// Human-readable field name.
        field: &'static str,
    },

    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Human-readable field name.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// A field was shorter than its minimum length.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Human-readable field name.
        field: &'static str,
        /// Minimum length in characters.
        min: usize,
    },

    /// A field had the wrong shape (date format, character set).
    #[error("{field}: {reason}")]
    InvalidFormat {
        /// Human-readable field name.
        field: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The password does not satisfy the password policy.
    #[error("{0}")]
    WeakPassword(&'static str),

    /// New password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Role string is not one of the known roles.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The reader did not spend the minimum time on the document.
    #[error("Please read the SOP for at least {required} seconds before acknowledging (recorded {actual})")]
    ReadTimeTooShort {
        /// Configured minimum, in seconds.
        required: u32,
        /// Time reported by the page, in seconds.
        actual: u32,
    },
}
