//! # soptrack-core: Domain Types for SOP Acknowledgment Tracking
//!
//! Pure domain logic shared by the web application and the operator CLI.
//! Nothing in this crate touches the database, the network, or the clock
//! implicitly: "today" and all row data are passed in by the caller.
//!
//! ## Modules
//!
//! - [`role`]: account roles and their privilege ordering.
//! - [`validation`]: form inputs and their validated counterparts.
//! - [`password`]: password policy, PBKDF2 hashing, constant-time verify.
//! - [`temporal`]: the compliance date window (re-acknowledgment cutoff).
//! - [`compliance`]: compliance rates and the dashboard report.
//! - [`roster`]: staff roster CSV parsing.
//! - [`document`]: SOP document title/category/header normalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `soptrack-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests. The only `expect` guards hardcoded regex
//!   patterns in [`document`].

pub mod compliance;
pub mod document;
pub mod error;
pub mod password;
pub mod role;
pub mod roster;
pub mod temporal;
pub mod validation;

pub use compliance::{ComplianceRate, ComplianceReport, SopRef, StaffRef};
pub use error::{CoreError, ValidationError};
pub use role::Role;
pub use temporal::{reack_cutoff, ComplianceWindow};
pub use validation::normalize_name;
