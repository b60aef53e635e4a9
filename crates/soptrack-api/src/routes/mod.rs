//! # Route Modules
//!
//! Each module defines an Axum Router for one area of the application.
//! Routers are assembled in [`crate::app`].

pub mod admin;
pub mod api;
pub mod audit;
pub mod compliance;
pub mod exports;
pub mod session;
pub mod sops;
pub mod staff;
pub mod users;
