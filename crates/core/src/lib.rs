//! Coastline Core - Shared types library.
//!
//! This crate provides common types used across all Coastline components:
//! - `storefront` - Customer-facing storefront server
//! - `apps` - Platform-integration app service (manifest, webhooks, notifiers)
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, statuses,
//!   and the session token pair

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
