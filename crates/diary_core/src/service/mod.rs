//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate session, hasher and repository calls into use-case APIs.
//! - Keep presentation layers decoupled from storage details.

pub mod account_service;
pub mod credential_migration;
pub mod entry_service;
