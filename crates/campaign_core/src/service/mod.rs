//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into registry and attribution APIs.
//! - Keep callers decoupled from storage details.

pub mod attribution_service;
pub mod campaign_service;
pub mod propagation;
