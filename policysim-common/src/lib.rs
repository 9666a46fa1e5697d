//! # policysim Common Library
//!
//! Shared code for the policysim backend including:
//! - Subscription tiers and the static prompt/model table
//! - Domain models (users, exchanges, sessions)
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod error;
pub mod models;
pub mod tier;
pub mod time;

pub use error::{Error, Result};
pub use tier::{Tier, TierProfile};
