//! HTTP API handlers for policysim-api

pub mod auth;
pub mod health;
pub mod history;
pub mod session;
pub mod simulate;
pub mod tier;

pub use auth::{auth_middleware, bearer_token};
pub use health::health_routes;
pub use history::list_history;
pub use session::session_routes;
pub use simulate::simulate;
pub use tier::{change_tier, get_tier};
