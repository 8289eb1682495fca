//! Weld API - HTTP surface over the provisioning and space services
//!
//! Handlers stay thin: authorization checks live in the services and the
//! login middleware owns the reconciliation flow. This crate maps domain
//! results onto response envelopes and status codes.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::create_router_with_state;
pub use state::AppState;
