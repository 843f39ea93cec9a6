//! Back-office session core and development API simulator.
//!
//! The crate splits into three layers:
//!
//! - [`auth`]: durable token storage, the session state machine, and the
//!   single-flight refresh coordination.
//! - [`client`]: the request-authorization pipeline around an HTTP client,
//!   plus the user-directory and dashboard screen state.
//! - [`api`]: the development backend simulating the production REST API,
//!   including token issuance, expiry, and full user CRUD.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
