//! Session core: token persistence, authentication backend contract, and the
//! session manager with single-flight refresh.

pub mod backend;
pub mod error;
pub mod session;
pub mod state;
pub mod store;
pub mod tokens;

pub use backend::{AuthBackend, HttpAuthBackend, LoginResponse, RefreshResponse, UserProfile};
pub use error::AuthError;
pub use session::SessionManager;
pub use state::SessionState;
pub use store::TokenStore;
pub use tokens::AuthTokens;
