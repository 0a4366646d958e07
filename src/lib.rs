pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod models;
pub mod poller;
pub mod render;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use api::{ChatApi, HttpChatApi};
pub use controller::{ChatController, SendOutcome};
pub use error::{ApiError, SessionError};
pub use models::*;
pub use session::{Screen, TokenStore};
