/// Design Commons - community server for design-education teachers
///
/// A shared pin board, a project showcase, discussion forums, a member
/// directory and invitation-based registration, stored as one JSON document
/// per resource type. The `client` module is a typed client for the REST
/// API, including the pin board's polling and debounced-write logic.

pub mod account;
pub mod api;
pub mod auth;
pub mod backup;
pub mod board;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod forum;
pub mod invites;
pub mod jobs;
pub mod likes;
pub mod mailer;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod showcase;
pub mod store;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{ApiError, ApiResult};
