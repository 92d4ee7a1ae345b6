//! Form Designer Service
//!
//! Administrators define forms as ordered lists of typed fields. Each form
//! can be embedded in pages, where it is rendered, validated, stored as a
//! submission and optionally mailed to a recipient.
//!
//! # Modules
//!
//! - `models`: forms, fields, the field type registry, submissions and contents
//! - `forms`: runtime validators synthesized from a stored form
//! - `services`: CSV store, mail delivery, submission processing, content binding
//! - `handlers` / `routes`: the axum admin API and public form pages
//!
//! # Configuration
//!
//! Settings are read once at startup from the environment (and `.env`) into
//! [`AppConfig`]. See `config` for the recognized variables.

pub mod config;
pub mod csrf;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;


// Re-export the main types for ease of use
pub use config::{AppConfig, FormDesignerSettings};
pub use error::{ApiError, ConfigError, FormError, MailError, StoreError};
pub use handlers::AppState;
pub use routes::create_router;
