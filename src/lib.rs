// Portfolio CMS - public content tree, contact intake, registration with
// role-based filtering, and the staff administration panel.

pub mod app_state;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod services;

// Re-exports for convenience
pub use error::{AppError, AppResult};
