//! Content-based book recommendations
//!
//! Profiles a user's shelves, adapts attribute weights to their habits,
//! gathers candidates from several independent generators, and interleaves
//! them into one diverse list.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
pub use services::Recommender;
