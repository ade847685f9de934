//! # Planeo
//!
//! Backend for a personal study planner. Each user keeps courses,
//! activities, and subtasks; dated subtasks feed a "today" view that
//! groups them into overdue, due-today, and upcoming buckets.
//!
//! ## Modules
//! - `api`: axum routes, JWT auth middleware, request validation
//! - `store`: SQLite persistence, one table per resource
//! - `today`: classification and ordering behind the today view
//! - `hours`: two-decimal hour amounts as fixed-point integers
//! - `model`: domain types shared by the store and the API
//! - `password`: PBKDF2 password hashing
//! - `config`: environment-driven configuration

pub mod api;
pub mod config;
pub mod hours;
pub mod model;
pub mod password;
pub mod store;
pub mod today;

pub use config::Config;
