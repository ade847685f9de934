//! HTTP API for the planner.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/token` - Email/password login, returns a token pair
//! - `POST /api/auth/token/refresh` - Trade a refresh token for an access token
//! - `POST /api/auth/users` - Register a user
//! - `GET|PUT|PATCH /api/auth/users/me` - Own profile
//! - `/api/course` - Course CRUD
//! - `/api/activity` - Activity CRUD, plus nested `/{id}/subtasks`
//! - `/api/subtask` - Subtask CRUD, plus `GET /api/subtask/today`
//! - `/api/reprogramming_log` - Subtask date-change log
//!
//! Everything except health, login, refresh, and register requires a
//! bearer access token. In dev mode, requests without a valid token
//! act as the guest user instead of being rejected.

mod activities;
mod auth;
mod courses;
mod error;
mod reprogramming;
mod routes;
mod subtasks;
mod today;
pub mod types;
mod users;

pub use routes::serve;
pub use types::*;
