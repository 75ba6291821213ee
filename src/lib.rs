#![feature(int_roundings)]
//! Marketplace API for booking outdoor-advertising ("hoarding") spaces.
//!
//! Vendors list ad spaces, buyers search and book them for date ranges, and
//! an admin moderates listings and verifies display proofs.
mod auth;
mod config;
mod db;
mod endpoints;
pub mod error;
mod lifecycle;
mod metrics;
mod models;
mod pricing;
mod serve;
mod storage;

pub use db::Db;
pub use error::Error;
pub use serve::{run, AppState, Result};

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
adspace - a marketplace API for outdoor advertising space

  vendors list hoardings, buyers book them, admins moderate.

Routes live under /auth, /hoardings, /bookings and /reviews.
Proof images are served from /blobs.
    "
}
