//! Data and service layer for the music-school booking admin dashboard.
//!
//! Fetches entity lists from the booking backend through a cached,
//! token-refreshing client, normalizes schedule slots, joins foreign keys to
//! labels, and serves the result as JSON.

pub mod api;
pub mod assignment;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod lookup;
pub mod models;
pub mod server;
pub mod slots;
pub mod store;
pub mod types;
pub mod views;
