//! Job board backend
//!
//! Employers post listings that go through staff review, job seekers apply
//! and get interviewed, and every staff action lands in an append-only
//! audit trail. Notifications fan out over mail and an in-app inbox.

#[macro_use]
mod macros;

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod background;
pub mod board;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod ids;
pub mod mailer;
pub mod metrics;
pub mod notify;
pub mod pagination;
pub mod rate_limit;
pub mod server;
pub mod uploads;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::AppContext;
pub use error::{BoardError, BoardResult};
