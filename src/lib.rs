//! Attendance reconciliation engine
//!
//! This crate turns an append-only log of biometric punches into an
//! attendance ledger of one record per employee per logical shift date. It
//! normalizes noisy punch streams, pairs check-ins with checkouts across
//! midnight, auto-completes shifts that never received a checkout, classifies
//! punctuality, and writes the result idempotently behind a watermark.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod reconciliation;
