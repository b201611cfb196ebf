//! Receiptbooth - photobooth kiosk backend
//!
//! Session media upload and listing, QRIS payments and receipt printing.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
