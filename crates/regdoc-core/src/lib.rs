//! Core types, lifecycle rules and trait definitions for the regdoc document
//! register.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Components receive their storage backend explicitly as an `Arc<S>` where
//! `S: DocumentStore`; nothing here holds process-wide state.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classification;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod natural;
pub mod projection;
pub mod reference;
pub mod store;

pub use error::{Error, Result};
