//! Core types, ports and services for the civic complaint portal.
//!
//! This crate has no HTTP or database dependencies.
//! Storage is reached through [`store::PortalStore`]; complaint lifecycle
//! events leave through [`notification::NotificationSink`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chatbot;
pub mod complaint;
pub mod error;
pub mod i18n;
pub mod memory;
pub mod notification;
pub mod service;
pub mod store;
pub mod user;

pub use error::{Error, Result};
