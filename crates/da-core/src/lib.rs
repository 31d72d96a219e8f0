//! # da-core
//!
//! Core utilities, configuration, and error handling for dirauth.
//!
//! This crate provides the types shared by the authenticator and the
//! directory adapters: settings loading, audit events and tracing setup.
//!
//! ## Example
//!
//! ```ignore
//! use da_core::Settings;
//!
//! let settings = Settings::load("dirauth.toml")?;
//! da_core::telemetry::init_tracing("info");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod telemetry;

pub use config::{LoginSettings, Settings};
pub use error::{Error, Result};
pub use event::{Event, EventBuilder, EventOutcome, EventSink, EventType};
