//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - A streaming JSON decoder that walks a response once, front to back
//! - Readers for single-day (current conditions) and five-day responses
//! - Background fetches that deliver results through a completion queue
//! - Configuration, including the field-name table and API key
//!
//! It is used by `forecast-cli`, but can also be embedded in other
//! binaries or services.

pub mod config;
pub mod decoder;
pub mod error;
pub mod fields;
pub mod icon;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod request;
pub mod source;
pub mod task;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use decoder::{DecodeBuffer, StreamingDecoder};
pub use error::ForecastError;
pub use fields::{FieldKey, FieldNameTable};
pub use icon::{HttpIconLoader, IconLoader};
pub use model::{CurrentForecast, DailyForecast, FiveDayForecast, ForecastMode, Icon};
pub use pipeline::{Completion, FetchId, ForecastPipeline};
pub use source::{ForecastSource, HttpSource};
pub use task::{CompletionQueue, ForecastListener, ForecastTask};
