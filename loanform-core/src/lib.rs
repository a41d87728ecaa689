//! # Loanform Core
//!
//! Core library for the loan prediction form.
//! Provides the submission handler, the form payload and page seams, the
//! `/predict` transport, reply decoding and rendering, and configuration.

pub mod application;
pub mod config;
pub mod error;
pub mod handler;
pub mod page;
pub mod payload;
pub mod render;
pub mod response;
pub mod transport;

// Re-export commonly used types at the crate root.
pub use application::LoanApplication;
pub use config::{LoanformConfig, config_exists, load_config};
pub use error::{ConfigError, LoanformError, Result, SubmitError};
pub use handler::{ConcurrencyPolicy, SubmissionHandler, SubmissionReport};
pub use page::{
    FormSource, InMemoryContainer, InMemoryForm, PageEvent, ResultContainer, SubmitEvent,
};
pub use payload::{FieldValue, FormPayload};
pub use render::{MessageStyle, RenderedMessage, StylePolicy};
pub use response::{Outcome, PredictionResponse};
pub use transport::{HttpTransport, MockReply, MockTransport, PredictionTransport};
