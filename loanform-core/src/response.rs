//! Decoding and classification of `/predict` replies.

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// The only prediction label treated as a favourable outcome.
pub const APPROVED_LABEL: &str = "approved";

/// Text substituted for a field the server left out. Mirrors what string
/// interpolation of an absent JSON field produces in the page.
pub const MISSING_FIELD_TEXT: &str = "undefined";

/// Raw reply body from the prediction endpoint.
///
/// Only presence is checked. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn predicted(label: impl Into<String>) -> Self {
        Self {
            success: true,
            prediction: Some(label.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            prediction: None,
            error: Some(message.into()),
        }
    }

    /// Decode a reply body. Anything that is not a JSON object with a boolean
    /// `success` field is a decode failure.
    pub fn from_slice(body: &[u8]) -> Result<Self, SubmitError> {
        serde_json::from_slice(body).map_err(|e| SubmitError::Decode {
            message: e.to_string(),
        })
    }

    /// Consume the reply and turn it into an outcome.
    ///
    /// `success: false` becomes `SubmitError::Application` carrying the
    /// server's `error` text.
    pub fn into_outcome(self) -> Result<Outcome, SubmitError> {
        if self.success {
            Ok(Outcome::Predicted {
                label: self
                    .prediction
                    .unwrap_or_else(|| MISSING_FIELD_TEXT.to_string()),
            })
        } else {
            Err(SubmitError::Application {
                message: self.error.unwrap_or_else(|| MISSING_FIELD_TEXT.to_string()),
            })
        }
    }
}

/// A successful prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Predicted { label: String },
}

impl Outcome {
    pub fn label(&self) -> &str {
        match self {
            Outcome::Predicted { label } => label,
        }
    }

    pub fn is_approved(&self) -> bool {
        is_approved(self.label())
    }
}

/// Exact, case-sensitive comparison with the approved label.
pub fn is_approved(label: &str) -> bool {
    label == APPROVED_LABEL
}
