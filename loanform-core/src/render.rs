//! Rendering of submission results into the result container.
//!
//! Every result becomes a single `<div>` whose class is the message style.
//! Interpolated text is HTML-escaped before it is written.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::response::Outcome;

/// Visual class of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    Success,
    Error,
}

impl MessageStyle {
    pub fn css_class(&self) -> &'static str {
        match self {
            MessageStyle::Success => "success",
            MessageStyle::Error => "error",
        }
    }
}

impl fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

/// How a successful prediction picks its style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StylePolicy {
    /// Only the `approved` label is styled as success; any other label,
    /// even on a successful reply, uses the error style.
    #[default]
    PredictionLabel,
    /// Every successful reply is styled as success; the label only changes
    /// the message text.
    Outcome,
}

impl StylePolicy {
    pub fn style_for(&self, outcome: &Outcome) -> MessageStyle {
        match self {
            StylePolicy::PredictionLabel if outcome.is_approved() => MessageStyle::Success,
            StylePolicy::PredictionLabel => MessageStyle::Error,
            StylePolicy::Outcome => MessageStyle::Success,
        }
    }
}

/// A message ready to be written into the result container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub style: MessageStyle,
    pub text: String,
}

impl RenderedMessage {
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"{}\">{}</div>",
            self.style.css_class(),
            escape_html(&self.text)
        )
    }
}

/// Render a successful prediction.
pub fn render_outcome(outcome: &Outcome, policy: StylePolicy) -> RenderedMessage {
    RenderedMessage {
        style: policy.style_for(outcome),
        text: format!("The loan is likely to be {}!", outcome.label()),
    }
}

/// Render any failure. Application, transport and decode failures all
/// share the same shape; only the interpolated message differs.
pub fn render_failure(err: &SubmitError) -> RenderedMessage {
    RenderedMessage {
        style: MessageStyle::Error,
        text: format!("Error: {err}"),
    }
}

pub fn render_result(result: &Result<Outcome, SubmitError>, policy: StylePolicy) -> RenderedMessage {
    match result {
        Ok(outcome) => render_outcome(outcome, policy),
        Err(err) => render_failure(err),
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn predicted(label: &str) -> Outcome {
        Outcome::Predicted {
            label: label.into(),
        }
    }

    #[test]
    fn test_approved_renders_success() {
        let msg = render_outcome(&predicted("approved"), StylePolicy::PredictionLabel);
        assert_eq!(msg.style, MessageStyle::Success);
        assert_eq!(
            msg.to_html(),
            "<div class=\"success\">The loan is likely to be approved!</div>"
        );
    }

    #[test]
    fn test_denied_renders_error_style_under_label_policy() {
        let msg = render_outcome(&predicted("denied"), StylePolicy::PredictionLabel);
        assert_eq!(msg.style, MessageStyle::Error);
        assert!(msg.text.contains("denied"));
    }

    #[test]
    fn test_denied_renders_success_style_under_outcome_policy() {
        let msg = render_outcome(&predicted("denied"), StylePolicy::Outcome);
        assert_eq!(msg.style, MessageStyle::Success);
        assert_eq!(msg.text, "The loan is likely to be denied!");
    }

    #[test]
    fn test_application_failure_block_is_exact() {
        let err = SubmitError::Application {
            message: "Invalid income value".into(),
        };
        assert_eq!(
            render_failure(&err).to_html(),
            "<div class=\"error\">Error: Invalid income value</div>"
        );
    }

    #[test]
    fn test_transport_failure_uses_error_message() {
        let err = SubmitError::Transport {
            message: "connection reset by peer".into(),
        };
        let msg = render_result(&Err(err), StylePolicy::Outcome);
        assert_eq!(msg.style, MessageStyle::Error);
        assert_eq!(msg.text, "Error: connection reset by peer");
    }

    #[test]
    fn test_label_is_escaped() {
        let msg = render_outcome(&predicted("<b>approved</b>"), StylePolicy::PredictionLabel);
        assert_eq!(msg.style, MessageStyle::Error);
        assert_eq!(
            msg.to_html(),
            "<div class=\"error\">The loan is likely to be &lt;b&gt;approved&lt;/b&gt;!</div>"
        );
    }

    #[test]
    fn test_server_key_error_is_escaped() {
        let err = SubmitError::Application {
            message: "'age'".into(),
        };
        assert_eq!(
            render_failure(&err).to_html(),
            "<div class=\"error\">Error: &#39;age&#39;</div>"
        );
    }

    #[test]
    fn test_style_serde_names() {
        assert_eq!(
            serde_json::to_string(&StylePolicy::PredictionLabel).unwrap(),
            "\"prediction_label\""
        );
        let p: StylePolicy = serde_json::from_str("\"outcome\"").unwrap();
        assert_eq!(p, StylePolicy::Outcome);
        assert_eq!(MessageStyle::Success.to_string(), "success");
    }
}
