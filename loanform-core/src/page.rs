//! Page seams for the submission handler.
//!
//! The handler never looks elements up by itself: the form it reads and the
//! container it writes to are handed to it as `FormSource` and
//! `ResultContainer` implementations. In-memory versions back the CLI and
//! the tests.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::LoanApplication;
use crate::payload::{FieldValue, FormPayload};

/// Default id of the prediction form.
pub const DEFAULT_FORM_ID: &str = "predictionForm";
/// Default id of the result container.
pub const DEFAULT_RESULT_ID: &str = "result";

/// A form whose current input state can be read at submit time.
pub trait FormSource: Send + Sync {
    fn id(&self) -> &str;

    /// Capture the current field values.
    fn snapshot(&self) -> FormPayload;

    /// Apply user input to one field.
    fn input(&self, name: &str, value: FieldValue);
}

/// The element whose content shows the outcome of a submission.
pub trait ResultContainer: Send + Sync {
    fn id(&self) -> &str;

    /// Replace the whole inner content. Never appends.
    fn replace_inner_html(&self, html: &str);
}

/// One submit event raised on the form.
#[derive(Debug, Clone)]
pub struct SubmitEvent {
    pub id: Uuid,
    pub raised_at: DateTime<Utc>,
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            raised_at: Utc::now(),
            default_prevented: false,
        }
    }

    /// Suppress the browser's default navigation for this event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl Default for SubmitEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Events delivered to a listening handler, in the order the user raised them.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// A field was edited.
    Input { name: String, value: FieldValue },
    /// The form was submitted.
    Submit(SubmitEvent),
}

impl PageEvent {
    pub fn input(name: impl Into<String>, value: impl Into<String>) -> Self {
        PageEvent::Input {
            name: name.into(),
            value: FieldValue::text(value),
        }
    }

    pub fn submit() -> Self {
        PageEvent::Submit(SubmitEvent::new())
    }
}

/// An in-memory form. Field edits replace the first value stored under the
/// same name, the way re-typing into an input does.
#[derive(Debug)]
pub struct InMemoryForm {
    id: String,
    fields: Mutex<FormPayload>,
}

impl InMemoryForm {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Mutex::new(FormPayload::new()),
        }
    }

    /// Build a form with the given fields already filled in.
    pub fn with_payload(id: impl Into<String>, payload: FormPayload) -> Self {
        Self {
            id: id.into(),
            fields: Mutex::new(payload),
        }
    }

    /// A prediction form filled from a loan application.
    pub fn from_application(id: impl Into<String>, application: &LoanApplication) -> Self {
        Self::with_payload(id, application.to_payload())
    }

    pub fn set_text(&self, name: &str, value: impl Into<String>) {
        self.set(name, FieldValue::text(value));
    }

    pub fn set(&self, name: &str, value: FieldValue) {
        let mut fields = self.fields.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = FormPayload::new();
        let mut replaced = false;
        for (n, v) in fields.iter() {
            if !replaced && n == name {
                updated.push(n, value.clone());
                replaced = true;
            } else {
                updated.push(n, v.clone());
            }
        }
        if !replaced {
            updated.push(name, value);
        }
        *fields = updated;
    }

    /// Reset every field.
    pub fn clear(&self) {
        *self.fields.lock().unwrap_or_else(PoisonError::into_inner) = FormPayload::new();
    }
}

impl FormSource for InMemoryForm {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> FormPayload {
        self.fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn input(&self, name: &str, value: FieldValue) {
        self.set(name, value);
    }
}

/// An in-memory result container that also remembers every write.
#[derive(Debug)]
pub struct InMemoryContainer {
    id: String,
    content: Mutex<String>,
    writes: Mutex<Vec<String>>,
}

impl InMemoryContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Mutex::new(String::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Current inner content.
    pub fn inner_html(&self) -> String {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every value ever written, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ResultContainer for InMemoryContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn replace_inner_html(&self, html: &str) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = html.to_string();
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(html.to_string());
    }
}
