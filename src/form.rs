//! In-progress submission inputs.

use crate::error::{SubmitField, ValidationError};

/// The two text inputs of the send form.
///
/// Inputs are kept as typed; trimming happens when the store validates a
/// submission. After a successful send both fields are cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DraftForm {
    pub table_no: String,
    pub message: String,
}

impl DraftForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table_no(&mut self, value: impl Into<String>) {
        self.table_no = value.into();
    }

    pub fn set_message(&mut self, value: impl Into<String>) {
        self.message = value.into();
    }

    /// First field that would fail validation, in form order.
    pub fn missing(&self) -> Option<SubmitField> {
        if self.table_no.trim().is_empty() {
            Some(SubmitField::TableNo)
        } else if self.message.trim().is_empty() {
            Some(SubmitField::Message)
        } else {
            None
        }
    }

    /// Whether the send button should be enabled.
    pub fn is_ready(&self) -> bool {
        self.missing().is_none()
    }

    pub fn check(&self) -> std::result::Result<(), ValidationError> {
        match self.missing() {
            Some(field) => Err(ValidationError::Empty(field)),
            None => Ok(()),
        }
    }

    pub fn clear(&mut self) {
        self.table_no.clear();
        self.message.clear();
    }
}
