use thiserror::Error;

use crate::services::api_client::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("{0}")]
    Validation(String),

    #[error("A submission is already in progress")]
    AlreadySubmitting,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Submission status shared by every form: an in-flight flag and the inline
/// error shown to the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    submitting: bool,
    error: Option<String>,
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Lock the form for a request. Fails while another one is in flight.
    pub fn begin(&mut self) -> Result<(), FormError> {
        if self.submitting {
            return Err(FormError::AlreadySubmitting);
        }
        self.submitting = true;
        self.error = None;
        Ok(())
    }

    pub fn reject(&mut self, message: impl Into<String>) -> FormError {
        let message = message.into();
        self.error = Some(message.clone());
        FormError::Validation(message)
    }

    pub fn fail(&mut self, message: impl Into<String>, error: ApiError) -> FormError {
        self.submitting = false;
        self.error = Some(message.into());
        FormError::Api(error)
    }

    pub fn succeed(&mut self) {
        self.submitting = false;
        self.error = None;
    }
}
