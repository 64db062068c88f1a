//! Toast notifications for reporting success and error messages to the client.
//!
//! Every failed user action is reported with an [Alert] so the client can show
//! a dismissable notification and the user may retry manually.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The action succeeded.
    Success,
    /// The action failed.
    Error,
}

/// A message for the client to display as a toast notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Whether the alert reports a success or a failure.
    pub kind: AlertKind,
    /// A short headline.
    pub message: String,
    /// An explanation of what happened and how to fix it, may be empty.
    pub details: String,
}

impl Alert {
    /// Create a new success alert
    pub fn success(message: &str, details: &str) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Create a new error alert
    pub fn error(message: &str, details: &str) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
