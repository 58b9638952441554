#![forbid(unsafe_code)]

//! Save/load payloads exchanged with the persistence collaborator.
//!
//! The engine performs no I/O. On save it hands out a [`SavePayload`]; on
//! load it accepts a [`LoadPayload`] whose widgets are raw records, so
//! older or partially written data still loads (see
//! [`RawWidget::normalize`](tilegrid_layout::RawWidget::normalize)).

use std::fmt;

use serde::{Deserialize, Serialize};
use tilegrid_layout::{MobileLayoutMode, RawWidget, Widget, validate_widgets};

/// What the engine asks the persistence collaborator to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub widgets: Vec<Widget>,
    /// Explicit mobile arrangement; empty while linked.
    pub mobile_widgets: Vec<Widget>,
    pub mobile_layout_mode: MobileLayoutMode,
}

impl SavePayload {
    pub fn to_json(&self) -> Result<String, PayloadError> {
        serde_json::to_string(self).map_err(PayloadError::Json)
    }
}

/// What the persistence collaborator supplies on load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPayload {
    pub widgets: Vec<RawWidget>,
    #[serde(default)]
    pub mobile_widgets: Vec<RawWidget>,
    #[serde(default)]
    pub mobile_layout_mode: MobileLayoutMode,
}

impl LoadPayload {
    /// Decode a payload, accepting anything normalization can repair.
    pub fn from_json(s: &str) -> Result<Self, PayloadError> {
        serde_json::from_str(s).map_err(PayloadError::Json)
    }

    /// Decode a payload and reject it if either array breaks an invariant
    /// (duplicate or empty ids, negative coordinates, non-positive sizes).
    pub fn from_json_strict(s: &str) -> Result<Self, PayloadError> {
        let payload = Self::from_json(s)?;
        let errors = payload.validation_errors();
        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(PayloadError::Validation(errors))
        }
    }

    /// Error-level findings for both arrays, prefixed with the array name.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        [("widgets", &self.widgets), ("mobileWidgets", &self.mobile_widgets)]
            .into_iter()
            .flat_map(|(name, widgets)| {
                validate_widgets(widgets)
                    .issues
                    .into_iter()
                    .filter(|issue| issue.severity() == tilegrid_layout::WidgetIssueSeverity::Error)
                    .map(move |issue| format!("{name}[{}]: {}", issue.index, issue.message))
            })
            .collect()
    }
}

impl From<SavePayload> for LoadPayload {
    fn from(saved: SavePayload) -> Self {
        Self {
            widgets: saved.widgets.iter().map(RawWidget::from).collect(),
            mobile_widgets: saved.mobile_widgets.iter().map(RawWidget::from).collect(),
            mobile_layout_mode: saved.mobile_layout_mode,
        }
    }
}

/// Errors raised while encoding or decoding payloads.
#[derive(Debug)]
pub enum PayloadError {
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "payload JSON error: {e}"),
            Self::Validation(errors) => write!(f, "invalid payload: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
