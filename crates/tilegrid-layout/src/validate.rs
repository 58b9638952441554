//! Non-panicking validation of untrusted widget data.
//!
//! [`validate_widgets`] inspects raw records before normalization and
//! reports every finding with a stable code. Error-level findings break an
//! engine invariant (unique non-empty ids, non-negative coordinates,
//! positive sizes); warning-level findings are gaps that normalization fills
//! silently apart from a log line.
//!
//! Every finding is repairable by [`normalize_widgets`](crate::widget::normalize_widgets):
//! bad records are dropped and bad fields are defaulted.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::widget::{RawRect, RawWidget};

/// Severity of one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetIssueSeverity {
    Error,
    Warning,
}

/// Stable code for validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetIssueCode {
    EmptyId,
    DuplicateId,
    NegativeCoordinate,
    NonPositiveSize,
    MissingLayout,
    IncompleteMobileLayout,
}

impl WidgetIssueCode {
    #[must_use]
    pub const fn severity(self) -> WidgetIssueSeverity {
        match self {
            Self::EmptyId | Self::DuplicateId | Self::NegativeCoordinate | Self::NonPositiveSize => {
                WidgetIssueSeverity::Error
            }
            Self::MissingLayout | Self::IncompleteMobileLayout => WidgetIssueSeverity::Warning,
        }
    }
}

/// One finding against one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetIssue {
    pub code: WidgetIssueCode,
    /// Position of the record in the input.
    pub index: usize,
    pub widget_id: String,
    /// Field path the finding refers to, when it concerns one field.
    pub field: Option<&'static str>,
    pub message: String,
}

impl WidgetIssue {
    #[must_use]
    pub const fn severity(&self) -> WidgetIssueSeverity {
        self.code.severity()
    }
}

/// Structured report over a batch of raw widget records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WidgetReport {
    pub widget_count: usize,
    pub issues: Vec<WidgetIssue>,
}

impl WidgetReport {
    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity() == WidgetIssueSeverity::Error)
    }

    /// Findings with the given code.
    pub fn with_code(&self, code: WidgetIssueCode) -> impl Iterator<Item = &WidgetIssue> {
        self.issues.iter().filter(move |issue| issue.code == code)
    }
}

fn check_rect(
    issues: &mut Vec<WidgetIssue>,
    index: usize,
    id: &str,
    rect: RawRect,
    fields: [&'static str; 4],
) {
    let [fx, fy, fw, fh] = fields;
    for (field, value) in [(fx, rect.x), (fy, rect.y)] {
        if let Some(v) = value
            && v < 0
        {
            issues.push(WidgetIssue {
                code: WidgetIssueCode::NegativeCoordinate,
                index,
                widget_id: id.to_owned(),
                field: Some(field),
                message: format!("{field} is {v}"),
            });
        }
    }
    for (field, value) in [(fw, rect.w), (fh, rect.h)] {
        if let Some(v) = value
            && v <= 0
        {
            issues.push(WidgetIssue {
                code: WidgetIssueCode::NonPositiveSize,
                index,
                widget_id: id.to_owned(),
                field: Some(field),
                message: format!("{field} is {v}"),
            });
        }
    }
}

/// Inspect `widgets` and report every finding. Never panics.
#[must_use]
pub fn validate_widgets(widgets: &[RawWidget]) -> WidgetReport {
    let mut issues = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for (index, raw) in widgets.iter().enumerate() {
        let id = raw.id.as_str();
        if id.is_empty() {
            issues.push(WidgetIssue {
                code: WidgetIssueCode::EmptyId,
                index,
                widget_id: String::new(),
                field: Some("id"),
                message: "widget id is empty".to_owned(),
            });
        } else if !seen.insert(id) {
            issues.push(WidgetIssue {
                code: WidgetIssueCode::DuplicateId,
                index,
                widget_id: id.to_owned(),
                field: Some("id"),
                message: format!("widget id {id:?} appears more than once"),
            });
        }

        let desktop = raw.desktop_fields();
        if desktop.x.is_none() || desktop.y.is_none() || desktop.w.is_none() || desktop.h.is_none() {
            issues.push(WidgetIssue {
                code: WidgetIssueCode::MissingLayout,
                index,
                widget_id: id.to_owned(),
                field: Some("layout"),
                message: "desktop layout is missing fields".to_owned(),
            });
        }
        check_rect(&mut issues, index, id, desktop, [
            "layout.x", "layout.y", "layout.w", "layout.h",
        ]);

        if let Some(mobile) = raw.mobile_layout {
            if mobile.x.is_none() || mobile.y.is_none() {
                issues.push(WidgetIssue {
                    code: WidgetIssueCode::IncompleteMobileLayout,
                    index,
                    widget_id: id.to_owned(),
                    field: Some("mobileLayout"),
                    message: "mobile layout has no position and will be dropped".to_owned(),
                });
            }
            check_rect(&mut issues, index, id, mobile, [
                "mobileLayout.x",
                "mobileLayout.y",
                "mobileLayout.w",
                "mobileLayout.h",
            ]);
        }
    }

    WidgetReport {
        widget_count: widgets.len(),
        issues,
    }
}

/// Whether `widgets` satisfies every engine invariant as-is.
///
/// Warning-level gaps (missing fields that normalization fills) do not
/// make a set invalid.
#[must_use]
pub fn is_valid_widget_set(widgets: &[RawWidget]) -> bool {
    !validate_widgets(widgets).has_errors()
}
