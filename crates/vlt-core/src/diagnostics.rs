//! Issue collection for verification and import reporting.
//!
//! The verifier and the importers do not abort on the first problem they
//! find; they collect every issue with a severity and an optional entity
//! reference ("vehicle 17", "truck GER01->ITA01 #3 @ 2025-01-04") so the
//! caller can log or serialize the whole report at once.

use serde::Serialize;

/// Severity level for diagnostic issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the operation continued (e.g. a vehicle that never departed)
    Warning,
    /// An invariant is broken (e.g. a truck loaded beyond capacity)
    Error,
}

/// A single issue found during verification or import.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    /// Category for grouping (e.g. "path", "capacity", "delay", "parse")
    pub category: String,
    pub message: String,
    /// Entity the issue refers to, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({entity})")?;
        }
        Ok(())
    }
}

/// Collection of issues for one operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.into(),
            entity: None,
        });
    }

    pub fn add_error(&mut self, category: &str, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.into(),
            entity: None,
        });
    }

    pub fn add_error_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.issues.push(Issue {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    pub fn add_warning_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }
}
