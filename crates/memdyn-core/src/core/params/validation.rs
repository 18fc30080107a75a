use std::fmt;
use thiserror::Error;

/// One violated parameter constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every constraint that failed in a single validation pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} invalid parameter(s): {}", .violations.len(), join(.violations))]
pub struct ConfigurationError {
    pub violations: Vec<Violation>,
}

impl ConfigurationError {
    pub fn contains(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates violations instead of stopping at the first one.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(Violation {
                field: field.to_string(),
                message: message.into(),
            });
        }
        self
    }

    pub fn finite(&mut self, value: f64, field: &str) -> &mut Self {
        self.check(value.is_finite(), field, format!("must be finite, got {value}"))
    }

    pub fn positive(&mut self, value: f64, field: &str) -> &mut Self {
        self.check(value > 0.0 && value.is_finite(), field, format!("must be positive, got {value}"))
    }

    pub fn non_negative(&mut self, value: f64, field: &str) -> &mut Self {
        self.check(value >= 0.0 && value.is_finite(), field, format!("must be non-negative, got {value}"))
    }

    pub fn non_zero(&mut self, value: f64, field: &str) -> &mut Self {
        self.check(value != 0.0 && value.is_finite(), field, format!("must be finite and non-zero, got {value}"))
    }

    pub fn in_open_unit_interval(&mut self, value: f64, field: &str) -> &mut Self {
        self.check(value > 0.0 && value < 1.0, field, format!("must lie in (0, 1), got {value}"))
    }

    pub fn extend(&mut self, other: Violations) -> &mut Self {
        self.0.extend(other.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ConfigurationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError { violations: self.0 })
        }
    }
}

impl From<ConfigurationError> for Violations {
    fn from(err: ConfigurationError) -> Self {
        Self(err.violations)
    }
}
