use crate::error::MetricsError;
use crate::unit::Unit;

/// Suffixes appended by the exposition writers.
///
/// Family names must not end in any of these; instrument and snapshot
/// builders reject the subset relevant to their kind.
pub const RESERVED_SUFFIXES: [&str; 8] =
    ["_total", "_created", "_bucket", "_count", "_sum", "_info", "_gcount", "_gsum"];

/// Descriptive metadata shared by all series of a metric family.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricMetadata {
    name: String,
    help: Option<String>,
    unit: Option<Unit>,
}

impl MetricMetadata {
    /// Creates metadata, validating the family name.
    ///
    /// The name must match `[a-zA-Z_:][a-zA-Z0-9_:]*`. When a unit is given,
    /// the name must end in `_<unit>`.
    pub fn new(
        name: &str,
        help: Option<String>,
        unit: Option<Unit>,
    ) -> Result<MetricMetadata, MetricsError> {
        validate_metric_name(name)?;
        if let Some(unit) = &unit {
            let expected = format!("_{}", unit.as_str());
            if !name.ends_with(&expected) {
                return Err(MetricsError::InvalidName(format!(
                    "metric {} has unit {} but does not end in {}",
                    name, unit, expected
                )));
            }
        }
        Ok(MetricMetadata { name: name.to_string(), help, unit })
    }

    /// Rejects the name if it ends in one of `suffixes`.
    pub fn reject_suffixes(&self, suffixes: &[&str]) -> Result<(), MetricsError> {
        for suffix in suffixes {
            if self.name.ends_with(suffix) {
                return Err(MetricsError::InvalidName(format!(
                    "metric name {} must not end in {}: the suffix is appended by the exposition writer",
                    self.name, suffix
                )));
            }
        }
        Ok(())
    }

    /// The family name, without writer-appended suffixes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text, if set.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Unit, if set.
    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }
}

/// Checks a family name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_' || c == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(format!("invalid metric name: {}", name)))
    }
}
