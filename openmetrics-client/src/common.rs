//! Shared builder plumbing for the instrument types.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use openmetrics_model::{
    validate_label_name, Labels, MetricMetadata, MetricsError, Unit,
};

/// Wall-clock unix time in milliseconds.
pub(crate) fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// The name/help/unit/labels options every instrument builder shares.
///
/// Instruments compose this instead of inheriting from a common parent: each
/// public builder forwards its fluent setters here and calls
/// [`CommonOpts::validate`] with its kind-specific restrictions.
pub(crate) struct CommonOpts {
    pub name: Option<String>,
    pub help: Option<String>,
    pub unit: Option<Unit>,
    pub label_names: Vec<String>,
    pub const_labels: Labels,
}

impl CommonOpts {
    pub fn new() -> CommonOpts {
        CommonOpts {
            name: None,
            help: None,
            unit: None,
            label_names: Vec::new(),
            const_labels: Labels::empty(),
        }
    }

    /// Validates the assembled options.
    ///
    /// `reserved_suffixes` are the writer-appended suffixes for the
    /// instrument kind; `forbidden_labels` are label names the writer itself
    /// emits for the kind (`le`, `quantile`, the stateset state label).
    pub fn validate(
        &self,
        reserved_suffixes: &[&str],
        forbidden_labels: &[&str],
    ) -> Result<(MetricMetadata, Arc<[String]>, Labels), MetricsError> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| MetricsError::InvalidName("metric name is required".to_string()))?;
        let metadata = MetricMetadata::new(name, self.help.clone(), self.unit.clone())?;
        metadata.reject_suffixes(reserved_suffixes)?;

        for label_name in &self.label_names {
            validate_label_name(label_name)?;
            if forbidden_labels.contains(&label_name.as_str()) {
                return Err(MetricsError::InvalidName(format!(
                    "label name {} is reserved for {}",
                    label_name, name
                )));
            }
            if self.const_labels.contains(label_name) {
                return Err(MetricsError::InvalidArgument(format!(
                    "label name {} is already a constant label",
                    label_name
                )));
            }
        }
        let mut sorted = self.label_names.clone();
        sorted.sort();
        for window in sorted.windows(2) {
            if window[0] == window[1] {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate label name: {}",
                    window[0]
                )));
            }
        }
        for label in self.const_labels.iter() {
            if forbidden_labels.contains(&label.name()) {
                return Err(MetricsError::InvalidName(format!(
                    "constant label {} is reserved for {}",
                    label.name(),
                    name
                )));
            }
        }

        // Observation order, not sorted order: with_labels values match the
        // declaration order of the label names.
        let label_names: Arc<[String]> = self.label_names.clone().into();
        Ok((metadata, label_names, self.const_labels.clone()))
    }
}

#[cfg(test)]
mod tests {
    use openmetrics_model::Labels;

    use super::{now_unix_millis, CommonOpts};

    #[test]
    fn test_now_unix_millis_advances() {
        let now = now_unix_millis();
        // 2020-01-01 in unix millis; anything earlier means a broken clock.
        assert!(now > 1_577_836_800_000);
    }

    #[test]
    fn test_validate_rejects_forbidden_and_duplicate_labels() {
        let mut opts = CommonOpts::new();
        opts.name = Some("request_latency".to_string());
        opts.label_names = vec!["le".to_string()];
        assert!(opts.validate(&[], &["le"]).is_err());

        opts.label_names = vec!["path".to_string(), "path".to_string()];
        assert!(opts.validate(&[], &[]).is_err());

        opts.label_names = vec!["path".to_string()];
        opts.const_labels = Labels::of(&["path", "/hello"]).unwrap();
        assert!(opts.validate(&[], &[]).is_err());

        opts.const_labels = Labels::of(&["env", "prod"]).unwrap();
        assert!(opts.validate(&[], &[]).is_ok());
    }
}
