//! The shared rendering engine behind both text writers.

use std::io::{self, Write};

use openmetrics_model::{Exemplar, Labels, MetricMetadata, Unit};

/// OpenMetrics bounds the combined length of exemplar label names and values
/// at 128 UTF-8 bytes. Oversized exemplars are dropped at write time; the
/// sample itself is still emitted.
pub(crate) const EXEMPLAR_LABELS_MAX_BYTES: usize = 128;

/// How floating-point sample values are rendered.
///
/// Both formats use the shortest round-trippable decimal form with `.` as
/// the separator and the special tokens `+Inf`, `-Inf`, and `NaN`; they
/// differ on integer-valued doubles, which keep a trailing `.0` in
/// OpenMetrics and drop it in the Prometheus text format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DoubleStyle {
    OpenMetrics,
    Prometheus,
}

pub(crate) fn write_double<W: Write>(out: &mut W, value: f64, style: DoubleStyle) -> io::Result<()> {
    if value.is_nan() {
        out.write_all(b"NaN")
    } else if value == f64::INFINITY {
        out.write_all(b"+Inf")
    } else if value == f64::NEG_INFINITY {
        out.write_all(b"-Inf")
    } else if value == value.trunc() && style == DoubleStyle::OpenMetrics {
        write!(out, "{:.1}", value)
    } else {
        write!(out, "{}", value)
    }
}

/// Like [`write_double`], but into a `String`, for `le=` and `quantile=`
/// label values.
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value == value.trunc() {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Timestamps are seconds with millisecond precision.
pub(crate) fn write_timestamp<W: Write>(out: &mut W, millis: u64) -> io::Result<()> {
    write!(out, "{}.{:03}", millis / 1_000, millis % 1_000)
}

pub(crate) fn write_scrape_timestamp<W: Write>(
    out: &mut W,
    millis: Option<u64>,
) -> io::Result<()> {
    if let Some(millis) = millis {
        out.write_all(b" ")?;
        write_timestamp(out, millis)?;
    }
    Ok(())
}

// Label values escape backslash, double quote, and newline.
pub(crate) fn write_escaped_label_value<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    for c in value.chars() {
        match c {
            '\\' => out.write_all(b"\\\\")?,
            '"' => out.write_all(b"\\\"")?,
            '\n' => out.write_all(b"\\n")?,
            c => write!(out, "{}", c)?,
        }
    }
    Ok(())
}

// Help text escapes backslash and newline; quotes stay as-is.
pub(crate) fn write_escaped_help<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    for c in value.chars() {
        match c {
            '\\' => out.write_all(b"\\\\")?,
            '\n' => out.write_all(b"\\n")?,
            c => write!(out, "{}", c)?,
        }
    }
    Ok(())
}

/// Writes `name[suffix]{labels}` with an optional writer-reserved label
/// (`le`, `quantile`, the stateset state label) appended after the user
/// labels.
pub(crate) fn write_sample_name<W: Write>(
    out: &mut W,
    name: &str,
    suffix: Option<&str>,
    labels: &Labels,
    reserved_label: Option<(&str, &str)>,
) -> io::Result<()> {
    out.write_all(name.as_bytes())?;
    if let Some(suffix) = suffix {
        out.write_all(suffix.as_bytes())?;
    }
    if labels.is_empty() && reserved_label.is_none() {
        return Ok(());
    }
    out.write_all(b"{")?;
    let mut first = true;
    for label in labels {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        out.write_all(label.name().as_bytes())?;
        out.write_all(b"=\"")?;
        write_escaped_label_value(out, label.value())?;
        out.write_all(b"\"")?;
    }
    if let Some((name, value)) = reserved_label {
        if !first {
            out.write_all(b",")?;
        }
        out.write_all(name.as_bytes())?;
        out.write_all(b"=\"")?;
        write_escaped_label_value(out, value)?;
        out.write_all(b"\"")?;
    }
    out.write_all(b"}")
}

fn exemplar_labels_len(labels: &Labels) -> usize {
    labels.iter().map(|label| label.name().len() + label.value().len()).sum()
}

/// Renders ` # {labels} value [timestamp]` after a sample, or nothing when
/// the exemplar's label set exceeds the OpenMetrics length bound.
pub(crate) fn write_exemplar<W: Write>(
    out: &mut W,
    exemplar: Option<&Exemplar>,
) -> io::Result<()> {
    let Some(exemplar) = exemplar else {
        return Ok(());
    };
    if exemplar_labels_len(exemplar.labels()) > EXEMPLAR_LABELS_MAX_BYTES {
        return Ok(());
    }
    out.write_all(b" # {")?;
    let mut first = true;
    for label in exemplar.labels() {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        out.write_all(label.name().as_bytes())?;
        out.write_all(b"=\"")?;
        write_escaped_label_value(out, label.value())?;
        out.write_all(b"\"")?;
    }
    out.write_all(b"} ")?;
    write_double(out, exemplar.value(), DoubleStyle::OpenMetrics)?;
    if let Some(ts) = exemplar.timestamp_millis() {
        out.write_all(b" ")?;
        write_timestamp(out, ts)?;
    }
    Ok(())
}

pub(crate) fn write_type_line<W: Write>(
    out: &mut W,
    name: &str,
    metric_type: &str,
) -> io::Result<()> {
    out.write_all(b"# TYPE ")?;
    out.write_all(name.as_bytes())?;
    out.write_all(b" ")?;
    out.write_all(metric_type.as_bytes())?;
    out.write_all(b"\n")
}

pub(crate) fn write_unit_line<W: Write>(out: &mut W, name: &str, unit: &Unit) -> io::Result<()> {
    out.write_all(b"# UNIT ")?;
    out.write_all(name.as_bytes())?;
    out.write_all(b" ")?;
    out.write_all(unit.as_str().as_bytes())?;
    out.write_all(b"\n")
}

pub(crate) fn write_help_line<W: Write>(out: &mut W, name: &str, help: &str) -> io::Result<()> {
    out.write_all(b"# HELP ")?;
    out.write_all(name.as_bytes())?;
    out.write_all(b" ")?;
    write_escaped_help(out, help)?;
    out.write_all(b"\n")
}

/// Appends `suffix` unless the name already ends with it.
pub(crate) fn suffixed(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// `_created` is emitted only for series that know their creation time;
/// zero means absent.
pub(crate) fn write_created_line<W: Write>(
    out: &mut W,
    name: &str,
    labels: &Labels,
    created_timestamp_millis: u64,
) -> io::Result<()> {
    if created_timestamp_millis == 0 {
        return Ok(());
    }
    write_sample_name(out, name, Some("_created"), labels, None)?;
    out.write_all(b" ")?;
    write_timestamp(out, created_timestamp_millis)?;
    out.write_all(b"\n")
}

pub(crate) fn help_of(metadata: &MetricMetadata) -> Option<&str> {
    metadata.help().filter(|help| !help.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{format_double, write_double, write_timestamp, DoubleStyle};

    fn openmetrics(value: f64) -> String {
        let mut out = Vec::new();
        write_double(&mut out, value, DoubleStyle::OpenMetrics).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn prometheus(value: f64) -> String {
        let mut out = Vec::new();
        write_double(&mut out, value, DoubleStyle::Prometheus).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_openmetrics_doubles_keep_dot_zero() {
        assert_eq!(openmetrics(1.0), "1.0");
        assert_eq!(openmetrics(27000.0), "27000.0");
        assert_eq!(openmetrics(1.1), "1.1");
        assert_eq!(openmetrics(0.8), "0.8");
        assert_eq!(openmetrics(-2.0), "-2.0");
    }

    #[test]
    fn test_prometheus_doubles_drop_dot_zero() {
        assert_eq!(prometheus(1.0), "1");
        assert_eq!(prometheus(27000.0), "27000");
        assert_eq!(prometheus(1.1), "1.1");
    }

    #[test]
    fn test_special_tokens() {
        for style in [DoubleStyle::OpenMetrics, DoubleStyle::Prometheus] {
            let mut out = Vec::new();
            write_double(&mut out, f64::INFINITY, style).unwrap();
            write_double(&mut out, f64::NEG_INFINITY, style).unwrap();
            write_double(&mut out, f64::NAN, style).unwrap();
            assert_eq!(out, b"+Inf-InfNaN");
        }
        assert_eq!(format_double(f64::INFINITY), "+Inf");
        assert_eq!(format_double(2.2), "2.2");
        assert_eq!(format_double(2.0), "2.0");
    }

    #[test]
    fn test_timestamps_are_millisecond_precise() {
        let mut out = Vec::new();
        write_timestamp(&mut out, 1672850685829).unwrap();
        out.push(b' ');
        write_timestamp(&mut out, 1672850585820).unwrap();
        out.push(b' ');
        write_timestamp(&mut out, 1672850285000).unwrap();
        assert_eq!(out, b"1672850685.829 1672850585.820 1672850285.000");
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::{write_escaped_help, write_escaped_label_value};

        proptest! {
            // Escaped label values never contain raw newlines, and every
            // quote is preceded by a backslash.
            #[test]
            fn escaped_label_values_are_safe(input in ".*") {
                let mut out = Vec::new();
                write_escaped_label_value(&mut out, &input).unwrap();
                let escaped = String::from_utf8(out).unwrap();
                prop_assert!(!escaped.contains('\n'));
                let chars: Vec<char> = escaped.chars().collect();
                for (i, c) in chars.iter().enumerate() {
                    if *c == '"' {
                        prop_assert_eq!(chars.get(i.wrapping_sub(1)), Some(&'\\'));
                    }
                }
            }

            // Help escaping only rewrites backslashes and newlines.
            #[test]
            fn escaped_help_preserves_everything_else(input in "[^\\\\\n]*") {
                let mut out = Vec::new();
                write_escaped_help(&mut out, &input).unwrap();
                prop_assert_eq!(String::from_utf8(out).unwrap(), input);
            }
        }
    }
}
