//! Domain error types.

/// Top-level error type for rotator.
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid price table: {reason}")]
    InvalidPrices { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no usable price data in {source_name}")]
    NoData { source_name: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RotatorError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RotatorError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn prices(reason: impl Into<String>) -> Self {
        RotatorError::InvalidPrices {
            reason: reason.into(),
        }
    }
}

impl From<&RotatorError> for std::process::ExitCode {
    fn from(err: &RotatorError) -> Self {
        let code: u8 = match err {
            RotatorError::Io(_) => 1,
            RotatorError::ConfigParse { .. }
            | RotatorError::ConfigMissing { .. }
            | RotatorError::ConfigInvalid { .. } => 2,
            RotatorError::InvalidPrices { .. } | RotatorError::Data { .. } => 3,
            RotatorError::Report { .. } => 4,
            RotatorError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message_names_section_and_key() {
        let err = RotatorError::invalid("strategy", "base_threshold", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] base_threshold: must be positive"
        );
    }

    #[test]
    fn io_errors_convert_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RotatorError = io.into();
        assert!(matches!(err, RotatorError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }

    #[test]
    fn exit_codes_group_by_kind() {
        use std::process::ExitCode;
        let cases = [
            (RotatorError::invalid("a", "b", "c"), ExitCode::from(2)),
            (RotatorError::prices("bad"), ExitCode::from(3)),
            (
                RotatorError::Report {
                    reason: "x".into(),
                },
                ExitCode::from(4),
            ),
            (
                RotatorError::NoData {
                    source_name: "prices.csv".into(),
                },
                ExitCode::from(5),
            ),
        ];
        // ExitCode has no PartialEq; compare the debug form instead.
        for (err, expected) in &cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(err)),
                format!("{:?}", expected)
            );
        }
    }
}
