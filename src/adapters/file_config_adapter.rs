//! INI file configuration adapter.

use crate::domain::error::RotatorError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RotatorError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| RotatorError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, RotatorError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| RotatorError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub(crate) fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[data]
path = prices.csv
benchmark = SPY
volatility_index = VIX

[backtest]
initial_capital = 250000.0
window_years = 3
parallel = false

[strategy]
base_threshold = 0.15
signal_window = 60
ma_windows = 10, 40 ,140
enforce_stops = no

[sweep]
base_threshold = 0.1,0.2,,0.3
"#;

    #[test]
    fn reads_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "path"), Some("prices.csv".to_string()));
        assert_eq!(adapter.get_string("data", "benchmark"), Some("SPY".to_string()));
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 250_000.0);
        assert_eq!(adapter.get_int("backtest", "window_years", 5), 3);
        assert!(!adapter.get_bool("backtest", "parallel", true));
        assert_eq!(adapter.get_double("strategy", "base_threshold", 0.1), 0.15);
        assert_eq!(adapter.get_int("strategy", "signal_window", 120), 60);
        assert!(!adapter.get_bool("strategy", "enforce_stops", true));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_list("strategy", "ma_windows"),
            Some(vec!["10".to_string(), "40".to_string(), "140".to_string()])
        );
        assert_eq!(
            adapter.get_list("sweep", "base_threshold"),
            Some(vec!["0.1".to_string(), "0.2".to_string(), "0.3".to_string()])
        );
        assert_eq!(adapter.get_list("sweep", "signal_window"), None);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn defaults_for_missing_or_malformed_numbers() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nsignal_window = abc\nbase_threshold = x\n")
                .unwrap();
        assert_eq!(adapter.get_int("strategy", "signal_window", 120), 120);
        assert_eq!(adapter.get_double("strategy", "base_threshold", 0.1), 0.1);
        assert_eq!(adapter.get_int("strategy", "vol_window", 30), 30);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = off\ne = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(!adapter.get_bool("backtest", "d", true));
        assert!(adapter.get_bool("backtest", "e", true));
        assert!(!adapter.get_bool("backtest", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\npath = /data/sectors.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/data/sectors.csv".to_string())
        );
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").err().unwrap();
        match err {
            RotatorError::ConfigParse { file, .. } => assert!(file.contains("config.ini")),
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }
}
