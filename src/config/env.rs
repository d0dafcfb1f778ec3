use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Reads `PREFIX{sep}SECTION{sep}KEY` environment variables into the config tree.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in std::env::vars() {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(str::to_lowercase)
                .collect();

            entries.push(ConfigEntry::at_path(path, coerce_value(&value)));
        }

        Ok(entries)
    }
}

/// Converts a raw string into the most specific value it spells:
/// boolean, integer, float, then string.
pub fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("TRUE"), Value::Boolean(true));
        assert_eq!(coerce_value("false"), Value::Boolean(false));
        assert_eq!(coerce_value("-42"), Value::Integer(-42));
        assert_eq!(coerce_value("0.5"), Value::Float(0.5));
        assert_eq!(coerce_value("4g"), Value::String("4g".into()));
        assert_eq!(coerce_value("-"), Value::String("-".into()));
    }

    #[test]
    fn test_env_source_maps_nested_paths() {
        std::env::set_var("CMTEST_ENVSRC__DATABASE__PORT", "5432");
        std::env::set_var("CMTEST_ENVSRC__", "ignored");

        let entries = EnvSource::new("CMTEST_ENVSRC", "__").entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, vec!["database", "port"]);
        assert_eq!(entries[0].value, Value::Integer(5432));

        std::env::remove_var("CMTEST_ENVSRC__DATABASE__PORT");
        std::env::remove_var("CMTEST_ENVSRC__");
    }

    #[test]
    #[should_panic(expected = "separator must not be empty")]
    fn test_empty_separator_rejected() {
        let _ = EnvSource::new("APP", "");
    }
}
