//! Source abstraction shared by the settings builder.

use toml::{Table, Value};

use super::ConfigError;

/// A value contributed by a source, placed at `path` in the merged table.
///
/// An empty path means the value is a table merged at the root.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// Merges `value` into `table` at `path`, creating intermediate tables.
///
/// Non-table values already on the path are replaced.
pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => {
                deep_merge(base, overlay);
            }
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

/// Recursively merges `overlay` into `base`. Nested tables merge; everything
/// else, arrays included, is replaced.
pub fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(s: &str) -> Table {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_deep_merge_nested_tables() {
        let mut base = table(
            r#"
            [db]
            host = "localhost"
            port = 5432
            "#,
        );
        deep_merge(
            &mut base,
            table(
                r#"
                [db]
                port = 6543
                "#,
            ),
        );
        assert_eq!(base["db"]["host"].as_str(), Some("localhost"));
        assert_eq!(base["db"]["port"].as_integer(), Some(6543));
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base = table("tags = [\"a\", \"b\"]");
        deep_merge(&mut base, table("tags = [\"c\"]"));
        assert_eq!(base["tags"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_at_path_creates_intermediate_tables() {
        let mut base = table("debug = true");
        let path = vec!["server".to_string(), "port".to_string()];
        merge_at_path(&mut base, &path, Value::Integer(8080));
        assert_eq!(base["server"]["port"].as_integer(), Some(8080));
        assert_eq!(base["debug"].as_bool(), Some(true));
    }

    #[test]
    fn test_merge_at_path_replaces_scalar_parent() {
        let mut base = table("server = \"local\"");
        let path = vec!["server".to_string(), "port".to_string()];
        merge_at_path(&mut base, &path, Value::Integer(1));
        assert_eq!(base["server"]["port"].as_integer(), Some(1));
    }
}
