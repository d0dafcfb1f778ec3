//! Variable reference resolution for configuration values.
//!
//! Supports `${section.field}` syntax for cross-referencing values within config,
//! plus resolver references of the form `${name:key}` or `${name:key,default}`:
//!
//! - `runtime_params:` looks the key up in the runtime parameters of the load.
//! - `env:` reads a process environment variable.
//!
//! A string consisting of a single reference takes the referenced value with
//! its type. References embedded in longer strings must point at scalars.
//!
//! Use `$${...}` to escape and produce a literal `${...}`.

use super::env::coerce_value;
use super::ConfigError;
use toml::{Table, Value};

const RUNTIME_PARAMS_RESOLVER: &str = "runtime_params";
const ENV_RESOLVER: &str = "env";

/// Lookup context for a single resolution pass.
struct Context<'a> {
    root: &'a Table,
    runtime_params: &'a Table,
}

/// Resolves all references in the configuration table.
///
/// Iteratively resolves references until no more substitutions are made, then
/// turns `$$` escapes into literal `$`.
/// Returns an error if a circular reference is detected or a referenced path doesn't exist.
pub fn resolve_references(table: &mut Table, runtime_params: &Table) -> Result<(), ConfigError> {
    const MAX_ITERATIONS: usize = 100;

    for _ in 0..MAX_ITERATIONS {
        let snapshot = table.clone();
        let ctx = Context {
            root: &snapshot,
            runtime_params,
        };
        let substitutions = resolve_pass(table, &ctx, &mut Vec::new())?;
        if substitutions == 0 {
            unescape_table(table);
            return Ok(());
        }
        // Mutually expanding references grow without ever reaching a fixed point.
        if table_weight(table) > MAX_WEIGHT {
            return Err(ConfigError::CircularReference);
        }
    }

    Err(ConfigError::CircularReference)
}

/// Upper bound on values plus string bytes a resolved table may hold.
const MAX_WEIGHT: usize = 4 * 1024 * 1024;

/// Performs a single resolution pass over all string values.
/// Returns the number of substitutions made.
fn resolve_pass(
    table: &mut Table,
    ctx: &Context<'_>,
    location: &mut Vec<String>,
) -> Result<usize, ConfigError> {
    let mut count = 0;

    for (key, value) in table.iter_mut() {
        location.push(key.clone());
        let resolved = resolve_value(value, ctx, location);
        location.pop();
        count += resolved?;
    }

    Ok(count)
}

/// Resolves references in a single value (recursively for tables/arrays).
///
/// `location` is the dotted path of `value`; array items share their array's path.
fn resolve_value(
    value: &mut Value,
    ctx: &Context<'_>,
    location: &mut Vec<String>,
) -> Result<usize, ConfigError> {
    match value {
        Value::String(s) => {
            if let Some(reference) = whole_reference(s) {
                let resolved = ctx.lookup(reference)?;
                check_self_embedding(reference, &resolved, location)?;
                *value = resolved;
                return Ok(1);
            }
            resolve_string(s, ctx, location)
        }
        Value::Table(t) => resolve_pass(t, ctx, location),
        Value::Array(arr) => {
            let mut count = 0;
            for item in arr.iter_mut() {
                count += resolve_value(item, ctx, location)?;
            }
            Ok(count)
        }
        _ => Ok(0),
    }
}

/// Rejects a substitution that copies a value into its own subtree while that
/// value still holds unresolved references.
fn check_self_embedding(
    reference: &str,
    resolved: &Value,
    location: &[String],
) -> Result<(), ConfigError> {
    if reference.contains(':') {
        return Ok(());
    }
    let target: Vec<&str> = reference.trim().split('.').collect();
    let is_ancestor = target.len() <= location.len()
        && target.iter().zip(location).all(|(t, l)| *t == l.as_str());
    if is_ancestor && has_reference(resolved) {
        return Err(ConfigError::CircularReference);
    }
    Ok(())
}

fn has_reference(value: &Value) -> bool {
    match value {
        Value::String(s) => s.replace("$$", "").contains("${"),
        Value::Table(t) => t.values().any(has_reference),
        Value::Array(arr) => arr.iter().any(has_reference),
        _ => false,
    }
}

fn table_weight(table: &Table) -> usize {
    table.values().map(value_weight).sum::<usize>() + 1
}

fn value_weight(value: &Value) -> usize {
    match value {
        Value::String(s) => 1 + s.len(),
        Value::Table(t) => table_weight(t),
        Value::Array(arr) => 1 + arr.iter().map(value_weight).sum::<usize>(),
        _ => 1,
    }
}

/// Returns the reference body if `s` is exactly one `${...}` reference.
fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        return None;
    }
    Some(inner)
}

/// Resolves all `${...}` references embedded in a string.
/// `$$` escapes are kept as-is until resolution has finished.
fn resolve_string(
    s: &mut String,
    ctx: &Context<'_>,
    location: &[String],
) -> Result<usize, ConfigError> {
    let mut result = String::with_capacity(s.len());
    let mut substitutions = 0;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push_str("$$");
            }
            Some('{') => {
                chars.next();
                let reference =
                    consume_until(&mut chars, '}').ok_or(ConfigError::UnclosedReference)?;

                let resolved = ctx.lookup(&reference)?;
                check_self_embedding(&reference, &resolved, location)?;
                result.push_str(&value_to_string(&resolved, &reference)?);
                substitutions += 1;
            }
            _ => result.push('$'),
        }
    }

    if substitutions > 0 {
        *s = result;
    }
    Ok(substitutions)
}

/// Consumes characters until the delimiter, returning the collected string.
fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}

impl Context<'_> {
    fn lookup(&self, reference: &str) -> Result<Value, ConfigError> {
        match reference.split_once(':') {
            Some((resolver, arg)) => self.resolve_with(resolver.trim(), arg),
            None => lookup_path(self.root, reference.trim()).cloned(),
        }
    }

    fn resolve_with(&self, resolver: &str, arg: &str) -> Result<Value, ConfigError> {
        let (key, default) = match arg.split_once(',') {
            Some((key, default)) => (key.trim(), Some(default.trim())),
            None => (arg.trim(), None),
        };

        let found = match resolver {
            RUNTIME_PARAMS_RESOLVER => {
                let parts = split_path(key)?;
                find_path(self.runtime_params, &parts).cloned()
            }
            ENV_RESOLVER => std::env::var(key).ok().map(|raw| coerce_value(&raw)),
            other => return Err(ConfigError::UnknownResolver(other.to_string())),
        };

        match (found, default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(coerce_value(default)),
            (None, None) if resolver == ENV_RESOLVER => {
                Err(ConfigError::EnvVarNotFound(key.to_string()))
            }
            (None, None) => Err(ConfigError::RuntimeParamNotFound(key.to_string())),
        }
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, ConfigError> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidReferencePath(path.to_string()));
    }
    Ok(parts)
}

fn find_path<'t>(root: &'t Table, parts: &[&str]) -> Option<&'t Value> {
    let (first, rest) = parts.split_first()?;
    let mut current = root.get(*first)?;
    for part in rest {
        current = current.as_table()?.get(*part)?;
    }
    Some(current)
}

/// Looks up a dotted path in the TOML table.
fn lookup_path<'t>(root: &'t Table, path: &str) -> Result<&'t Value, ConfigError> {
    let parts = split_path(path)?;
    find_path(root, &parts).ok_or_else(|| ConfigError::ReferenceNotFound(path.to_string()))
}

/// Converts a TOML value to its string representation.
fn value_to_string(value: &Value, path: &str) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Array(_) | Value::Table(_) => {
            Err(ConfigError::NonScalarReference(path.to_string()))
        }
    }
}

fn unescape_table(table: &mut Table) {
    for (_key, value) in table.iter_mut() {
        unescape_value(value);
    }
}

fn unescape_value(value: &mut Value) {
    match value {
        Value::String(s) if s.contains("$$") => *s = s.replace("$$", "$"),
        Value::Table(t) => unescape_table(t),
        Value::Array(arr) => arr.iter_mut().for_each(unescape_value),
        _ => {}
    }
}
