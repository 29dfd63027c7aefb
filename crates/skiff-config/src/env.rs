use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Prefix of recognised environment variables.
pub const ENV_PREFIX: &str = "SKIFF_";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Int,
    List,
}

/// Environment variable, target field, value kind.
const OVERRIDES: &[(&str, &str, &str, Kind)] = &[
    ("SKIFF_GATEWAY_URL", "gateway", "url", Kind::Str),
    ("SKIFF_GATEWAY_TIMEOUT_SECS", "gateway", "timeout_secs", Kind::Int),
    ("SKIFF_GATEWAY_MAX_BLOCK_SIZE", "gateway", "max_block_size", Kind::Int),
    ("SKIFF_UPLOAD_TIMEOUT_SECS", "upload", "timeout_secs", Kind::Int),
    ("SKIFF_DEPOT_NAMESPACE", "depot", "namespace", Kind::Str),
    ("SKIFF_DEPOT_STORE_PATH", "depot", "store_path", Kind::Str),
    ("SKIFF_DEPOT_FETCH_TIMEOUT_SECS", "depot", "fetch_timeout_secs", Kind::Int),
    ("SKIFF_LOG_LEVEL", "logging", "level", Kind::Str),
    ("SKIFF_LOG_FORMAT", "logging", "format", Kind::Str),
    ("SKIFF_LOG_DIRECTIVES", "logging", "directives", Kind::List),
];

/// Snapshot the `SKIFF_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

fn parse(var: &str, raw: &str, kind: Kind) -> ConfigResult<toml::Value> {
    match kind {
        Kind::Str => Ok(toml::Value::String(raw.to_owned())),
        Kind::Int => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(toml::Value::Integer)
            .ok_or_else(|| ConfigError::EnvError {
                var: var.to_owned(),
                message: format!("expected a non-negative integer, got '{raw}'"),
            }),
        Kind::List => Ok(toml::Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_owned()))
                .collect(),
        )),
    }
}

/// Apply the recognised variables in `vars` on top of `merged`.
///
/// Returns the number of fields overridden.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let Some(root) = merged.as_table_mut() else {
        return Ok(0);
    };

    let mut applied = 0usize;
    for (var, section, field, kind) in OVERRIDES {
        let Some(raw) = vars.get(*var) else {
            continue;
        };
        let value = parse(var, raw, *kind)?;
        let table = root
            .entry((*section).to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = table.as_table_mut() {
            table.insert((*field).to_owned(), value);
            sources.insert(
                format!("{section}.{field}"),
                ConfigLayer::Environment((*var).to_owned()),
            );
            applied = applied.saturating_add(1);
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_overrides_applied() {
        let mut merged: toml::Value = toml::from_str("[gateway]\nurl = \"a\"\n").unwrap();
        let mut sources = FieldSources::new();
        let count = apply_env_overrides(
            &mut merged,
            &mut sources,
            &vars(&[
                ("SKIFF_GATEWAY_URL", "http://local"),
                ("SKIFF_UPLOAD_TIMEOUT_SECS", " 15 "),
                ("SKIFF_LOG_DIRECTIVES", "skiff_depot=debug, hyper=warn,"),
                ("SKIFF_UNKNOWN", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(merged["gateway"]["url"].as_str(), Some("http://local"));
        assert_eq!(merged["upload"]["timeout_secs"].as_integer(), Some(15));
        assert_eq!(merged["logging"]["directives"].as_array().unwrap().len(), 2);
        assert_eq!(
            sources.get("gateway.url"),
            Some(&ConfigLayer::Environment("SKIFF_GATEWAY_URL".into()))
        );
    }

    #[test]
    fn test_bad_integer() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let err = apply_env_overrides(
            &mut merged,
            &mut FieldSources::new(),
            &vars(&[("SKIFF_GATEWAY_TIMEOUT_SECS", "-3")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { var, .. } if var == "SKIFF_GATEWAY_TIMEOUT_SECS"));
    }
}
