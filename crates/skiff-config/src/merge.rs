use std::collections::BTreeMap;
use std::fmt;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Embedded `defaults.toml`.
    Defaults,
    /// `~/.skiff/config.toml`.
    User,
    /// A file passed explicitly to the loader.
    Explicit,
    /// A `SKIFF_*` environment variable.
    Environment(String),
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user"),
            Self::Explicit => write!(f, "explicit"),
            Self::Environment(var) => write!(f, "env:{var}"),
        }
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = BTreeMap<String, ConfigLayer>;

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Deep-merge `overlay` into `base`, recording which layer set each leaf.
///
/// Tables merge per key. Scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record every leaf under `val` as set by `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_leaves_and_keeps_siblings() {
        let mut base = parse("[gateway]\nurl = \"a\"\ntimeout_secs = 30\n");
        let mut sources = FieldSources::new();
        record_leaves(&base, "", &ConfigLayer::Defaults, &mut sources);

        deep_merge_tracking(
            &mut base,
            &parse("[gateway]\nurl = \"b\"\n"),
            "",
            &ConfigLayer::User,
            &mut sources,
        );

        assert_eq!(base["gateway"]["url"].as_str(), Some("b"));
        assert_eq!(base["gateway"]["timeout_secs"].as_integer(), Some(30));
        assert_eq!(sources.get("gateway.url"), Some(&ConfigLayer::User));
        assert_eq!(
            sources.get("gateway.timeout_secs"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=info\"]\n");
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &parse("[logging]\ndirectives = [\"c=trace\"]\n"),
            "",
            &ConfigLayer::Explicit,
            &mut sources,
        );
        assert_eq!(base["logging"]["directives"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_new_section_recorded() {
        let mut base = parse("[gateway]\nurl = \"a\"\n");
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &parse("[depot]\nnamespace = \"x\"\n"),
            "",
            &ConfigLayer::Explicit,
            &mut sources,
        );
        assert_eq!(sources.get("depot.namespace"), Some(&ConfigLayer::Explicit));
    }
}
