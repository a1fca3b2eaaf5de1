//! Cache key construction.
//!
//! Keys embed the current version of their prefix so that bumping the version orphans every
//! entry built under the previous one.

use std::collections::BTreeMap;
use std::time::Duration;

use super::registry::Ttl;

/// A single query parameter folded into a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParam {
    Text(String),
    List(Vec<String>),
    Flag(bool),
    Number(i64),
    Absent,
}

impl KeyParam {
    /// Rendered value before sanitizing, `None` when the parameter is left out of the key.
    fn rendered(&self) -> Option<String> {
        match self {
            KeyParam::Text(value) if !value.is_empty() => Some(value.clone()),
            KeyParam::List(values) if !values.is_empty() => Some(values.join(",")),
            KeyParam::Flag(true) => Some("1".to_string()),
            KeyParam::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for KeyParam {
    fn from(value: &str) -> Self {
        KeyParam::Text(value.to_string())
    }
}

impl From<String> for KeyParam {
    fn from(value: String) -> Self {
        KeyParam::Text(value)
    }
}

impl From<Vec<String>> for KeyParam {
    fn from(values: Vec<String>) -> Self {
        KeyParam::List(values)
    }
}

impl From<bool> for KeyParam {
    fn from(value: bool) -> Self {
        KeyParam::Flag(value)
    }
}

impl From<i64> for KeyParam {
    fn from(value: i64) -> Self {
        KeyParam::Number(value)
    }
}

impl From<u32> for KeyParam {
    fn from(value: u32) -> Self {
        KeyParam::Number(i64::from(value))
    }
}

impl<T: Into<KeyParam>> From<Option<T>> for KeyParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyParam::Absent, Into::into)
    }
}

/// Named parameters of a cached query. Iteration order is sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams {
    params: BTreeMap<String, KeyParam>,
}

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<KeyParam>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<KeyParam>) {
        self.params.insert(name.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Strip everything except ASCII alphanumerics, `_`, `,`, `#` and `-`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '#' | '-'))
        .collect()
}

/// `prefix-v{version}` followed by `-name_value` for every non-empty parameter.
pub fn compose_key(prefix: &str, version: i64, params: &KeyParams) -> String {
    let mut key = format!("{prefix}-v{version}");
    for (name, param) in &params.params {
        let Some(value) = param.rendered() else {
            continue;
        };
        let value = sanitize(&value);
        if value.is_empty() {
            continue;
        }
        key.push('-');
        key.push_str(name);
        key.push('_');
        key.push_str(&value);
    }
    key
}

/// `prefix-v{version}` with an optional `-suffix`.
pub fn compose_simple_key(prefix: &str, version: i64, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{prefix}-v{version}-{suffix}"),
        _ => format!("{prefix}-v{version}"),
    }
}

/// Join key components under the namespace, `namespace:a:b`.
pub fn namespaced(namespace: &str, components: &[&str]) -> String {
    let mut key = namespace.to_string();
    for component in components {
        key.push(':');
        key.push_str(component);
    }
    key
}

/// Namespace a key unless it already carries one.
pub fn ensure_namespaced(namespace: &str, key: &str) -> String {
    if key.contains(':') {
        key.to_string()
    } else {
        namespaced(namespace, &[key])
    }
}

/// Human readable TTL for log lines.
pub fn format_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let scaled = |unit: Duration| (secs as f64 / unit.as_secs() as f64 * 10.0).round() / 10.0;
    if ttl >= Ttl::DAY {
        format!("{} day(s)", scaled(Ttl::DAY))
    } else if ttl >= Ttl::HOUR {
        format!("{} hour(s)", scaled(Ttl::HOUR))
    } else if ttl >= Ttl::MINUTE {
        format!("{} minute(s)", scaled(Ttl::MINUTE))
    } else {
        format!("{secs} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept_params() -> KeyParams {
        KeyParams::new()
            .with("letter", "A")
            .with("games", vec!["Games/Halo 3".to_string(), "Games/Portal".to_string()])
            .with("sort", "alphabetical")
            .with("page", 2u32)
            .with("requireAll", true)
    }

    #[test]
    fn key_sorts_params_and_sanitizes_values() {
        let key = compose_key("concepts", 3, &concept_params());
        assert_eq!(
            key,
            "concepts-v3-games_GamesHalo3,GamesPortal-letter_A-page_2-requireAll_1-sort_alphabetical"
        );
    }

    #[test]
    fn insertion_order_does_not_change_key() {
        let reversed = KeyParams::new()
            .with("requireAll", true)
            .with("page", 2u32)
            .with("sort", "alphabetical")
            .with("games", vec!["Games/Halo 3".to_string(), "Games/Portal".to_string()])
            .with("letter", "A");
        assert_eq!(
            compose_key("concepts", 3, &concept_params()),
            compose_key("concepts", 3, &reversed)
        );
    }

    #[test]
    fn empty_false_and_absent_params_are_omitted() {
        let params = KeyParams::new()
            .with("letter", "")
            .with("games", Vec::<String>::new())
            .with("requireAll", false)
            .with("region", Option::<String>::None)
            .with("symbols", "!!!");
        assert_eq!(compose_key("people", 1, &params), "people-v1");
    }

    #[test]
    fn hash_sentinel_survives_sanitizing() {
        let params = KeyParams::new().with("letter", "#");
        assert_eq!(compose_key("platforms", 1, &params), "platforms-v1-letter_#");
    }

    #[test]
    fn version_is_part_of_key() {
        let params = KeyParams::new().with("sort", "alphabetical");
        assert_ne!(
            compose_key("games", 1, &params),
            compose_key("games", 2, &params)
        );
    }

    #[test]
    fn simple_key_appends_suffix_only_when_present() {
        assert_eq!(compose_simple_key("platform-list", 4, None), "platform-list-v4");
        assert_eq!(compose_simple_key("platform-list", 4, Some("")), "platform-list-v4");
        assert_eq!(
            compose_simple_key("platform-list", 4, Some("all")),
            "platform-list-v4-all"
        );
    }

    #[test]
    fn namespacing_leaves_qualified_keys_alone() {
        assert_eq!(ensure_namespaced("gamedex", "games-v1"), "gamedex:games-v1");
        assert_eq!(ensure_namespaced("gamedex", "other:games-v1"), "other:games-v1");
        assert_eq!(
            namespaced("gamedex", &["platforms", "abbreviations"]),
            "gamedex:platforms:abbreviations"
        );
    }

    #[test]
    fn ttl_formatting_picks_largest_unit() {
        assert_eq!(format_ttl(Ttl::DAY), "1 day(s)");
        assert_eq!(format_ttl(Duration::from_secs(5_400)), "1.5 hour(s)");
        assert_eq!(format_ttl(Ttl::MINUTE), "1 minute(s)");
        assert_eq!(format_ttl(Duration::from_secs(12)), "12 seconds");
    }
}
