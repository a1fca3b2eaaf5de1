//! Known cache prefixes and TTL presets.
//!
//! A prefix names a family of keys that is invalidated as a unit. `purge_all` walks the
//! registry below, so every prefix a service caches under must be listed here.

use std::time::Duration;

pub const GAMES: &str = "games";
pub const PLATFORMS: &str = "platforms";
pub const PEOPLE: &str = "people";
pub const CONCEPTS: &str = "concepts";
pub const RELEASES: &str = "releases";
pub const PLATFORM_MAPPINGS: &str = "platform-mappings";
pub const PLATFORM_LIST: &str = "platform-list";
pub const FACETS: &str = "facets";

/// Every prefix the catalog services cache under.
pub const KNOWN_PREFIXES: [&str; 8] = [
    GAMES,
    PLATFORMS,
    PEOPLE,
    CONCEPTS,
    RELEASES,
    PLATFORM_MAPPINGS,
    PLATFORM_LIST,
    FACETS,
];

pub fn is_known_prefix(prefix: &str) -> bool {
    KNOWN_PREFIXES.contains(&prefix)
}

/// TTL presets.
pub struct Ttl;

impl Ttl {
    pub const MINUTE: Duration = Duration::from_secs(60);
    pub const HOUR: Duration = Duration::from_secs(3_600);
    pub const DAY: Duration = Duration::from_secs(86_400);
    pub const WEEK: Duration = Duration::from_secs(604_800);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn registry_has_no_duplicates() {
        let unique: HashSet<_> = KNOWN_PREFIXES.iter().collect();
        assert_eq!(unique.len(), KNOWN_PREFIXES.len());
    }

    #[test]
    fn lookup_matches_registry() {
        assert!(is_known_prefix("games"));
        assert!(is_known_prefix("platform-list"));
        assert!(!is_known_prefix("posts"));
    }

    #[test]
    fn ttl_presets() {
        assert_eq!(Ttl::MINUTE.as_secs(), 60);
        assert_eq!(Ttl::HOUR.as_secs(), 3_600);
        assert_eq!(Ttl::DAY.as_secs(), 86_400);
        assert_eq!(Ttl::WEEK.as_secs(), 604_800);
    }
}
