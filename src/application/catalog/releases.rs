//! Upcoming releases: a date-windowed query, deduplicated and grouped into calendar periods.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use gamedex_types::{ReleaseEntry, ReleaseGroup};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month};
use tracing::{debug, error};

use super::games::platform_links;
use super::{CatalogContext, CatalogError, METRIC_DEGRADED, METRIC_QUERY_MS};
use crate::cache::{KeyParams, registry};
use crate::domain::dates::{period_bucket, release_date_fields};
use crate::domain::properties::{Property, PropertyRow};
use crate::domain::query::{
    Condition, DataQuery, QueryExpression, SortDirective, SortOrder, strip_query_syntax,
};

pub const RELEASE_LIMIT: u32 = 50;

const STORE_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

const PROJECTIONS: &[Property] = &[
    Property::Games,
    Property::Name,
    Property::ReleaseDate,
    Property::ReleaseDateType,
    Property::Platforms,
    Property::Region,
    Property::Image,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFilter {
    pub region: Option<String>,
    /// Platform name without the `Platforms/` prefix.
    pub platform: Option<String>,
    /// Start of the window. Releases strictly after this day and before one month later match.
    pub today: Date,
    pub limit: u32,
}

impl ReleaseFilter {
    pub fn new(today: Date) -> Self {
        Self {
            region: None,
            platform: None,
            today,
            limit: RELEASE_LIMIT,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = clean(region);
        self
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = clean(platform.strip_prefix("Platforms/").unwrap_or(platform));
        self
    }

    fn window_end(&self) -> Date {
        one_month_after(self.today)
    }

    fn key_params(&self) -> KeyParams {
        KeyParams::new()
            .with("region", self.region.clone())
            .with("platform", self.platform.clone())
            .with("from", format_store_date(self.today))
            .with("limit", self.limit)
    }

    fn expression(&self) -> QueryExpression {
        let mut expression = QueryExpression::default()
            .and(Condition::Equals(Property::ObjectType, "Release".to_string()))
            .and(Condition::GreaterThan(
                Property::ReleaseDate,
                format_store_date(self.today),
            ))
            .and(Condition::LessThan(
                Property::ReleaseDate,
                format_store_date(self.window_end()),
            ))
            .and(Condition::NotSubobjectOf("Releases".to_string()));
        if let Some(region) = &self.region {
            expression.push(Condition::Equals(Property::Region, region.clone()));
        }
        if let Some(platform) = &self.platform {
            expression.push(Condition::Equals(
                Property::Platforms,
                format!("Platforms/{platform}"),
            ));
        }
        expression
    }
}

fn clean(value: &str) -> Option<String> {
    Some(strip_query_syntax(value)).filter(|value| !value.is_empty())
}

fn format_store_date(date: Date) -> String {
    date.format(STORE_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Same day of the next month, clamped to that month's last day.
fn one_month_after(date: Date) -> Date {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };
    (1..=date.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .unwrap_or(date)
}

pub struct ReleaseService {
    ctx: Arc<CatalogContext>,
}

impl ReleaseService {
    pub fn new(ctx: Arc<CatalogContext>) -> Self {
        Self { ctx }
    }

    /// Upcoming releases in store order, duplicates dropped. Store failures degrade to an empty
    /// list.
    pub async fn query(&self, filter: &ReleaseFilter) -> Vec<ReleaseEntry> {
        match self.try_query(filter).await {
            Ok(releases) => releases,
            Err(err) => {
                error!(entity = "releases", error = %err, "Release query failed, serving empty result");
                metrics::counter!(METRIC_DEGRADED, "entity" => "releases").increment(1);
                Vec::new()
            }
        }
    }

    pub async fn try_query(&self, filter: &ReleaseFilter) -> Result<Vec<ReleaseEntry>, CatalogError> {
        let cache = &self.ctx.cache;
        let key = cache.build_key(registry::RELEASES, &filter.key_params()).await;
        let ttl = cache.config().query_ttl();
        cache
            .try_get_or_set(&key, ttl, || self.fetch(filter))
            .await
    }

    /// Releases grouped into calendar periods.
    pub async fn calendar(&self, filter: &ReleaseFilter) -> Vec<ReleaseGroup> {
        group_by_period(self.query(filter).await)
    }

    async fn fetch(&self, filter: &ReleaseFilter) -> Result<Vec<ReleaseEntry>, CatalogError> {
        let started = Instant::now();
        let query = DataQuery::new(filter.expression(), filter.limit)
            .sorted(SortDirective {
                property: Property::ReleaseDate,
                order: SortOrder::Asc,
            })
            .project(PROJECTIONS);
        let rows = self.ctx.store.query(&query).await?;

        let mappings = self.ctx.directory.mappings().await;
        let fetched = rows.len();
        let releases = dedupe_releases(
            rows.iter()
                .map(|row| release_entry(row, &self.ctx, &mappings))
                .collect(),
        );

        metrics::histogram!(METRIC_QUERY_MS, "entity" => "releases")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(fetched, releases = releases.len(), "Release window fetched");
        Ok(releases)
    }
}

fn release_entry(
    row: &PropertyRow,
    ctx: &CatalogContext,
    mappings: &HashMap<String, String>,
) -> ReleaseEntry {
    let game = row.page(Property::Games);
    let title = row
        .text(Property::Name)
        .or(game.map(|game| game.fulltext.as_str()))
        .unwrap_or_default()
        .to_string();
    ReleaseEntry {
        title,
        url: game.map(|game| game.url.clone()),
        text: game.map(|game| game.title().to_string()),
        release: row.date(Property::ReleaseDate).map(|(raw, timestamp)| {
            release_date_fields(raw, timestamp, row.text(Property::ReleaseDateType))
        }),
        platforms: platform_links(row, mappings),
        region: row.text(Property::Region).map(str::to_string),
        image: ctx.images.structured_image(row, Property::Image),
    }
}

/// Drop releases repeating an earlier (title, date, region, platforms) combination.
///
/// Platform order does not matter.
pub fn dedupe_releases(releases: Vec<ReleaseEntry>) -> Vec<ReleaseEntry> {
    let mut seen = HashSet::new();
    releases
        .into_iter()
        .filter(|release| {
            let mut platforms: Vec<&str> = release
                .platforms
                .iter()
                .map(|platform| platform.title.as_str())
                .collect();
            platforms.sort_unstable();
            let key = (
                release.title.clone(),
                release
                    .release
                    .as_ref()
                    .map(|fields| fields.release_date.clone())
                    .unwrap_or_default(),
                release.region.clone().unwrap_or_default(),
                platforms.join("|"),
            );
            seen.insert(key)
        })
        .collect()
}

/// Group releases by calendar period, earliest period first.
///
/// Releases without a timestamp are left out. Within a group, input order is kept.
pub fn group_by_period(releases: Vec<ReleaseEntry>) -> Vec<ReleaseGroup> {
    let mut groups: Vec<ReleaseGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for release in releases {
        let Some(bucket) = release.release.as_ref().and_then(|fields| {
            fields
                .release_date_timestamp
                .and_then(|timestamp| period_bucket(timestamp, fields.date_specificity))
        }) else {
            continue;
        };
        match index.get(&bucket.key) {
            Some(&position) => groups[position].releases.push(release),
            None => {
                index.insert(bucket.key, groups.len());
                groups.push(ReleaseGroup {
                    label: bucket.label,
                    sort_key: bucket.sort_key,
                    releases: vec![release],
                });
            }
        }
    }

    groups.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    groups
}

#[cfg(test)]
mod tests {
    use gamedex_types::{DateSpecificity, PlatformLink};
    use time::macros::date;

    use super::*;

    fn link(title: &str) -> PlatformLink {
        PlatformLink {
            title: title.to_string(),
            url: format!("/wiki/Platforms/{title}"),
            abbrev: title.to_string(),
        }
    }

    fn release(title: &str, timestamp: Option<i64>, date_type: &str, platforms: &[&str]) -> ReleaseEntry {
        ReleaseEntry {
            title: title.to_string(),
            url: None,
            text: None,
            release: Some(release_date_fields("raw", timestamp, Some(date_type))),
            platforms: platforms.iter().map(|title| link(title)).collect(),
            region: Some("United States".to_string()),
            image: None,
        }
    }

    #[test]
    fn window_end_clamps_to_month_length() {
        assert_eq!(one_month_after(date!(2024 - 01 - 31)), date!(2024 - 02 - 29));
        assert_eq!(one_month_after(date!(2025 - 01 - 31)), date!(2025 - 02 - 28));
        assert_eq!(one_month_after(date!(2024 - 12 - 15)), date!(2025 - 01 - 15));
    }

    #[test]
    fn filter_expression_covers_window_and_options() {
        let filter = ReleaseFilter::new(date!(2024 - 12 - 20))
            .with_region("United States")
            .with_platform("Platforms/PC");
        let expression = filter.expression();
        assert!(expression.category.is_none());
        assert!(expression.conditions.contains(&Condition::GreaterThan(
            Property::ReleaseDate,
            "2024-12-20".to_string()
        )));
        assert!(expression.conditions.contains(&Condition::LessThan(
            Property::ReleaseDate,
            "2025-01-20".to_string()
        )));
        assert!(expression.conditions.contains(&Condition::Equals(
            Property::Region,
            "United States".to_string()
        )));
        assert!(expression.conditions.contains(&Condition::Equals(
            Property::Platforms,
            "Platforms/PC".to_string()
        )));
    }

    #[test]
    fn blank_options_are_ignored() {
        let filter = ReleaseFilter::new(date!(2024 - 12 - 20))
            .with_region("  ")
            .with_platform("[[]]");
        assert_eq!(filter.region, None);
        assert_eq!(filter.platform, None);
        assert_eq!(filter.expression().conditions.len(), 4);
    }

    #[test]
    fn dedupe_ignores_platform_order() {
        let releases = vec![
            release("Halo", Some(1_735_084_800), "Full", &["PC", "Xbox Series X"]),
            release("Halo", Some(1_735_084_800), "Full", &["Xbox Series X", "PC"]),
            release("Halo", Some(1_735_084_800), "Full", &["PC"]),
        ];
        let deduped = dedupe_releases(releases);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].platforms[0].title, "PC");
        assert_eq!(deduped[1].platforms.len(), 1);
    }

    #[test]
    fn groups_are_chronological_and_skip_undated() {
        let releases = vec![
            // 2025-01-15, month precision
            release("Later", Some(1_736_899_200), "Month", &[]),
            // 2024-12-25 and 2024-12-27, same week
            release("Halo", Some(1_735_084_800), "Full", &[]),
            release("Portal", Some(1_735_257_600), "Full", &[]),
            release("Undated", None, "Full", &[]),
        ];
        let groups = group_by_period(releases);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "December 22, 2024 - December 28, 2024");
        assert_eq!(groups[0].sort_key, "20241222");
        let titles: Vec<_> = groups[0].releases.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Halo", "Portal"]);
        assert_eq!(groups[1].label, "January 2025");
        assert_eq!(groups[1].sort_key, "20250100");
        assert_eq!(
            groups[1].releases[0].release.as_ref().map(|r| r.date_specificity),
            Some(DateSpecificity::Month)
        );
    }
}
