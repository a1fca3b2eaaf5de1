use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use time::Date;
use time::macros::format_description;

use crate::domain::error::DomainError;
use crate::domain::filters::{DEFAULT_PAGE_SIZE, FilterSpec};

/// Command-line arguments for the gamedex binary.
#[derive(Debug, Parser)]
#[command(
    name = "gamedex",
    version,
    about = "Faceted catalog queries and cache administration"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GAMEDEX_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List games as JSON.
    Games(FacetListingArgs),
    /// List platforms as JSON.
    Platforms(ListingArgs),
    /// List people as JSON.
    People(FacetListingArgs),
    /// List concepts as JSON.
    Concepts(FacetListingArgs),
    /// List upcoming releases as JSON.
    Releases(ReleasesArgs),
    /// Print the platform dropdown list as JSON.
    #[command(name = "platform-list")]
    PlatformList,
    /// Invalidate cached query results.
    Purge(PurgeArgs),
    /// Apply database migrations.
    Migrate,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the Semantic MediaWiki API endpoint.
    #[arg(long = "store-api-url", value_name = "URL", global = true)]
    pub store_api_url: Option<String>,

    /// Override the wiki base URL used for file links.
    #[arg(long = "wiki-base-url", value_name = "URL", global = true)]
    pub wiki_base_url: Option<String>,

    /// Toggle the query cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ListingArgs {
    /// First letter of the name, or `#` for digits.
    #[arg(long, value_name = "LETTER")]
    pub letter: Option<String>,

    /// Free-text search.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// alphabetical | last_edited | last_created | release_date
    #[arg(long, value_name = "SORT")]
    pub sort: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
}

impl ListingArgs {
    pub fn to_filter(&self) -> Result<FilterSpec, DomainError> {
        let mut filter = FilterSpec::new()
            .page(self.page)
            .page_size(self.page_size);
        if let Some(letter) = self.letter.as_deref() {
            filter = filter.with_letter_str(letter)?;
        }
        if let Some(search) = self.search.as_deref() {
            filter = filter.with_search(search);
        }
        if let Some(sort) = self.sort.as_deref() {
            filter = filter.with_sort_str(sort)?;
        }
        Ok(filter)
    }
}

#[derive(Debug, Args, Clone)]
pub struct FacetListingArgs {
    #[command(flatten)]
    pub listing: ListingArgs,

    /// Facet value (game title for people and concepts, platform name for games). Repeatable.
    #[arg(long = "facet", value_name = "VALUE")]
    pub facets: Vec<String>,

    /// Require every facet value instead of any.
    #[arg(long = "require-all", action = clap::ArgAction::SetTrue)]
    pub require_all: bool,
}

impl FacetListingArgs {
    pub fn to_filter(&self) -> Result<FilterSpec, DomainError> {
        Ok(self
            .listing
            .to_filter()?
            .with_facets(&self.facets)
            .require_all(self.require_all))
    }
}

#[derive(Debug, Args, Clone)]
pub struct ReleasesArgs {
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Platform name, with or without the `Platforms/` prefix.
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Window start as YYYY-MM-DD. Defaults to today (UTC).
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub from: Option<Date>,

    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u32>,

    /// Deduplicate and group releases by calendar period.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub grouped: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PurgeArgs {
    /// Purge every known prefix.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub all: bool,

    /// Purge one prefix. Repeatable.
    #[arg(long = "prefix", value_name = "NAME")]
    pub prefixes: Vec<String>,

    /// Delete one cache key. Repeatable.
    #[arg(long = "key", value_name = "KEY")]
    pub keys: Vec<String>,

    /// List known prefixes with their current versions.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub list: bool,

    /// Drop every entry of the in-process backend.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub clear: bool,
}

impl PurgeArgs {
    pub fn is_empty(&self) -> bool {
        !self.all && self.prefixes.is_empty() && self.keys.is_empty() && !self.list && !self.clear
    }
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
