//! Release date formatting and period bucketing.
//!
//! Timestamps from the property store are Unix seconds and are interpreted in UTC. The date
//! type property ("Full", "Month", "Quarter", "Year", "None") controls how much of the date is
//! shown and which bucket a release lands in.

use gamedex_types::{DateSpecificity, ReleaseDateFields};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

pub const HUMAN_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_LABEL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long] [year]");
const MONTH_KEY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month padding:zero]");
const COMPACT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month padding:zero][day padding:zero]");
const COMPACT_MONTH_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month padding:zero]");

/// Parse the date type property. Absent values default to full precision, as do unknown ones.
pub fn parse_specificity(date_type: Option<&str>) -> DateSpecificity {
    let Some(value) = date_type.map(str::trim).filter(|value| !value.is_empty()) else {
        return DateSpecificity::Full;
    };
    match value.to_ascii_lowercase().as_str() {
        "month" => DateSpecificity::Month,
        "quarter" => DateSpecificity::Quarter,
        "year" => DateSpecificity::Year,
        "none" => DateSpecificity::None,
        _ => DateSpecificity::Full,
    }
}

fn utc_date(timestamp: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .map(OffsetDateTime::date)
}

fn render(date: Date, format: &[BorrowedFormatItem<'_>]) -> String {
    date.format(format).unwrap_or_else(|_| date.to_string())
}

fn quarter(date: Date) -> u8 {
    (u8::from(date.month()) + 2) / 3
}

/// Display form of a release date.
///
/// Without a timestamp, or when the date type is "None", the raw store value is returned
/// unchanged.
pub fn format_release_date(
    raw: &str,
    timestamp: Option<i64>,
    specificity: DateSpecificity,
) -> String {
    let Some(date) = timestamp.and_then(utc_date) else {
        return raw.to_string();
    };
    match specificity {
        DateSpecificity::None => raw.to_string(),
        DateSpecificity::Year => date.year().to_string(),
        DateSpecificity::Month => render(date, MONTH_LABEL_FORMAT),
        DateSpecificity::Quarter => format!("Q{} {}", quarter(date), date.year()),
        DateSpecificity::Full => render(date, HUMAN_DATE_FORMAT),
    }
}

/// Collect the release date fields of a row.
pub fn release_date_fields(
    raw: &str,
    timestamp: Option<i64>,
    date_type: Option<&str>,
) -> ReleaseDateFields {
    let specificity = parse_specificity(date_type);
    ReleaseDateFields {
        release_date: raw.to_string(),
        release_date_timestamp: timestamp,
        date_specificity: specificity,
        release_date_formatted: format_release_date(raw, timestamp, specificity),
    }
}

pub fn release_year(timestamp: i64) -> Option<i32> {
    utc_date(timestamp).map(Date::year)
}

/// Calendar bucket a release is grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodBucket {
    /// Grouping identity, e.g. `2024-52` or `2024-Q1`.
    pub key: String,
    pub label: String,
    /// Zero-padded key whose string order is chronological.
    pub sort_key: String,
}

/// Bucket for a release at `timestamp`.
///
/// Full dates group by the Sunday-to-Saturday week containing them, month and quarter dates by
/// their month or quarter, and anything coarser by year.
pub fn period_bucket(timestamp: i64, specificity: DateSpecificity) -> Option<PeriodBucket> {
    let date = utc_date(timestamp)?;
    let bucket = match specificity {
        DateSpecificity::Full => {
            let offset = i64::from(date.weekday().number_days_from_sunday());
            let start = date.checked_sub(Duration::days(offset))?;
            let end = start.checked_add(Duration::days(6))?;
            PeriodBucket {
                key: format!("{}-{:02}", start.year(), start.iso_week()),
                label: format!(
                    "{} - {}",
                    render(start, HUMAN_DATE_FORMAT),
                    render(end, HUMAN_DATE_FORMAT)
                ),
                sort_key: render(start, COMPACT_DATE_FORMAT),
            }
        }
        DateSpecificity::Month => PeriodBucket {
            key: render(date, MONTH_KEY_FORMAT),
            label: render(date, MONTH_LABEL_FORMAT),
            sort_key: format!("{}00", render(date, COMPACT_MONTH_FORMAT)),
        },
        DateSpecificity::Quarter => {
            let quarter = quarter(date);
            PeriodBucket {
                key: format!("{}-Q{quarter}", date.year()),
                label: format!("Q{quarter} {}", date.year()),
                sort_key: format!("{}0{quarter}", date.year()),
            }
        }
        DateSpecificity::Year | DateSpecificity::None => PeriodBucket {
            key: date.year().to_string(),
            label: date.year().to_string(),
            sort_key: format!("{}0000", date.year()),
        },
    };
    Some(bucket)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn ts(value: OffsetDateTime) -> i64 {
        value.unix_timestamp()
    }

    #[test]
    fn specificity_parsing_defaults_to_full() {
        assert_eq!(parse_specificity(None), DateSpecificity::Full);
        assert_eq!(parse_specificity(Some("")), DateSpecificity::Full);
        assert_eq!(parse_specificity(Some("Month")), DateSpecificity::Month);
        assert_eq!(parse_specificity(Some("quarter")), DateSpecificity::Quarter);
        assert_eq!(parse_specificity(Some("None")), DateSpecificity::None);
        assert_eq!(parse_specificity(Some("Decade")), DateSpecificity::Full);
    }

    #[test]
    fn formats_by_specificity() {
        let christmas = ts(datetime!(2024-12-25 0:00 UTC));
        assert_eq!(
            format_release_date("12/25/2024", Some(christmas), DateSpecificity::Full),
            "December 25, 2024"
        );
        assert_eq!(
            format_release_date("11/2020", Some(ts(datetime!(2020-11-01 0:00 UTC))), DateSpecificity::Month),
            "November 2020"
        );
        assert_eq!(
            format_release_date("Q1 2024", Some(ts(datetime!(2024-02-15 0:00 UTC))), DateSpecificity::Quarter),
            "Q1 2024"
        );
        assert_eq!(
            format_release_date("2025", Some(ts(datetime!(2025-01-01 0:00 UTC))), DateSpecificity::Year),
            "2025"
        );
    }

    #[test]
    fn raw_value_passes_through_without_timestamp_or_for_none() {
        assert_eq!(
            format_release_date("TBA", None, DateSpecificity::Full),
            "TBA"
        );
        let christmas = ts(datetime!(2024-12-25 0:00 UTC));
        assert_eq!(
            format_release_date("Holiday 2024", Some(christmas), DateSpecificity::None),
            "Holiday 2024"
        );
    }

    #[test]
    fn release_fields_carry_lowercase_specificity() {
        let fields = release_date_fields(
            "10/2003",
            Some(ts(datetime!(2003-10-01 0:00 UTC))),
            Some("Month"),
        );
        assert_eq!(fields.date_specificity, DateSpecificity::Month);
        assert_eq!(fields.release_date_formatted, "October 2003");
        let json = serde_json::to_value(&fields).expect("serialize");
        assert_eq!(json["dateSpecificity"], "month");
    }

    #[test]
    fn full_dates_bucket_by_sunday_week() {
        let christmas = period_bucket(ts(datetime!(2024-12-25 15:30 UTC)), DateSpecificity::Full)
            .expect("bucket");
        let saturday = period_bucket(ts(datetime!(2024-12-28 0:00 UTC)), DateSpecificity::Full)
            .expect("bucket");
        let sunday = period_bucket(ts(datetime!(2024-12-22 0:00 UTC)), DateSpecificity::Full)
            .expect("bucket");

        assert_eq!(christmas.label, "December 22, 2024 - December 28, 2024");
        assert_eq!(christmas.sort_key, "20241222");
        assert_eq!(christmas.key, "2024-51");
        assert_eq!(christmas, saturday);
        assert_eq!(christmas, sunday);

        let next = period_bucket(ts(datetime!(2024-12-29 0:00 UTC)), DateSpecificity::Full)
            .expect("bucket");
        assert_ne!(christmas.key, next.key);
        assert_eq!(next.label, "December 29, 2024 - January 4, 2025");
    }

    #[test]
    fn coarser_buckets() {
        let ts = ts(datetime!(2024-12-05 0:00 UTC));
        let month = period_bucket(ts, DateSpecificity::Month).expect("bucket");
        assert_eq!(month.key, "2024-12");
        assert_eq!(month.label, "December 2024");
        assert_eq!(month.sort_key, "20241200");

        let quarter = period_bucket(ts, DateSpecificity::Quarter).expect("bucket");
        assert_eq!(quarter.key, "2024-Q4");
        assert_eq!(quarter.label, "Q4 2024");
        assert_eq!(quarter.sort_key, "202404");

        let year = period_bucket(ts, DateSpecificity::Year).expect("bucket");
        assert_eq!(year.key, "2024");
        assert_eq!(year.sort_key, "20240000");
    }

    #[test]
    fn release_year_uses_utc() {
        assert_eq!(release_year(ts(datetime!(1986-01-01 0:00 UTC))), Some(1986));
    }
}
