use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::YearMonth;
use crate::models::{
    CategoryCount, LeadRecord, MonthBucket, Scoreboard, TimeSeries, TimeSeriesRow, KNOWN_SOURCES,
    NOT_SET,
};
use crate::table::{ColumnKind, Table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum LeadDimension {
    #[default]
    Source,
    Status,
    Owner,
}

impl LeadDimension {
    fn category(self, lead: &LeadRecord) -> Option<String> {
        match self {
            Self::Source => lead.source.clone(),
            Self::Status => Some(lead.status_label().to_string()),
            Self::Owner => lead.owner_name().map(str::to_string),
        }
    }
}

pub fn scoreboard(leads: &[LeadRecord]) -> Scoreboard {
    let sources = KNOWN_SOURCES
        .iter()
        .map(|known| CategoryCount {
            category: known.to_string(),
            count: leads
                .iter()
                .filter(|lead| lead.source.as_deref() == Some(*known))
                .count(),
        })
        .collect();

    Scoreboard {
        total: leads.len(),
        sources,
        statuses: status_counts(leads),
    }
}

pub fn status_counts(leads: &[LeadRecord]) -> Vec<CategoryCount> {
    ranked_counts(leads.iter().map(|lead| lead.status_label()))
}

pub fn source_distribution(leads: &[LeadRecord]) -> Vec<CategoryCount> {
    ranked_counts(leads.iter().filter_map(|lead| lead.source.as_deref()))
}

// Stable sort: ties keep first-seen order.
pub fn ranked_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&position) => counts[position].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(CategoryCount {
                    category: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

// Dense grid: every date carries a count for every category.
pub fn time_series(leads: &[LeadRecord], dimension: LeadDimension) -> TimeSeries {
    dense_grid(leads.iter().filter_map(|lead| {
        let date = lead.created_date()?;
        let category = dimension.category(lead)?;
        Some((date, category))
    }))
}

fn dense_grid(points: impl Iterator<Item = (NaiveDate, String)>) -> TimeSeries {
    let mut cells: BTreeMap<NaiveDate, HashMap<String, usize>> = BTreeMap::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();

    for (date, category) in points {
        *cells
            .entry(date)
            .or_default()
            .entry(category.clone())
            .or_insert(0) += 1;
        categories.insert(category);
    }

    let categories: Vec<String> = categories.into_iter().collect();
    let rows = cells
        .into_iter()
        .map(|(date, per_category)| TimeSeriesRow {
            date,
            counts: categories
                .iter()
                .map(|category| per_category.get(category).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    TimeSeries { categories, rows }
}

pub fn month_buckets(table: &Table, date_column: &str) -> Vec<MonthBucket> {
    let Some(date_index) = table.column_index(date_column) else {
        return Vec::new();
    };
    let numeric: Vec<(usize, &str)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.kind == ColumnKind::Numeric)
        .map(|(index, column)| (index, column.name.as_str()))
        .collect();

    let mut buckets: BTreeMap<YearMonth, (usize, Vec<f64>)> = BTreeMap::new();
    for row in &table.rows {
        let Some(date) = Table::date_at(row, date_index) else {
            continue;
        };
        let entry = buckets
            .entry(YearMonth::from_date(date))
            .or_insert_with(|| (0, vec![0.0; numeric.len()]));
        entry.0 += 1;
        for (slot, (index, _)) in numeric.iter().enumerate() {
            entry.1[slot] += Table::number_at(row, *index).unwrap_or(0.0);
        }
    }

    buckets
        .into_iter()
        .map(|(month, (rows, sums))| MonthBucket {
            label: month.label(),
            month,
            rows,
            totals: numeric
                .iter()
                .map(|(_, name)| name.to_string())
                .zip(sums)
                .collect(),
        })
        .collect()
}

pub fn available_months(table: &Table, date_column: &str) -> Vec<YearMonth> {
    month_buckets(table, date_column)
        .into_iter()
        .map(|bucket| bucket.month)
        .collect()
}

pub fn column_counts(table: &Table, column: &str) -> Vec<CategoryCount> {
    let Some(index) = table.column_index(column) else {
        return Vec::new();
    };
    ranked_counts(table.rows.iter().map(|row| {
        let cell = row.get(index).map(|cell| cell.trim()).unwrap_or("");
        if cell.is_empty() {
            NOT_SET
        } else {
            cell
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_timestamp;

    fn lead(source: Option<&str>, status: Option<&str>, created: Option<&str>) -> LeadRecord {
        LeadRecord {
            source: source.map(str::to_string),
            status: status.map(str::to_string),
            created_raw: created.map(str::to_string),
            created_at: created.and_then(parse_timestamp),
            ..LeadRecord::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn count_at(series: &TimeSeries, day: NaiveDate, category: &str) -> Option<usize> {
        let column = series.categories.iter().position(|c| c == category)?;
        let row = series.rows.iter().find(|row| row.date == day)?;
        row.counts.get(column).copied()
    }

    #[test]
    fn scoreboard_counts_known_sources_and_not_set() {
        let leads = vec![
            lead(Some("Google Ads 2025"), None, None),
            lead(Some("Google Ads 2025"), Some("New"), None),
            lead(Some("Whatsapp Marketing"), Some("New"), None),
        ];
        let board = scoreboard(&leads);

        assert_eq!(board.total, 3);
        assert_eq!(board.source_count("Google Ads 2025"), 2);
        assert_eq!(board.source_count("Whatsapp Marketing"), 1);
        assert_eq!(board.source_count("Form Submission"), 0);
        assert_eq!(board.sources.len(), KNOWN_SOURCES.len());
        assert_eq!(
            board.statuses,
            vec![
                CategoryCount {
                    category: "New".to_string(),
                    count: 2
                },
                CategoryCount {
                    category: NOT_SET.to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn status_buckets_sum_to_total() {
        let leads = vec![
            lead(None, Some("Contacted"), None),
            lead(None, None, None),
            lead(None, Some("Junk Lead"), None),
            lead(None, None, None),
        ];
        let board = scoreboard(&leads);
        let sum: usize = board.statuses.iter().map(|entry| entry.count).sum();
        assert_eq!(sum, board.total);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let ranked = ranked_counts(["Lost", "Qualified", "Qualified", "Lost", "New"].into_iter());
        let order: Vec<&str> = ranked.iter().map(|entry| entry.category.as_str()).collect();
        assert_eq!(order, vec!["Lost", "Qualified", "New"]);
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let board = scoreboard(&[]);
        assert_eq!(board.total, 0);
        assert!(board.sources.iter().all(|entry| entry.count == 0));
        assert!(board.statuses.is_empty());
        assert_eq!(time_series(&[], LeadDimension::Source), TimeSeries::default());
    }

    #[test]
    fn source_distribution_omits_missing_sources() {
        let leads = vec![
            lead(Some("Referral"), None, None),
            lead(None, None, None),
            lead(Some("Google Ads 2025"), None, None),
            lead(Some("Google Ads 2025"), None, None),
        ];
        let distribution = source_distribution(&leads);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].category, "Google Ads 2025");
        assert_eq!(distribution[0].count, 2);
    }

    #[test]
    fn time_series_is_dense_and_zero_filled() {
        let sources = ["Form Submission", "Google Ads 2025", "Whatsapp Marketing"];
        let days = [
            "2025-01-01T09:00:00Z",
            "2025-01-02T09:00:00Z",
            "2025-01-03T09:00:00Z",
            "2025-01-04T09:00:00Z",
            "2025-01-05T09:00:00Z",
        ];
        let mut leads = Vec::new();
        for i in 0..200 {
            // Whatsapp only ever lands on the first day.
            let source = if i % 7 == 0 { sources[2] } else { sources[i % 2] };
            let day = if source == sources[2] { days[0] } else { days[i % 5] };
            leads.push(lead(Some(source), None, Some(day)));
        }

        let series = time_series(&leads, LeadDimension::Source);
        assert_eq!(series.rows.len(), 5);
        assert_eq!(series.categories, sources.to_vec());
        assert!(series.rows.iter().all(|row| row.counts.len() == 3));
        assert_eq!(count_at(&series, date(2025, 1, 3), "Whatsapp Marketing"), Some(0));

        let total: usize = series.rows.iter().flat_map(|row| row.counts.iter()).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn time_series_skips_undated_leads() {
        let leads = vec![
            lead(Some("Self Created"), None, Some("2025-03-01T10:00:00Z")),
            lead(Some("Self Created"), None, Some("garbled")),
            lead(Some("Self Created"), None, None),
        ];
        let series = time_series(&leads, LeadDimension::Source);
        assert_eq!(series.rows.len(), 1);
        assert_eq!(count_at(&series, date(2025, 3, 1), "Self Created"), Some(1));
        assert_eq!(scoreboard(&leads).total, 3);
    }

    #[test]
    fn status_dimension_buckets_missing_status() {
        let leads = vec![
            lead(None, None, Some("2025-03-01T10:00:00Z")),
            lead(None, Some("New"), Some("2025-03-02T10:00:00Z")),
        ];
        let series = time_series(&leads, LeadDimension::Status);
        assert_eq!(series.categories, vec!["New", NOT_SET]);
        assert_eq!(count_at(&series, date(2025, 3, 1), NOT_SET), Some(1));
        assert_eq!(count_at(&series, date(2025, 3, 1), "New"), Some(0));
    }

    fn sheet() -> Table {
        Table::from_values(
            [
                ["Date", "Calls", "Outcome"],
                ["2025-01-15", "3", "Booked"],
                ["2024-12-31", "2", ""],
                ["2025-01-02", "5", "Lost"],
                ["2024-12-01", "1,000", "Booked"],
                ["", "9", "Booked"],
            ]
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
        )
    }

    #[test]
    fn month_buckets_sort_chronologically_across_years() {
        let buckets = month_buckets(&sheet(), "Date");
        let labels: Vec<&str> = buckets.iter().map(|bucket| bucket.label.as_str()).collect();
        assert_eq!(labels, vec!["December 24", "January 25"]);
        assert_eq!(buckets[0].rows, 2);
        assert_eq!(buckets[0].totals, vec![("Calls".to_string(), 1002.0)]);
        assert_eq!(buckets[1].totals, vec![("Calls".to_string(), 8.0)]);
        assert_eq!(
            available_months(&sheet(), "Date"),
            vec![buckets[0].month, buckets[1].month]
        );
        assert!(month_buckets(&sheet(), "Missing").is_empty());
    }

    #[test]
    fn column_counts_rank_and_bucket_blanks() {
        let counts = column_counts(&sheet(), "Outcome");
        assert_eq!(counts[0].category, "Booked");
        assert_eq!(counts[0].count, 3);
        assert!(counts.iter().any(|entry| entry.category == NOT_SET && entry.count == 1));
    }
}
