use std::collections::BTreeSet;

use crate::dates::YearMonth;
use crate::models::{FilterCriteria, LeadRecord, OwnerFilter, StatusFilter, NOT_SET};
use crate::table::{Row, Table};

pub fn filter_leads(leads: &[LeadRecord], criteria: &FilterCriteria) -> Vec<LeadRecord> {
    leads
        .iter()
        .filter(|lead| matches(lead, criteria))
        .cloned()
        .collect()
}

pub fn matches(lead: &LeadRecord, criteria: &FilterCriteria) -> bool {
    matches_source(lead, &criteria.sources)
        && matches_owner(lead, &criteria.owner)
        && matches_status(lead, &criteria.status)
        && matches_date(lead, criteria)
}

fn matches_source(lead: &LeadRecord, sources: &BTreeSet<String>) -> bool {
    if sources.is_empty() {
        return true;
    }
    lead.source
        .as_ref()
        .is_some_and(|source| sources.contains(source))
}

fn matches_owner(lead: &LeadRecord, owner: &OwnerFilter) -> bool {
    match owner {
        OwnerFilter::All => true,
        OwnerFilter::Named(name) => lead.owner_name() == Some(name.as_str()),
    }
}

fn matches_status(lead: &LeadRecord, status: &StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::NotSet => lead.status.is_none(),
        StatusFilter::Exact(value) => lead.status.as_deref() == Some(value.as_str()),
    }
}

// Fails closed: with a bound active, an undated lead never passes.
fn matches_date(lead: &LeadRecord, criteria: &FilterCriteria) -> bool {
    if !criteria.date_range.is_active() {
        return true;
    }
    lead.created_date()
        .is_some_and(|date| criteria.date_range.contains(date))
}

pub fn owner_options(leads: &[LeadRecord], allowed_emails: &[String]) -> Vec<String> {
    let owners: BTreeSet<String> = leads
        .iter()
        .filter_map(|lead| lead.owner.as_ref())
        .filter_map(|owner| match (&owner.name, &owner.email) {
            (Some(name), Some(email)) => Some((name, email)),
            _ => None,
        })
        .filter(|(_, email)| {
            allowed_emails.is_empty()
                || allowed_emails
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(email))
        })
        .map(|(name, _)| name.clone())
        .collect();
    owners.into_iter().collect()
}

pub fn status_options(leads: &[LeadRecord]) -> Vec<String> {
    let statuses: BTreeSet<String> = leads
        .iter()
        .map(|lead| lead.status_label().to_string())
        .collect();
    statuses.into_iter().collect()
}

// An empty selection keeps everything, undated rows included.
pub fn filter_rows_by_month(table: &Table, date_column: &str, months: &BTreeSet<YearMonth>) -> Table {
    if months.is_empty() {
        return table.clone();
    }
    let Some(index) = table.column_index(date_column) else {
        return table.with_rows(Vec::new());
    };

    let rows: Vec<Row> = table
        .rows
        .iter()
        .filter(|row| {
            Table::date_at(row, index)
                .is_some_and(|date| months.contains(&YearMonth::from_date(date)))
        })
        .cloned()
        .collect();
    table.with_rows(rows)
}

pub fn filter_rows_by_value(table: &Table, column: &str, value: &str) -> Table {
    let Some(index) = table.column_index(column) else {
        return table.with_rows(Vec::new());
    };

    let rows: Vec<Row> = table
        .rows
        .iter()
        .filter(|row| {
            let cell = row.get(index).map(|cell| cell.trim()).unwrap_or("");
            if value == NOT_SET {
                cell.is_empty()
            } else {
                cell == value
            }
        })
        .cloned()
        .collect();
    table.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_timestamp, DateRange};
    use crate::models::Owner;
    use chrono::NaiveDate;

    fn lead(source: Option<&str>, status: Option<&str>, owner: Option<&str>, created: Option<&str>) -> LeadRecord {
        LeadRecord {
            source: source.map(str::to_string),
            status: status.map(str::to_string),
            owner: owner.map(|name| Owner {
                name: Some(name.to_string()),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                id: None,
            }),
            created_raw: created.map(str::to_string),
            created_at: created.and_then(parse_timestamp),
            ..LeadRecord::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<LeadRecord> {
        vec![
            lead(Some("Google Ads 2025"), None, Some("Rejna"), Some("2024-01-15T10:00:00Z")),
            lead(Some("Google Ads 2025"), Some("New"), Some("Saurav"), Some("2024-02-01T00:00:01Z")),
            lead(Some("Whatsapp Marketing"), Some("New"), None, Some("not a date")),
            lead(None, Some("Contacted"), Some("Rejna"), None),
        ]
    }

    fn criteria_with_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> FilterCriteria {
        FilterCriteria {
            date_range: DateRange::new(start, end),
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn unconstrained_criteria_keep_everything() {
        let leads = sample();
        assert_eq!(filter_leads(&leads, &FilterCriteria::default()), leads);
    }

    #[test]
    fn filtering_is_idempotent() {
        let leads = sample();
        let criteria = FilterCriteria {
            sources: ["Google Ads 2025".to_string()].into(),
            status: StatusFilter::Exact("New".to_string()),
            ..FilterCriteria::default()
        };
        let once = filter_leads(&leads, &criteria);
        assert_eq!(filter_leads(&once, &criteria), once);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn empty_source_selection_is_unconstrained() {
        let leads = sample();
        let criteria = FilterCriteria {
            sources: BTreeSet::new(),
            ..FilterCriteria::default()
        };
        assert_eq!(filter_leads(&leads, &criteria).len(), leads.len());
    }

    #[test]
    fn source_filter_skips_leads_without_source() {
        let criteria = FilterCriteria {
            sources: ["Google Ads 2025".to_string(), "Whatsapp Marketing".to_string()].into(),
            ..FilterCriteria::default()
        };
        let filtered = filter_leads(&sample(), &criteria);
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|lead| lead.source.is_some()));
    }

    #[test]
    fn owner_filter_needs_an_exact_owner_name() {
        let criteria = FilterCriteria {
            owner: OwnerFilter::Named("Rejna".to_string()),
            ..FilterCriteria::default()
        };
        let filtered = filter_leads(&sample(), &criteria);
        assert_eq!(filtered.len(), 2);

        let lowercase = FilterCriteria {
            owner: OwnerFilter::Named("rejna".to_string()),
            ..FilterCriteria::default()
        };
        assert!(filter_leads(&sample(), &lowercase).is_empty());
    }

    #[test]
    fn not_set_status_selects_only_missing_statuses() {
        let criteria = FilterCriteria {
            status: StatusFilter::parse("Not Set"),
            ..FilterCriteria::default()
        };
        let filtered = filter_leads(&sample(), &criteria);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].status.is_none());
    }

    #[test]
    fn status_match_is_case_sensitive() {
        let criteria = FilterCriteria {
            status: StatusFilter::parse("new"),
            ..FilterCriteria::default()
        };
        assert!(filter_leads(&sample(), &criteria).is_empty());
    }

    #[test]
    fn date_range_is_inclusive_and_fails_closed() {
        let criteria = criteria_with_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
        let filtered = filter_leads(&sample(), &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].created_raw.as_deref(), Some("2024-01-15T10:00:00Z"));
    }

    #[test]
    fn date_boundaries_include_exact_days_only() {
        let leads = vec![
            lead(None, None, None, Some("2024-01-01T00:00:00Z")),
            lead(None, None, None, Some("2024-01-31T23:59:59Z")),
            lead(None, None, None, Some("2023-12-31T23:59:59Z")),
        ];
        let criteria = criteria_with_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
        assert_eq!(filter_leads(&leads, &criteria).len(), 2);
    }

    #[test]
    fn single_bound_ranges_compare_against_that_bound() {
        let after = criteria_with_range(Some(date(2024, 2, 1)), None);
        assert_eq!(filter_leads(&sample(), &after).len(), 1);

        let before = criteria_with_range(None, Some(date(2024, 1, 31)));
        assert_eq!(filter_leads(&sample(), &before).len(), 1);
    }

    #[test]
    fn predicates_combine_conjunctively() {
        let criteria = FilterCriteria {
            sources: ["Google Ads 2025".to_string()].into(),
            owner: OwnerFilter::Named("Saurav".to_string()),
            status: StatusFilter::Exact("New".to_string()),
            date_range: DateRange::new(Some(date(2024, 2, 1)), Some(date(2024, 2, 1))),
        };
        assert_eq!(filter_leads(&sample(), &criteria).len(), 1);
    }

    #[test]
    fn owner_options_respect_allow_list() {
        let leads = sample();
        assert_eq!(owner_options(&leads, &[]), vec!["Rejna", "Saurav"]);
        assert_eq!(
            owner_options(&leads, &["SAURAV@example.com".to_string()]),
            vec!["Saurav"]
        );
    }

    #[test]
    fn status_options_include_not_set() {
        assert_eq!(status_options(&sample()), vec!["Contacted", "New", "Not Set"]);
    }

    fn sheet() -> Table {
        Table::from_values(
            [
                ["Date", "Outcome"],
                ["2024-12-30", "Booked"],
                ["2025-01-02", ""],
                ["garbage", "Booked"],
                ["2025-02-10", "Lost"],
            ]
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
        )
    }

    #[test]
    fn month_selection_keeps_matching_rows() {
        let table = sheet();
        let months: BTreeSet<YearMonth> = [
            "2024-12".parse::<YearMonth>().unwrap(),
            "2025-01".parse::<YearMonth>().unwrap(),
        ]
        .into();
        let filtered = filter_rows_by_month(&table, "Date", &months);
        assert_eq!(filtered.rows.len(), 2);

        assert_eq!(filter_rows_by_month(&table, "Date", &BTreeSet::new()).rows.len(), 4);
        assert!(filter_rows_by_month(&table, "Missing", &months).is_empty());
    }

    #[test]
    fn value_filter_matches_exact_cells() {
        let table = sheet();
        assert_eq!(filter_rows_by_value(&table, "Outcome", "Booked").rows.len(), 2);
        assert_eq!(filter_rows_by_value(&table, "Outcome", NOT_SET).rows.len(), 1);
        assert!(filter_rows_by_value(&table, "Nope", "Booked").is_empty());
    }
}
