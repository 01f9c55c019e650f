use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::dates::{DateRange, YearMonth};

pub const NOT_SET: &str = "Not Set";
pub const ALL: &str = "All";

/// Sources the scoreboard always reports, zero-filled when absent.
pub const KNOWN_SOURCES: [&str; 4] = [
    "Google Ads 2025",
    "Whatsapp Marketing",
    "Form Submission",
    "Self Created",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Owner {
    pub name: Option<String>,
    pub email: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadRecord {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub owner: Option<Owner>,
    pub created_raw: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl LeadRecord {
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner.as_ref().and_then(|owner| owner.name.as_deref())
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or(NOT_SET)
    }

    pub fn created_date(&self) -> Option<NaiveDate> {
        self.created_at.map(|at| at.date_naive())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OwnerFilter {
    #[default]
    All,
    Named(String),
}

impl OwnerFilter {
    pub fn parse(value: &str) -> Self {
        if value.is_empty() || value == ALL {
            Self::All
        } else {
            Self::Named(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    NotSet,
    Exact(String),
}

impl StatusFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | ALL => Self::All,
            NOT_SET => Self::NotSet,
            other => Self::Exact(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Empty means no source constraint.
    pub sources: BTreeSet<String>,
    pub owner: OwnerFilter,
    pub status: StatusFilter,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn describe(&self) -> Vec<String> {
        let owner = match &self.owner {
            OwnerFilter::All => ALL.to_string(),
            OwnerFilter::Named(name) => name.clone(),
        };
        let status = match &self.status {
            StatusFilter::All => ALL.to_string(),
            StatusFilter::NotSet => NOT_SET.to_string(),
            StatusFilter::Exact(value) => value.clone(),
        };
        let sources = if self.sources.is_empty() {
            "all sources".to_string()
        } else {
            format!("{} selected", self.sources.len())
        };

        vec![
            format!("Date range: {}", self.date_range),
            format!("Lead owner: {owner}"),
            format!("Lead status: {status}"),
            format!("Sources: {sources}"),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetCriteria {
    pub date_column: Option<String>,
    /// Empty means no month constraint.
    pub months: BTreeSet<YearMonth>,
    pub column_match: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub total: usize,
    pub sources: Vec<CategoryCount>,
    pub statuses: Vec<CategoryCount>,
}

impl Scoreboard {
    pub fn source_count(&self, source: &str) -> usize {
        self.sources
            .iter()
            .find(|entry| entry.category == source)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    /// Aligned with `TimeSeries::categories`.
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub categories: Vec<String>,
    pub rows: Vec<TimeSeriesRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub label: String,
    pub rows: usize,
    pub totals: Vec<(String, f64)>,
}
