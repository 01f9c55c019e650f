use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// Day-first wins over month-first for ambiguous slash dates.
const CELL_DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

// Zone-less timestamps and bare dates are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_local_timezone(utc).single();
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive.and_local_timezone(utc).single())
}

pub fn parse_cell_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(timestamp) = parse_timestamp(raw) {
        return Some(timestamp.date_naive());
    }

    CELL_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (Some(from), Some(to)) if from > to => Self {
                start: Some(to),
                end: Some(to),
            },
            _ => Self { start, end },
        }
    }

    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start == end => write!(f, "{}", start.format("%B %d, %Y")),
            (Some(start), Some(end)) => write!(
                f,
                "{} to {}",
                start.format("%B %d, %Y"),
                end.format("%B %d, %Y")
            ),
            (Some(start), None) => write!(f, "from {}", start.format("%B %d, %Y")),
            (None, Some(end)) => write!(f, "until {}", end.format("%B %d, %Y")),
            (None, None) => write!(f, "All time"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DatePreset {
    #[default]
    Custom,
    Today,
    Yesterday,
    #[value(name = "last-7-days")]
    Last7Days,
    #[value(name = "last-30-days")]
    Last30Days,
    #[value(name = "last-90-days")]
    Last90Days,
    ThisMonth,
    LastMonth,
    AllTime,
}

impl DatePreset {
    pub fn resolve(
        self,
        today: NaiveDate,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DateRange {
        let between = |start: NaiveDate, end: NaiveDate| DateRange::new(Some(start), Some(end));
        match self {
            Self::Today => between(today, today),
            Self::Yesterday => {
                let yesterday = today - Duration::days(1);
                between(yesterday, yesterday)
            }
            Self::Last7Days => between(today - Duration::days(7), today),
            Self::Last30Days => between(today - Duration::days(30), today),
            Self::Last90Days => between(today - Duration::days(90), today),
            Self::ThisMonth => between(first_of_month(today), today),
            Self::LastMonth => {
                let last_day = first_of_month(today) - Duration::days(1);
                between(first_of_month(last_day), last_day)
            }
            Self::AllTime => DateRange::all_time(),
            Self::Custom => DateRange::new(
                Some(from.unwrap_or(today - Duration::days(7))),
                Some(to.unwrap_or(today)),
            ),
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn today_local() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|date| date.format("%B %y").to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, month) = value
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got `{value}`"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in `{value}`"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in `{value}`"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in `{value}`"));
        }
        Ok(Self { year, month })
    }
}
