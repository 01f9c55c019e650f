use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{self, LeadDimension};
use crate::dates::YearMonth;
use crate::error::AdapterResult;
use crate::filter;
use crate::models::{
    CategoryCount, FilterCriteria, LeadRecord, MonthBucket, Scoreboard, SheetCriteria, TimeSeries,
};
use crate::table::{ColumnKind, Table};

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub data: T,
}

impl<T> Snapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            fetched_at: Utc::now(),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Empty,
    Ready(Snapshot<T>),
    Failed(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> LoadState<T> {
    pub fn from_result(result: AdapterResult<T>) -> Self {
        match result {
            Ok(data) => Self::Ready(Snapshot::new(data)),
            Err(error) => Self::Failed(error.to_string()),
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot<T>> {
        match self {
            Self::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberTable {
    pub member: String,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    pub snapshot_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub leads: Vec<LeadRecord>,
    pub scoreboard: Scoreboard,
    pub source_distribution: Vec<CategoryCount>,
    pub trend_by: LeadDimension,
    pub daily_trend: TimeSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub counts: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetView {
    pub member: String,
    pub date_column: Option<String>,
    pub available_months: Vec<YearMonth>,
    pub table: Table,
    pub months: Vec<MonthBucket>,
    pub categories: Vec<ColumnSummary>,
}

#[derive(Debug, Default)]
pub struct DashboardSession {
    pub leads: LoadState<Vec<LeadRecord>>,
    pub sheet: LoadState<MemberTable>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_leads(&mut self, result: AdapterResult<Vec<LeadRecord>>) {
        self.leads = LoadState::from_result(result);
        match &self.leads {
            LoadState::Ready(snapshot) => {
                tracing::info!(snapshot = %snapshot.id, leads = snapshot.data.len(), "lead snapshot replaced")
            }
            LoadState::Failed(reason) => tracing::error!(reason = %reason, "lead refresh failed"),
            LoadState::Empty => {}
        }
    }

    pub fn replace_sheet(&mut self, member: &str, result: AdapterResult<Table>) {
        self.sheet = LoadState::from_result(result.map(|table| MemberTable {
            member: member.to_string(),
            table,
        }));
        match &self.sheet {
            LoadState::Ready(snapshot) => tracing::info!(
                snapshot = %snapshot.id,
                member = %member,
                rows = snapshot.data.table.rows.len(),
                "sheet snapshot replaced"
            ),
            LoadState::Failed(reason) => tracing::error!(member = %member, reason = %reason, "sheet refresh failed"),
            LoadState::Empty => {}
        }
    }

    pub fn lead_view(&self, criteria: &FilterCriteria, trend_by: LeadDimension) -> Option<LeadView> {
        let snapshot = self.leads.snapshot()?;
        let leads = filter::filter_leads(&snapshot.data, criteria);
        tracing::debug!(total = snapshot.data.len(), kept = leads.len(), "leads filtered");

        Some(LeadView {
            snapshot_id: snapshot.id,
            fetched_at: snapshot.fetched_at,
            scoreboard: aggregate::scoreboard(&leads),
            source_distribution: aggregate::source_distribution(&leads),
            trend_by,
            daily_trend: aggregate::time_series(&leads, trend_by),
            leads,
        })
    }

    pub fn owner_options(&self, allowed_emails: &[String]) -> Vec<String> {
        self.leads
            .snapshot()
            .map(|snapshot| filter::owner_options(&snapshot.data, allowed_emails))
            .unwrap_or_default()
    }

    pub fn status_options(&self) -> Vec<String> {
        self.leads
            .snapshot()
            .map(|snapshot| filter::status_options(&snapshot.data))
            .unwrap_or_default()
    }

    pub fn sheet_view(&self, criteria: &SheetCriteria) -> Option<SheetView> {
        let snapshot = self.sheet.snapshot()?;
        let source = &snapshot.data.table;
        let date_column = criteria
            .date_column
            .clone()
            .or_else(|| source.default_date_column().map(str::to_string));

        let available_months = date_column
            .as_deref()
            .map(|column| aggregate::available_months(source, column))
            .unwrap_or_default();

        let mut table = match &date_column {
            Some(column) => filter::filter_rows_by_month(source, column, &criteria.months),
            None if criteria.months.is_empty() => source.clone(),
            None => source.with_rows(Vec::new()),
        };
        if let Some((column, value)) = &criteria.column_match {
            table = filter::filter_rows_by_value(&table, column, value);
        }

        let months = date_column
            .as_deref()
            .map(|column| aggregate::month_buckets(&table, column))
            .unwrap_or_default();
        let categories = table
            .columns_of(ColumnKind::Text)
            .into_iter()
            .map(|column| ColumnSummary {
                column: column.name.clone(),
                counts: aggregate::column_counts(&table, &column.name),
            })
            .collect();

        Some(SheetView {
            member: snapshot.data.member.clone(),
            date_column,
            available_months,
            table,
            months,
            categories,
        })
    }
}
