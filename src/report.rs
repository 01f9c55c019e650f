use std::fmt::Write;

use crate::models::{CategoryCount, LeadRecord, TimeSeries};
use crate::session::{LeadView, SheetView};

const TOP_STATUSES: usize = 5;
const TABLE_LIMIT: usize = 50;

pub fn status_icon(status: &str) -> &'static str {
    match status {
        "New" => "🆕",
        "Contacted" => "📞",
        "Qualified" => "✅",
        "Unqualified" => "❌",
        "Converted" => "🎉",
        "Lost" => "💔",
        "Not Contacted" => "📋",
        "Attempting to Contact" => "🔄",
        "Contact in Future" => "📅",
        "Pre-Qualified" => "⭐",
        "Not Qualified" => "🚫",
        "Junk Lead" => "🗑️",
        "Not Set" => "❓",
        _ => "📈",
    }
}

pub fn source_icon(source: &str) -> &'static str {
    match source {
        "Google Ads 2025" => "🔍",
        "Whatsapp Marketing" => "💬",
        "Form Submission" => "📝",
        "Self Created" => "✏️",
        _ => "📂",
    }
}

pub fn build_lead_report(filter_summary: &[String], view: &LeadView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Marketing Leads Dashboard");
    let _ = writeln!(
        output,
        "Snapshot {} fetched {}",
        view.snapshot_id,
        view.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Filter Summary");
    let _ = writeln!(output, "- Total leads found: {}", view.leads.len());
    for line in filter_summary {
        let _ = writeln!(output, "- {line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lead Sources Overview");
    let _ = writeln!(output, "- 🎯 Total Leads: {}", view.scoreboard.total);
    for entry in &view.scoreboard.sources {
        let _ = writeln!(
            output,
            "- {} {}: {}",
            source_icon(&entry.category),
            entry.category,
            entry.count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lead Status Overview");
    if view.scoreboard.statuses.is_empty() {
        let _ = writeln!(output, "No status data available.");
    } else {
        for entry in view.scoreboard.statuses.iter().take(TOP_STATUSES) {
            let _ = writeln!(
                output,
                "- {} {}: {}",
                status_icon(&entry.category),
                entry.category,
                entry.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lead Distribution by Source");
    write_distribution(&mut output, &view.source_distribution, view.leads.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Leads Trend by {:?}", view.trend_by);
    write_trend(&mut output, &view.daily_trend);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Leads Details");
    write_leads_table(&mut output, &view.leads);

    output
}

fn write_distribution(output: &mut String, counts: &[CategoryCount], total: usize) {
    if counts.is_empty() {
        let _ = writeln!(output, "No source data available.");
        return;
    }
    for entry in counts {
        let share = if total == 0 {
            0.0
        } else {
            entry.count as f64 * 100.0 / total as f64
        };
        let _ = writeln!(output, "- {}: {} ({:.1}%)", entry.category, entry.count, share);
    }
}

fn write_trend(output: &mut String, series: &TimeSeries) {
    if series.rows.is_empty() {
        let _ = writeln!(output, "No date data available.");
        return;
    }
    let _ = writeln!(output, "| Date | {} |", series.categories.join(" | "));
    let _ = writeln!(output, "|---|{}", "---|".repeat(series.categories.len()));
    for row in &series.rows {
        let counts: Vec<String> = row.counts.iter().map(usize::to_string).collect();
        let _ = writeln!(output, "| {} | {} |", row.date, counts.join(" | "));
    }
}

fn write_leads_table(output: &mut String, leads: &[LeadRecord]) {
    if leads.is_empty() {
        let _ = writeln!(output, "No leads data available.");
        return;
    }

    let _ = writeln!(output, "Showing {} of {} leads", leads.len().min(TABLE_LIMIT), leads.len());
    let _ = writeln!(output);
    let _ = writeln!(output, "| Name | Email | Phone | Company | Source | Status | Owner | Created |");
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for lead in leads.iter().take(TABLE_LIMIT) {
        let name = lead.display_name();
        let created = match (lead.created_at, lead.created_raw.as_deref()) {
            (Some(at), _) => at.format("%Y-%m-%d %H:%M").to_string(),
            (None, Some(raw)) => raw.to_string(),
            (None, None) => "N/A".to_string(),
        };
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            cell(Some(name.as_str())),
            cell(lead.email.as_deref()),
            cell(lead.phone.as_deref()),
            cell(lead.company.as_deref()),
            cell(lead.source.as_deref()),
            cell(lead.status.as_deref()),
            cell(lead.owner_name()),
            created
        );
    }
}

fn cell(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.replace('|', "\\|"),
        _ => "N/A".to_string(),
    }
}

pub fn build_sheet_report(view: &SheetView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Team Performance: {}", view.member);
    let _ = writeln!(
        output,
        "{} rows across {} columns",
        view.table.rows.len(),
        view.table.columns.len()
    );

    if !view.available_months.is_empty() {
        let labels: Vec<String> = view.available_months.iter().map(|month| month.label()).collect();
        let _ = writeln!(output, "Months available: {}", labels.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Summary");
    match &view.date_column {
        _ if view.table.is_empty() => {
            let _ = writeln!(output, "No rows in this selection.");
        }
        None => {
            let _ = writeln!(output, "No date column found.");
        }
        Some(_) if view.months.is_empty() => {
            let _ = writeln!(output, "No dated rows in this selection.");
        }
        Some(column) => {
            let _ = writeln!(output, "Grouped by `{column}`.");
            let _ = writeln!(output);
            for bucket in &view.months {
                let totals: Vec<String> = bucket
                    .totals
                    .iter()
                    .map(|(name, total)| format!("{name} {total:.2}"))
                    .collect();
                if totals.is_empty() {
                    let _ = writeln!(output, "- {}: {} rows", bucket.label, bucket.rows);
                } else {
                    let _ = writeln!(
                        output,
                        "- {}: {} rows ({})",
                        bucket.label,
                        bucket.rows,
                        totals.join(", ")
                    );
                }
            }
        }
    }

    for summary in &view.categories {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", summary.column);
        for entry in summary.counts.iter().take(10) {
            let _ = writeln!(output, "- {}: {}", entry.category, entry.count);
        }
    }

    output
}
