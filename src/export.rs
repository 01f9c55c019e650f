use std::io::Write;

use chrono::{DateTime, Local};

use crate::models::LeadRecord;
use crate::table::Table;

pub const LEAD_EXPORT_COLUMNS: [&str; 8] = [
    "Name", "Email", "Phone", "Company", "Source", "Status", "Owner", "Created",
];

pub fn write_leads_csv<W: Write>(writer: W, leads: &[LeadRecord]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(LEAD_EXPORT_COLUMNS)?;
    for lead in leads {
        let name = lead.display_name();
        out.write_record([
            name.as_str(),
            lead.email.as_deref().unwrap_or(""),
            lead.phone.as_deref().unwrap_or(""),
            lead.company.as_deref().unwrap_or(""),
            lead.source.as_deref().unwrap_or(""),
            lead.status.as_deref().unwrap_or(""),
            lead.owner_name().unwrap_or(""),
            lead.created_raw.as_deref().unwrap_or(""),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_table_csv<W: Write>(writer: W, table: &Table) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.column_names())?;
    for row in &table.rows {
        out.write_record(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn default_export_name(now: DateTime<Local>) -> String {
    format!("leads_export_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
