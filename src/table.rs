use std::collections::HashSet;
use std::io::Read;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::parse_cell_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Date,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn from_grid(header: Vec<String>, body: Vec<Vec<String>>) -> Self {
        let names = dedupe_headers(header);
        let width = names.len();
        let rows: Vec<Row> = body
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Column {
                kind: infer_kind(rows.iter().map(|row| row[index].as_str())),
                name,
            })
            .collect();

        Self { columns, rows }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let header = reader.headers()?.iter().map(str::to_string).collect();
        let mut body = Vec::new();
        for record in reader.records() {
            let record = record?;
            body.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::from_grid(header, body))
    }

    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut values = values.into_iter();
        match values.next() {
            Some(header) => Self::from_grid(header, values.collect()),
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn columns_of(&self, kind: ColumnKind) -> Vec<&Column> {
        self.columns.iter().filter(|column| column.kind == kind).collect()
    }

    pub fn default_date_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| column.kind == ColumnKind::Date)
            .map(|column| column.name.as_str())
    }

    pub fn date_at(row: &Row, index: usize) -> Option<NaiveDate> {
        row.get(index).and_then(|cell| parse_cell_date(cell))
    }

    pub fn number_at(row: &Row, index: usize) -> Option<f64> {
        row.get(index).and_then(|cell| parse_number(cell))
    }

    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(|c: char| matches!(c, '$' | '₹' | '€' | '£'))
        .unwrap_or(trimmed)
        .trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', "").parse::<f64>().ok().filter(|value| value.is_finite())
}

// A column takes a kind when most of its non-blank cells parse as it; the
// stragglers read as absent.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen = 0usize;
    let mut numeric = 0usize;
    let mut date = 0usize;

    for cell in cells.filter(|cell| !cell.trim().is_empty()) {
        seen += 1;
        numeric += usize::from(parse_number(cell).is_some());
        date += usize::from(parse_cell_date(cell).is_some());
    }

    if numeric * 2 > seen && numeric >= date {
        ColumnKind::Numeric
    } else if date * 2 > seen {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

fn dedupe_headers(header: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let name = name.trim();
            let base = if name.is_empty() {
                format!("Column {}", index + 1)
            } else {
                name.to_string()
            };
            let mut unique = base.clone();
            let mut suffix = 1;
            while used.contains(&unique) {
                unique = format!("{base}.{suffix}");
                suffix += 1;
            }
            used.insert(unique.clone());
            unique
        })
        .collect()
}
