use std::path::Path;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SheetsConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::table::Table;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[allow(async_fn_in_trait)]
pub trait SheetTransport {
    async fn export_csv(&self, sheet_id: &str, gid: Option<&str>) -> AdapterResult<(StatusCode, String)>;
    async fn sheet_properties(&self, sheet_id: &str, token: &str) -> AdapterResult<Vec<SheetProperties>>;
    async fn values(&self, sheet_id: &str, token: &str, title: &str) -> AdapterResult<Vec<Vec<Value>>>;
}

#[derive(Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl SheetTransport for HttpTransport {
    async fn export_csv(&self, sheet_id: &str, gid: Option<&str>) -> AdapterResult<(StatusCode, String)> {
        let response = self.http.get(public_export_url(sheet_id, gid)).send().await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }

    async fn sheet_properties(&self, sheet_id: &str, token: &str) -> AdapterResult<Vec<SheetProperties>> {
        #[derive(Deserialize)]
        struct Sheet {
            properties: SheetProperties,
        }
        #[derive(Deserialize)]
        struct Spreadsheet {
            #[serde(default)]
            sheets: Vec<Sheet>,
        }

        let response = self
            .http
            .get(api_url(&[sheet_id])?)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(token)
            .send()
            .await?;
        let spreadsheet: Spreadsheet = json_or_api_error(response).await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .collect())
    }

    async fn values(&self, sheet_id: &str, token: &str, title: &str) -> AdapterResult<Vec<Vec<Value>>> {
        #[derive(Deserialize)]
        struct ValueRange {
            #[serde(default)]
            values: Vec<Vec<Value>>,
        }

        let url = api_url(&[sheet_id, "values", title])?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let range: ValueRange = json_or_api_error(response).await?;
        Ok(range.values)
    }
}

pub struct SheetsClient<T = HttpTransport> {
    transport: T,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self::with_transport(config, HttpTransport::default())
    }
}

impl<T: SheetTransport> SheetsClient<T> {
    pub fn with_transport(config: SheetsConfig, transport: T) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    pub async fn fetch_member_rows(&self, member: &str) -> AdapterResult<Table> {
        let gid = self
            .config
            .member_gid(member)
            .ok_or_else(|| AdapterError::UnknownMember(member.to_string()))?;
        self.fetch_rows(Some(gid)).await
    }

    /// Fetches one sheet by GID, or the first sheet when none is given.
    pub async fn fetch_rows(&self, gid: Option<&str>) -> AdapterResult<Table> {
        if let Some(token) = self.config.access_token.as_deref() {
            match self.fetch_authenticated(token, gid).await {
                Ok(table) => return Ok(table),
                Err(error) => {
                    tracing::warn!(error = %error, gid = ?gid, "authenticated sheet fetch failed; using public export");
                }
            }
        }
        self.fetch_public(gid).await
    }

    pub async fn fetch_public(&self, gid: Option<&str>) -> AdapterResult<Table> {
        let (status, body) = self.transport.export_csv(self.sheet_id()?, gid).await?;
        if status == StatusCode::FORBIDDEN {
            return Err(AdapterError::AccessDenied);
        }
        if !status.is_success() {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let table = Table::from_csv_reader(body.as_bytes())?;
        tracing::info!(gid = ?gid, rows = table.rows.len(), columns = table.columns.len(), "sheet fetched via public export");
        Ok(table)
    }

    pub async fn fetch_authenticated(&self, token: &str, gid: Option<&str>) -> AdapterResult<Table> {
        let sheet_id = self.sheet_id()?;
        let sheets = self.transport.sheet_properties(sheet_id, token).await?;
        let title = resolve_sheet_title(&sheets, gid)?;

        let values = self.transport.values(sheet_id, token, &title).await?;
        if values.is_empty() {
            tracing::warn!(sheet = %title, "sheet has no values");
        }
        let table = Table::from_values(values_to_grid(values));
        tracing::info!(sheet = %title, rows = table.rows.len(), "sheet fetched via values API");
        Ok(table)
    }

    pub async fn sheet_titles(&self) -> AdapterResult<Vec<String>> {
        let token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| AdapterError::Config("GOOGLE_SHEETS_ACCESS_TOKEN is not set".to_string()))?;
        Ok(self
            .transport
            .sheet_properties(self.sheet_id()?, token)
            .await?
            .into_iter()
            .map(|sheet| sheet.title)
            .collect())
    }

    fn sheet_id(&self) -> AdapterResult<&str> {
        self.config
            .sheet_id
            .as_deref()
            .ok_or_else(|| AdapterError::Config("Google Sheet ID not configured".to_string()))
    }
}

async fn json_or_api_error<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> AdapterResult<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AdapterError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

pub fn public_export_url(sheet_id: &str, gid: Option<&str>) -> String {
    match gid {
        Some(gid) => format!("https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&gid={gid}"),
        None => format!("https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv"),
    }
}

fn api_url(segments: &[&str]) -> AdapterResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(SHEETS_API_URL)
        .map_err(|error| AdapterError::Config(error.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Config("Sheets API URL cannot take path segments".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub fn resolve_sheet_title(sheets: &[SheetProperties], gid: Option<&str>) -> AdapterResult<String> {
    let found = match gid {
        Some(gid) => sheets.iter().find(|sheet| sheet.sheet_id.to_string() == gid.trim()),
        None => sheets.first(),
    };
    match (found, gid) {
        (Some(sheet), _) => Ok(sheet.title.clone()),
        (None, Some(gid)) => Err(AdapterError::SheetNotFound(gid.to_string())),
        (None, None) => Err(AdapterError::Malformed("no sheets found in the spreadsheet".to_string())),
    }
}

pub fn values_to_grid(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

pub fn load_csv_file(path: &Path) -> AdapterResult<Table> {
    let file = std::fs::File::open(path)?;
    let table = Table::from_csv_reader(file)?;
    tracing::info!(path = %path.display(), rows = table.rows.len(), "sheet loaded from file");
    Ok(table)
}
