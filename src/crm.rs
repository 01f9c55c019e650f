use std::path::Path;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::CrmConfig;
use crate::dates::parse_timestamp;
use crate::error::{AdapterError, AdapterResult};
use crate::models::{LeadRecord, Owner};

pub const PER_PAGE: u32 = 200;
pub const MAX_PAGES: u32 = 50;
pub const DEFAULT_MAX_COUNT: usize = 5000;

#[derive(Debug, Clone, Default)]
pub struct LeadPage {
    pub records: Vec<Value>,
    pub more_records: bool,
}

#[allow(async_fn_in_trait)]
pub trait LeadPageSource {
    async fn fetch_page(&self, page: u32, per_page: u32) -> AdapterResult<LeadPage>;
}

pub async fn fetch_leads<S: LeadPageSource>(
    source: &S,
    max_count: usize,
) -> AdapterResult<Vec<LeadRecord>> {
    let mut raw: Vec<Value> = Vec::new();
    let mut page = 1u32;

    while raw.len() < max_count {
        let batch = source.fetch_page(page, PER_PAGE).await?;
        tracing::debug!(page, count = batch.records.len(), more = batch.more_records, "fetched lead page");
        if batch.records.is_empty() {
            break;
        }
        raw.extend(batch.records);

        if !batch.more_records {
            break;
        }
        page += 1;
        if page > MAX_PAGES {
            tracing::warn!(max_pages = MAX_PAGES, collected = raw.len(), "lead page ceiling reached");
            break;
        }
    }

    raw.truncate(max_count);
    tracing::info!(count = raw.len(), pages = page, "leads fetched");
    Ok(raw.iter().map(normalize_lead).collect())
}

pub struct ZohoClient {
    http: reqwest::Client,
    config: CrmConfig,
    access_token: Option<String>,
}

impl ZohoClient {
    pub fn new(config: CrmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            access_token: None,
        }
    }

    pub async fn authenticate(&mut self) -> AdapterResult<()> {
        let url = format!("{}/oauth/v2/token", self.config.accounts_url.trim_end_matches('/'));
        let params = [
            ("refresh_token", self.config.refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        self.access_token = Some(access_token_from_reply(status, &body)?);
        tracing::info!("CRM access token acquired");
        Ok(())
    }
}

pub fn access_token_from_reply(status: StatusCode, body: &str) -> AdapterResult<String> {
    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: Option<String>,
        error: Option<String>,
    }

    if !status.is_success() {
        return Err(AdapterError::Auth(format!("token endpoint returned {status}: {body}")));
    }
    // Zoho reports grant errors with a 200 and an `error` field.
    let token: TokenResponse =
        serde_json::from_str(body).map_err(|error| AdapterError::Auth(format!("unreadable token response: {error}")))?;
    match (token.access_token, token.error) {
        (Some(access_token), _) => Ok(access_token),
        (None, Some(error)) => Err(AdapterError::Auth(error)),
        (None, None) => Err(AdapterError::Auth("response carried no access token".to_string())),
    }
}

impl LeadPageSource for ZohoClient {
    async fn fetch_page(&self, page: u32, per_page: u32) -> AdapterResult<LeadPage> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| AdapterError::Auth("not authenticated".to_string()))?;
        let url = format!("{}/Leads", self.config.api_url.trim_end_matches('/'));
        let page = page.to_string();
        let per_page = per_page.to_string();

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .query(&[
                ("sort_by", "Created_Time"),
                ("sort_order", "desc"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        lead_page_from_reply(status, &body)
    }
}

pub fn lead_page_from_reply(status: StatusCode, body: &str) -> AdapterResult<LeadPage> {
    #[derive(Deserialize, Default)]
    struct PageInfo {
        #[serde(default)]
        more_records: bool,
    }
    #[derive(Deserialize)]
    struct LeadsResponse {
        #[serde(default)]
        data: Vec<Value>,
        #[serde(default)]
        info: Option<PageInfo>,
    }

    // An empty module answers 204 with no body.
    if status == StatusCode::NO_CONTENT {
        return Ok(LeadPage::default());
    }
    if !status.is_success() {
        return Err(AdapterError::Api {
            status: status.as_u16(),
            message: body.to_string(),
        });
    }

    let body: LeadsResponse = serde_json::from_str(body)?;
    Ok(LeadPage {
        records: body.data,
        more_records: body.info.unwrap_or_default().more_records,
    })
}

pub fn normalize_lead(value: &Value) -> LeadRecord {
    let created_raw = text(value, "Created_Time");
    LeadRecord {
        id: text(value, "id"),
        first_name: text(value, "First_Name"),
        last_name: text(value, "Last_Name"),
        email: text(value, "Email"),
        phone: text(value, "Phone"),
        company: text(value, "Company"),
        source: text(value, "Lead_Source"),
        status: text(value, "Lead_Status"),
        owner: value.get("Owner").filter(|owner| owner.is_object()).map(|owner| Owner {
            name: text(owner, "name"),
            email: text(owner, "email"),
            id: text(owner, "id"),
        }),
        created_at: created_raw.as_deref().and_then(parse_timestamp),
        created_raw,
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn load_leads_file(path: &Path) -> AdapterResult<Vec<LeadRecord>> {
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let records = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AdapterError::Malformed(
                    "expected a `data` array of leads".to_string(),
                ))
            }
        },
        _ => {
            return Err(AdapterError::Malformed(
                "expected a JSON array or object".to_string(),
            ))
        }
    };

    tracing::info!(count = records.len(), path = %path.display(), "leads loaded from file");
    Ok(records.iter().map(normalize_lead).collect())
}
