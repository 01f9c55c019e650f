use anyhow::Context;

const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";
const DEFAULT_API_URL: &str = "https://www.zohoapis.com/crm/v2";
const SHEET_ID_PLACEHOLDER: &str = "your_google_sheet_id_here";

#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub accounts_url: String,
    pub api_url: String,
}

impl CrmConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            client_id: required("ZOHO_CLIENT_ID")?,
            client_secret: required("ZOHO_CLIENT_SECRET")?,
            refresh_token: required("ZOHO_REFRESH_TOKEN")?,
            accounts_url: optional("ZOHO_ACCOUNTS_URL")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            api_url: optional("ZOHO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}

pub fn owner_emails_from_env() -> Vec<String> {
    optional("LEAD_OWNER_EMAILS")
        .map(|value| split_list(&value))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub name: String,
    pub gid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub sheet_id: Option<String>,
    pub access_token: Option<String>,
    pub team: Vec<TeamMember>,
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        let team = optional("SHEET_TEAM_MEMBERS")
            .map(|value| split_list(&value))
            .unwrap_or_default()
            .into_iter()
            .map(|name| TeamMember {
                gid: optional(&member_env_key(&name)),
                name,
            })
            .collect();

        Self {
            sheet_id: optional("GOOGLE_SHEET_ID").filter(|id| id != SHEET_ID_PLACEHOLDER),
            access_token: optional("GOOGLE_SHEETS_ACCESS_TOKEN"),
            team,
        }
    }

    pub fn member_gid(&self, name: &str) -> Option<&str> {
        self.team
            .iter()
            .find(|member| member.name == name)
            .and_then(|member| member.gid.as_deref())
    }

    pub fn uses_public_access(&self) -> bool {
        self.access_token.is_none()
    }

    pub fn validate(&self) -> (bool, &'static str) {
        if self.sheet_id.is_none() {
            return (false, "Google Sheet ID not configured");
        }
        if self.uses_public_access() {
            (true, "Using public sheet access (no credentials needed)")
        } else {
            (true, "Using authenticated sheet access with public fallback")
        }
    }
}

// `Ankita Rao` reads its GID from `SHEET_ANKITA_RAO`.
pub fn member_env_key(name: &str) -> String {
    let key: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("SHEET_{key}")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{key} must be set to reach the CRM"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
