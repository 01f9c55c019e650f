use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};

mod aggregate;
mod config;
mod crm;
mod dates;
mod error;
mod export;
mod filter;
mod models;
mod report;
mod session;
mod sheets;
mod table;

use aggregate::LeadDimension;
use config::{CrmConfig, SheetsConfig};
use dates::{DatePreset, YearMonth};
use error::{AdapterError, AdapterResult};
use models::{FilterCriteria, LeadRecord, OwnerFilter, SheetCriteria, StatusFilter, KNOWN_SOURCES};
use session::DashboardSession;
use sheets::SheetsClient;
use table::Table;

#[derive(Parser)]
#[command(name = "leads-dashboard")]
#[command(about = "Lead and team performance dashboard over Zoho CRM and Google Sheets", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CRM lead views
    #[command(subcommand)]
    Leads(LeadsCommand),
    /// Team member spreadsheet views
    #[command(subcommand)]
    Sheet(SheetCommand),
}

#[derive(Subcommand)]
enum LeadsCommand {
    /// Print the scoreboard for the filtered leads
    Summary {
        #[command(flatten)]
        input: LeadInput,
        #[command(flatten)]
        filters: LeadFilters,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown dashboard report
    Report {
        #[command(flatten)]
        input: LeadInput,
        #[command(flatten)]
        filters: LeadFilters,
        #[arg(long, default_value = "leads_report.md")]
        out: PathBuf,
    },
    /// Export the filtered leads as CSV
    Export {
        #[command(flatten)]
        input: LeadInput,
        #[command(flatten)]
        filters: LeadFilters,
        /// Defaults to leads_export_<timestamp>.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the owner and status values available for filtering
    Options {
        #[command(flatten)]
        input: LeadInput,
    },
}

#[derive(Args)]
struct LeadInput {
    /// Read a saved Leads API dump instead of calling the CRM
    #[arg(long)]
    from_file: Option<PathBuf>,
    #[arg(long, default_value_t = crm::DEFAULT_MAX_COUNT)]
    max_count: usize,
}

#[derive(Args)]
struct LeadFilters {
    /// Lead source to include; repeatable. Defaults to the tracked marketing sources
    #[arg(long = "source")]
    sources: Vec<String>,
    /// Include every source, tracked or not
    #[arg(long, conflicts_with = "sources")]
    any_source: bool,
    #[arg(long, default_value = models::ALL)]
    owner: String,
    /// A status value, "Not Set", or "All"
    #[arg(long, default_value = models::ALL)]
    status: String,
    #[arg(long, value_enum)]
    preset: Option<DatePreset>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Series the daily trend is split by
    #[arg(long, value_enum, default_value = "source")]
    trend_by: LeadDimension,
}

impl LeadFilters {
    fn criteria(&self, today: NaiveDate) -> FilterCriteria {
        let sources: BTreeSet<String> = if self.any_source {
            BTreeSet::new()
        } else if self.sources.is_empty() {
            KNOWN_SOURCES.iter().map(|source| source.to_string()).collect()
        } else {
            self.sources.iter().cloned().collect()
        };

        let preset = self.preset.unwrap_or(if self.from.is_some() || self.to.is_some() {
            DatePreset::Custom
        } else {
            DatePreset::AllTime
        });

        FilterCriteria {
            sources,
            owner: OwnerFilter::parse(&self.owner),
            status: StatusFilter::parse(&self.status),
            date_range: preset.resolve(today, self.from, self.to),
        }
    }
}

#[derive(Subcommand)]
enum SheetCommand {
    /// List configured team members and the spreadsheet access mode
    Members,
    /// Summarize a member's sheet by month
    Summary {
        #[command(flatten)]
        input: SheetInput,
        #[command(flatten)]
        filters: SheetFilters,
        #[arg(long)]
        json: bool,
        /// Also write the summary as a markdown report
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export a member's (filtered) rows as CSV
    Export {
        #[command(flatten)]
        input: SheetInput,
        #[command(flatten)]
        filters: SheetFilters,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("sheet_source")
        .args(["member", "csv"])
        .required(true)
        .multiple(false)
))]
struct SheetInput {
    #[arg(long)]
    member: Option<String>,
    /// Read rows from a local CSV file instead of the spreadsheet
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct SheetFilters {
    /// Column to bucket by month; defaults to the first date-like column
    #[arg(long)]
    date_column: Option<String>,
    /// Month to include as YYYY-MM; repeatable
    #[arg(long = "month")]
    months: Vec<YearMonth>,
    /// Keep rows where COLUMN equals VALUE, given as COLUMN=VALUE
    #[arg(long = "where", value_parser = parse_column_match)]
    column_match: Option<(String, String)>,
}

impl SheetFilters {
    fn criteria(&self) -> SheetCriteria {
        SheetCriteria {
            date_column: self.date_column.clone(),
            months: self.months.iter().copied().collect(),
            column_match: self.column_match.clone(),
        }
    }
}

fn parse_column_match(value: &str) -> Result<(String, String), String> {
    let (column, expected) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{value}`"))?;
    Ok((column.trim().to_string(), expected.trim().to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    match cli.command {
        Commands::Leads(command) => run_leads(command).await,
        Commands::Sheet(command) => run_sheet(command).await,
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|error| anyhow::anyhow!("failed to initialise logging: {error}"))
}

async fn load_leads(input: &LeadInput) -> AdapterResult<Vec<LeadRecord>> {
    if let Some(path) = &input.from_file {
        return crm::load_leads_file(path);
    }
    let config = CrmConfig::from_env().map_err(|error| AdapterError::Config(format!("{error:#}")))?;
    let mut client = crm::ZohoClient::new(config);
    client.authenticate().await?;
    crm::fetch_leads(&client, input.max_count).await
}

async fn lead_session(input: &LeadInput) -> anyhow::Result<DashboardSession> {
    let mut session = DashboardSession::new();
    session.replace_leads(load_leads(input).await);
    if let Some(reason) = session.leads.failure() {
        anyhow::bail!("no data available: {reason}");
    }
    Ok(session)
}

async fn run_leads(command: LeadsCommand) -> anyhow::Result<()> {
    let today = dates::today_local();

    match command {
        LeadsCommand::Summary {
            input,
            filters,
            json,
        } => {
            let session = lead_session(&input).await?;
            let criteria = filters.criteria(today);
            let view = session
                .lead_view(&criteria, filters.trend_by)
                .context("lead snapshot missing after refresh")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            println!("Total leads: {}", view.scoreboard.total);
            for line in criteria.describe() {
                println!("  {line}");
            }
            println!("Lead sources:");
            for source in KNOWN_SOURCES {
                println!("- {}: {}", source, view.scoreboard.source_count(source));
            }
            println!("Lead statuses:");
            if view.scoreboard.statuses.is_empty() {
                println!("- none");
            }
            for entry in &view.scoreboard.statuses {
                println!("- {}: {}", entry.category, entry.count);
            }
        }
        LeadsCommand::Report {
            input,
            filters,
            out,
        } => {
            let session = lead_session(&input).await?;
            let criteria = filters.criteria(today);
            let view = session
                .lead_view(&criteria, filters.trend_by)
                .context("lead snapshot missing after refresh")?;
            let report = report::build_lead_report(&criteria.describe(), &view);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        LeadsCommand::Export {
            input,
            filters,
            out,
        } => {
            let session = lead_session(&input).await?;
            let view = session
                .lead_view(&filters.criteria(today), filters.trend_by)
                .context("lead snapshot missing after refresh")?;
            let out = out.unwrap_or_else(|| PathBuf::from(export::default_export_name(chrono::Local::now())));
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_leads_csv(file, &view.leads)?;
            println!("Exported {} leads to {}.", view.leads.len(), out.display());
        }
        LeadsCommand::Options { input } => {
            let session = lead_session(&input).await?;
            let owners = session.owner_options(&config::owner_emails_from_env());
            println!("Owners: {}", join_or_none(&owners));
            println!("Statuses: {}", join_or_none(&session.status_options()));
        }
    }

    Ok(())
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

async fn load_sheet(client: &SheetsClient, input: &SheetInput) -> (String, AdapterResult<Table>) {
    match (&input.csv, &input.member) {
        (Some(path), _) => (path.display().to_string(), sheets::load_csv_file(path)),
        (None, Some(member)) => (member.clone(), client.fetch_member_rows(member).await),
        (None, None) => (
            String::new(),
            Err(AdapterError::Config("either --member or --csv is required".to_string())),
        ),
    }
}

async fn sheet_session(input: &SheetInput) -> anyhow::Result<DashboardSession> {
    let client = SheetsClient::new(SheetsConfig::from_env());
    let (member, result) = load_sheet(&client, input).await;
    let mut session = DashboardSession::new();
    session.replace_sheet(&member, result);
    if let Some(reason) = session.sheet.failure() {
        anyhow::bail!("no data available for {member}: {reason}");
    }
    Ok(session)
}

async fn run_sheet(command: SheetCommand) -> anyhow::Result<()> {
    match command {
        SheetCommand::Members => {
            let client = SheetsClient::new(SheetsConfig::from_env());
            let config = client.config();
            let (valid, message) = config.validate();
            println!("{message}");
            if !valid {
                return Ok(());
            }
            if config.team.is_empty() {
                println!("No team members configured; set SHEET_TEAM_MEMBERS.");
            }
            for member in &config.team {
                match &member.gid {
                    Some(gid) => println!("- {} (gid {gid})", member.name),
                    None => println!("- {} (no GID set in {})", member.name, config::member_env_key(&member.name)),
                }
            }
            if !config.uses_public_access() {
                match client.sheet_titles().await {
                    Ok(titles) => println!("Sheets: {}", join_or_none(&titles)),
                    Err(error) => tracing::warn!(error = %error, "could not list sheet titles"),
                }
            }
        }
        SheetCommand::Summary {
            input,
            filters,
            json,
            out,
        } => {
            let session = sheet_session(&input).await?;
            let view = session
                .sheet_view(&filters.criteria())
                .context("sheet snapshot missing after refresh")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", report::build_sheet_report(&view));
            }
            if let Some(out) = out {
                std::fs::write(&out, report::build_sheet_report(&view))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        SheetCommand::Export {
            input,
            filters,
            out,
        } => {
            let session = sheet_session(&input).await?;
            let view = session
                .sheet_view(&filters.criteria())
                .context("sheet snapshot missing after refresh")?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_table_csv(file, &view.table)?;
            println!("Exported {} rows to {}.", view.table.rows.len(), out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> LeadFilters {
        LeadFilters {
            sources: Vec::new(),
            any_source: false,
            owner: models::ALL.to_string(),
            status: models::ALL.to_string(),
            preset: None,
            from: None,
            to: None,
            trend_by: LeadDimension::Source,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_filters_track_known_sources_for_all_time() {
        let criteria = filters().criteria(date(2025, 3, 10));
        assert_eq!(criteria.sources.len(), KNOWN_SOURCES.len());
        assert!(!criteria.date_range.is_active());
        assert_eq!(criteria.owner, OwnerFilter::All);
        assert_eq!(criteria.status, StatusFilter::All);
    }

    #[test]
    fn explicit_bounds_imply_custom_range() {
        let mut args = filters();
        args.from = Some(date(2025, 3, 1));
        args.any_source = true;
        let criteria = args.criteria(date(2025, 3, 10));
        assert!(criteria.sources.is_empty());
        assert_eq!(criteria.date_range.start, Some(date(2025, 3, 1)));
        assert_eq!(criteria.date_range.end, Some(date(2025, 3, 10)));
    }

    #[test]
    fn column_match_needs_equals_sign() {
        assert_eq!(
            parse_column_match("Outcome = Booked").unwrap(),
            ("Outcome".to_string(), "Booked".to_string())
        );
        assert!(parse_column_match("Outcome").is_err());
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "leads-dashboard",
            "leads",
            "summary",
            "--from-file",
            "leads.json",
            "--status",
            "Not Set",
            "--preset",
            "last-7-days",
        ])
        .unwrap();
        match cli.command {
            Commands::Leads(LeadsCommand::Summary { filters, .. }) => {
                assert_eq!(filters.preset, Some(DatePreset::Last7Days));
                assert_eq!(StatusFilter::parse(&filters.status), StatusFilter::NotSet);
            }
            _ => panic!("expected leads summary"),
        }

        assert!(Cli::try_parse_from(["leads-dashboard", "sheet", "summary"]).is_err());
    }
}
