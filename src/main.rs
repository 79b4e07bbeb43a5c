use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use clap::Parser;
use log::info;
use std::io::Write;
use std::path::PathBuf;

use calendar_is_live::auth::{CredentialSource, GoogleTokenProvider, CREDENTIALS_ENV};
use calendar_is_live::calendar::{
    GoogleCalendarClient, DEFAULT_LEAD_MINUTES, DEFAULT_LOOKBACK_MINUTES, DEFAULT_PAGE_SIZE,
};
use calendar_is_live::config::{default_config_path, resolve_calendar_id, SheetKey};
use calendar_is_live::liveness::{check_is_live, CheckSettings};

/// Print 'is live' if a calendar has an in-progress event, else 'is off'
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Google Calendar ID to query
    #[arg(long)]
    calendar_id: Option<String>,

    /// Sheet key to resolve calendarId from the config file
    #[arg(long, value_enum)]
    sheet: Option<SheetKey>,

    /// Path to the sheet config file (JSON, or TOML with a .toml extension);
    /// defaults to config.json next to the executable
    #[arg(long)]
    config: Option<PathBuf>,

    /// How far back to search for events that might span 'now'
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_MINUTES)]
    lookback_minutes: u32,

    /// How far past 'now' the query window extends
    #[arg(long, default_value_t = DEFAULT_LEAD_MINUTES)]
    lead_minutes: u32,

    /// Events requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=2500))]
    page_size: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Service account key file; falls back to application default credentials
    #[arg(long, env = CREDENTIALS_ENV)]
    credentials: Option<PathBuf>,
}

impl Args {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_config_path().context("Failed to determine default config path"),
        }
    }

    fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            lookback: Duration::minutes(i64::from(self.lookback_minutes)),
            lead: Duration::minutes(i64::from(self.lead_minutes)),
            page_size: self.page_size,
        }
    }
}

/// アプリケーションのロギングを初期化
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    info!("is_live v{} を起動しました", env!("CARGO_PKG_VERSION"));

    // ネットワークに触る前にカレンダーIDを確定させる
    let config_path = args.config_path()?;
    let calendar_id = resolve_calendar_id(args.calendar_id.as_deref(), args.sheet, &config_path)
        .context("Failed to resolve calendar ID")?;
    info!("Checking calendar {}", calendar_id);

    let source = CredentialSource::from_key_path(args.credentials.as_deref());
    let tokens = GoogleTokenProvider::from_source(&source)
        .await
        .context("Failed to initialize Google credentials")?;

    let client = GoogleCalendarClient::new(
        Box::new(tokens),
        std::time::Duration::from_secs(args.timeout_secs),
    )
    .context("Failed to create calendar client")?;

    let status = check_is_live(&client, &calendar_id, Utc::now(), &args.check_settings())
        .await
        .with_context(|| format!("Failed to check calendar {}", calendar_id))?;

    println!("{}", status);
    Ok(())
}
