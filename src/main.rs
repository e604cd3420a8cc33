//! Onboarding portal server
//!
//! Serves the REST API (and optionally the built frontend), and seeds the
//! bootstrap super-admin with `portal create-admin`.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use portal_api::{services::AccountService, ApiServer, ApiServerConfig};
use portal_notify::{LogMailer, Mailer, SmtpConfig, SmtpMailer};
use portal_tracker::{IssueTracker, JiraClient, JiraConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Customer onboarding and account administration portal
#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "PORTAL_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Database URL (sqlite://portal.db?mode=rwc or postgres://...)
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://portal.db?mode=rwc",
        global = true
    )]
    database_url: String,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or promote the bootstrap super-admin account
    CreateAdmin {
        #[arg(long, env = "PORTAL_ADMIN_EMAIL")]
        email: String,

        #[arg(long, env = "PORTAL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// HTTP bind address
    #[arg(long, env = "PORTAL_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: SocketAddr,

    /// Secret used to sign session tokens
    #[arg(long, env = "PORTAL_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Session lifetime in hours
    #[arg(long, env = "PORTAL_SESSION_HOURS", default_value = "12")]
    session_hours: i64,

    /// Password reset link lifetime in minutes
    #[arg(long, env = "PORTAL_RESET_MINUTES", default_value = "60")]
    reset_minutes: i64,

    /// Public portal URL used in emailed links
    #[arg(long, env = "PORTAL_URL", default_value = "http://localhost:3000")]
    portal_url: String,

    /// Internal mailbox that receives every onboarding submission
    #[arg(long, env = "PORTAL_OPS_EMAIL", default_value = "onboarding@localhost")]
    ops_email: String,

    /// SMTP relay host; emails are only logged when unset
    #[arg(long, env = "SMTP_HOST")]
    smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value = "587")]
    smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    #[arg(long, env = "SMTP_FROM", default_value = "Onboarding Portal <no-reply@localhost>")]
    smtp_from: String,

    /// Connect without STARTTLS (local relays only)
    #[arg(long, env = "SMTP_PLAINTEXT")]
    smtp_plaintext: bool,

    /// Issue tracker base URL; support requests stay local when unset
    #[arg(long, env = "TRACKER_URL")]
    tracker_url: Option<String>,

    #[arg(long, env = "TRACKER_USERNAME")]
    tracker_username: Option<String>,

    #[arg(long, env = "TRACKER_API_TOKEN", hide_env_values = true)]
    tracker_api_token: Option<String>,

    #[arg(long, env = "TRACKER_PROJECT", default_value = "SUP")]
    tracker_project: String,

    #[arg(long, env = "TRACKER_ISSUE_TYPE", default_value = "Task")]
    tracker_issue_type: String,

    /// Directory served under /uploads
    #[arg(long, env = "PORTAL_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Built frontend to serve for non-API paths
    #[arg(long, env = "PORTAL_FRONTEND_DIR")]
    frontend_dir: Option<PathBuf>,

    /// Enable CORS for the listed origins (localhost when none are given)
    #[arg(long, env = "PORTAL_CORS")]
    cors: bool,

    #[arg(long = "cors-origin", env = "PORTAL_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Per-email delivery timeout in seconds
    #[arg(long, env = "PORTAL_NOTIFY_TIMEOUT", default_value = "10")]
    notify_timeout: u64,

    /// Issue tracker request timeout in seconds
    #[arg(long, env = "PORTAL_TRACKER_TIMEOUT", default_value = "10")]
    tracker_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    info!("Connecting to database: {}", redact(&cli.database_url));
    let db = portal_db::connect(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    portal_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    match cli.command {
        Some(Commands::CreateAdmin {
            email,
            password,
            name,
        }) => {
            let accounts = AccountService::new(
                db,
                b"",
                chrono::Duration::hours(cli.server.session_hours),
                chrono::Duration::minutes(cli.server.reset_minutes),
                cli.server.portal_url,
            );
            let admin = accounts
                .bootstrap_admin(&email, &password, name)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            info!("Super admin ready: {} ({})", admin.email, admin.account_code);
            Ok(())
        }
        None => serve(cli.server, db).await,
    }
}

async fn serve(args: ServerArgs, db: sea_orm::DatabaseConnection) -> Result<()> {
    let jwt_secret = args
        .jwt_secret
        .filter(|secret| !secret.is_empty())
        .context("PORTAL_JWT_SECRET (or --jwt-secret) is required to serve the portal")?;

    let mailer: Arc<dyn Mailer> = match args.smtp_host {
        Some(host) => {
            info!("Sending email through {}:{}", host, args.smtp_port);
            Arc::new(SmtpMailer::new(SmtpConfig {
                host,
                port: args.smtp_port,
                username: args.smtp_username,
                password: args.smtp_password,
                from: args.smtp_from,
                starttls: !args.smtp_plaintext,
                timeout: Duration::from_secs(args.notify_timeout),
            })?)
        }
        None => {
            warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let tracker: Option<Arc<dyn IssueTracker>> =
        match (args.tracker_url, args.tracker_username, args.tracker_api_token) {
            (Some(base_url), Some(username), Some(api_token)) => {
                info!("Mirroring support requests to {}", base_url);
                Some(Arc::new(JiraClient::new(JiraConfig {
                    base_url,
                    username,
                    api_token,
                    project_key: args.tracker_project,
                    issue_type: args.tracker_issue_type,
                    timeout: Duration::from_secs(args.tracker_timeout),
                })?))
            }
            (Some(_), _, _) => {
                warn!("TRACKER_URL set without TRACKER_USERNAME/TRACKER_API_TOKEN, tracker disabled");
                None
            }
            _ => None,
        };

    if let Err(e) = std::fs::create_dir_all(&args.upload_dir) {
        warn!(
            "Could not create upload directory {}: {}",
            args.upload_dir.display(),
            e
        );
    }

    let config = ApiServerConfig {
        bind_addr: args.bind_addr,
        enable_cors: args.cors || !args.cors_origins.is_empty(),
        cors_origins: (!args.cors_origins.is_empty()).then_some(args.cors_origins),
        jwt_secret,
        session_ttl: chrono::Duration::hours(args.session_hours),
        reset_token_ttl: chrono::Duration::minutes(args.reset_minutes),
        portal_url: args.portal_url,
        ops_email: args.ops_email,
        notify_timeout: Duration::from_secs(args.notify_timeout),
        upload_dir: args.upload_dir,
        frontend_dir: args.frontend_dir,
    };

    let server = ApiServer::new(config, db, mailer, tracker);

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    server.start(shutdown).await?;
    info!("Portal stopped");

    Ok(())
}

/// Hide credentials embedded in a connection string
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}://***{}", &url[..scheme], &url[at..]),
        _ => url.to_string(),
    }
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(
            redact("postgres://user:secret@db:5432/portal"),
            "postgres://***@db:5432/portal"
        );
        assert_eq!(redact("sqlite://portal.db?mode=rwc"), "sqlite://portal.db?mode=rwc");
    }

    #[test]
    fn test_cli_parses_create_admin() {
        let cli = Cli::try_parse_from([
            "portal",
            "create-admin",
            "--email",
            "root@portal.test",
            "--password",
            "Root#Pass123",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::CreateAdmin { .. })));
    }
}
