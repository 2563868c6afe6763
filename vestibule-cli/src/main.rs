//! Vestibule CLI - command-line client for the account service
//!
//! Persists the session on disk between runs, exactly the way the web views
//! consume the SDK: boot-time refresh first, then the requested operation.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::debug;
use vestibule_client::directory::{filter_by_duration, filter_by_investment};
use vestibule_client::{DirectoryClient, HttpAuthApi, SessionController, SessionState, SessionStore};
use vestibule_core::{init_logging, ApiConfig, LoggingConfig};

#[derive(Parser)]
#[command(name = "vestibule")]
#[command(about = "Client for the Vestibule account service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the account service (overrides VESTIBULE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate and persist the session
    Login {
        /// Investor identifier
        identifier: String,

        /// Password
        secret: String,
    },

    /// Create an account and persist the session
    Register {
        /// Display name
        name: String,

        /// Email address
        email: String,

        /// Password
        secret: String,
    },

    /// Show the current authenticated user
    Whoami,

    /// List the user directory (requires an authenticated session)
    Users {
        /// Server-side search over name and email
        #[arg(short, long)]
        query: Option<String>,

        /// Keep only entries with this investment type
        #[arg(long)]
        investment: Option<String>,

        /// Keep only entries with this plan duration in years
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Discard the stored session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        ..Default::default()
    };
    init_logging(&logging).map_err(|e| anyhow::anyhow!("failed to set up logging: {e}"))?;

    let mut config = ApiConfig::from_env().context("invalid environment configuration")?;
    if let Some(api_url) = cli.api_url {
        config.base_url = api_url;
    }
    debug!(base_url = %config.base_url, "using account service");

    let store = SessionStore::default_on_disk();
    let controller = SessionController::connect(config.clone(), store.clone())
        .context("failed to build session controller")?;

    // Boot-time silent refresh, the same sequence the UI runs on mount.
    let state = controller.refresh().await;

    match cli.command {
        Commands::Login { identifier, secret } => {
            controller.login(&identifier, &secret).await?;
            print_session(&controller.state())?;
        }
        Commands::Register {
            name,
            email,
            secret,
        } => {
            controller.register(&name, &email, &secret).await?;
            print_session(&controller.state())?;
        }
        Commands::Whoami => {
            print_session(&state)?;
        }
        Commands::Users {
            query,
            investment,
            duration,
        } => {
            if !state.is_authenticated() {
                bail!("not logged in; run `vestibule login` first");
            }

            let api = HttpAuthApi::new(config).context("failed to build transport")?;
            let directory = DirectoryClient::new(std::sync::Arc::new(api), store);

            let mut entries = directory.list(query.as_deref()).await?;
            if let Some(investment) = investment {
                entries = filter_by_investment(&entries, &investment);
            }
            if let Some(duration) = duration {
                entries = filter_by_duration(&entries, duration);
            }

            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Logout => {
            controller.logout();
            println!("logged out");
        }
    }

    Ok(())
}

fn print_session(state: &SessionState) -> anyhow::Result<()> {
    match state.principal() {
        Some(principal) => println!("{}", serde_json::to_string_pretty(principal)?),
        None => bail!("not logged in"),
    }
    Ok(())
}
