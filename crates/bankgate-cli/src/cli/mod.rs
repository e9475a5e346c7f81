//! CLI entry and dispatch.

use anyhow::{Context, Result};
use bankgate_core::config::paths;
use bankgate_core::portal::Portal;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

const LOG_ENV: &str = "BANKGATE_LOG";

#[derive(Parser)]
#[command(name = "bankgate")]
#[command(version)]
#[command(about = "Session, access and onboarding checks for the banking portal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in and show where the portal would land
    Login {
        /// Username, email or mobile number
        #[arg(short, long)]
        user: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "BANKGATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Deep link requested before signing in
        #[arg(long, value_name = "PATH")]
        next: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        mobile: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "BANKGATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and remove the stored session
    Logout,

    /// Show the current session
    Status {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate the gates for a destination
    Check {
        /// Destination path, e.g. /dashboard/neft
        #[arg(value_name = "PATH")]
        path: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the navigation menu for the current actor
    Menu {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show onboarding status and what the profile editor allows
    Profile {
        /// Submit a field, e.g. --set firstName=Asha (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Poll the session and print lifecycle events until it ends
    Watch,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the backend base URL
    SetApi {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logs go to a daily file under the home directory; stdout stays for
/// command output. Logging is skipped if the directory cannot be created.
fn init_logging() -> Option<WorkerGuard> {
    let dir = paths::logs_dir();
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("Warning: logging disabled ({}): {err}", dir.display());
        return None;
    }

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let appender = tracing_appender::rolling::daily(&dir, "bankgate.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .ok()?;
    Some(guard)
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login {
            user,
            password,
            next,
        } => commands::auth::login(&open_portal()?, &user, password, next.as_deref()).await,
        Commands::Register {
            username,
            email,
            mobile,
            password,
        } => {
            let registration = commands::auth::registration(username, email, mobile, password)?;
            commands::auth::register(&open_portal()?, &registration).await
        }
        Commands::Logout => {
            commands::auth::logout(&open_portal()?);
            Ok(())
        }
        Commands::Status { json } => commands::session::status(&open_portal()?, json).await,
        Commands::Watch => commands::session::watch(&open_portal()?).await,
        Commands::Check { path, json } => {
            commands::navigation::check(&open_portal()?, &path, json).await
        }
        Commands::Menu { json } => commands::navigation::menu(&open_portal()?, json).await,
        Commands::Profile { set } => {
            if set.is_empty() {
                commands::profile::show(&open_portal()?).await
            } else {
                let submission = commands::profile::parse_fields(&set)?;
                commands::profile::submit(&open_portal()?, &submission).await
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetApi { url } => commands::config::set_api(&url),
        },
    }
}

fn open_portal() -> Result<Portal> {
    Portal::open().context("open portal")
}
