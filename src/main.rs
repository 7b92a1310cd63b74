use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use envelope_kyc::cli::{
    handle_clear_command, handle_config_command, handle_status_command, run_wizard, Console,
};
use envelope_kyc::config::{paths::KycPaths, settings::Settings};
use envelope_kyc::models::UserId;

#[derive(Parser)]
#[command(
    name = "envelope-kyc",
    author = "Kaylee Beyene",
    version,
    about = "Resumable identity verification wizard",
    long_about = "envelope-kyc walks you through identity verification in the \
                  terminal. Progress is saved as you type, sensitive answers are \
                  encrypted on disk, and an interrupted session can be resumed."
)]
struct Cli {
    /// User the session belongs to (anonymous when omitted)
    #[arg(short, long, global = true, env = "ENVELOPE_KYC_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in (or resume) the verification wizard
    #[command(alias = "start")]
    Wizard,

    /// Show verification status and saved progress
    Status,

    /// Discard saved progress
    Clear {
        /// Also forget the recorded verification status
        #[arg(long)]
        status: bool,
    },

    /// Show current configuration and paths
    Config,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    // Initialize paths and settings
    let paths = KycPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let user = UserId::from_option(cli.user);

    match cli.command {
        Some(Commands::Wizard) => {
            let mut console = Console::stdin();
            run_wizard(&paths, &settings, user, &mut console)?;
        }
        Some(Commands::Status) => {
            handle_status_command(&paths, &settings, &user)?;
        }
        Some(Commands::Clear { status }) => {
            handle_clear_command(&paths, &user, status)?;
        }
        Some(Commands::Config) => {
            handle_config_command(&paths, &settings)?;
        }
        None => {
            println!("envelope-kyc - Resumable identity verification");
            println!();
            println!("Run 'envelope-kyc --help' for usage information.");
            println!("Run 'envelope-kyc wizard' to start or resume verification.");
        }
    }

    Ok(())
}
