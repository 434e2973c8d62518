use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use phc::api::PiHoleClient;
use phc::commands::{self, RemoteCommand};
use phc::{default_settings_path, Settings};

// CLI arguments parsing structure
#[derive(Parser)]
#[command(name = "phc", author, version, about, long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    /// Settings file to use instead of settings.json next to the executable
    #[arg(long, global = true, env = "PHC_SETTINGS", value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the pi-hole admin URL, e.g. http://pi.hole/admin
    #[command(name = "setUrl")]
    SetUrl {
        #[arg(allow_hyphen_values = true)]
        api_url: Option<String>,
        // Extra arguments are ignored
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
    /// Store the pi-hole API secret
    #[command(name = "setSecret")]
    SetSecret {
        #[arg(allow_hyphen_values = true)]
        api_secret: Option<String>,
        // Extra arguments are ignored
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
    /// Enable filtering
    Up {
        // Extra arguments are ignored
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
    /// Disable filtering, for the given number of seconds or until re-enabled
    Down {
        #[arg(allow_hyphen_values = true)]
        seconds: Option<String>,
        // Extra arguments are ignored
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
    /// Show whether filtering is enabled
    Status {
        // Extra arguments are ignored
        #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        _rest: Vec<String>,
    },
    #[command(external_subcommand)]
    Other(Vec<String>),
}

// Execute the selected command
pub fn execute_command(cli: &Cli) -> Result<()> {
    let mut stdout = io::stdout().lock();

    let Some(command) = &cli.command else {
        return commands::write_usage(&mut stdout);
    };

    let settings_path = match &cli.settings {
        Some(path) => path.clone(),
        None => default_settings_path()?,
    };
    debug!("using settings file {}", settings_path.display());

    match command {
        Commands::SetUrl { api_url, .. } => {
            commands::set_url(&settings_path, api_url.as_deref(), &mut stdout)
        }
        Commands::SetSecret { api_secret, .. } => {
            commands::set_secret(&settings_path, api_secret.as_deref(), &mut stdout)
        }
        Commands::Up { .. } => cmd_remote(&settings_path, &RemoteCommand::Up, &mut stdout),
        Commands::Down { seconds, .. } => cmd_remote(
            &settings_path,
            &RemoteCommand::Down(seconds.clone()),
            &mut stdout,
        ),
        Commands::Status { .. } => cmd_remote(&settings_path, &RemoteCommand::Status, &mut stdout),
        Commands::Other(args) => {
            let settings = load_settings(&settings_path)?;
            let name = args.first().map(String::as_str).unwrap_or_default();
            commands::unknown_command(&settings, name, &mut stdout)
        }
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(path).context("failed to load settings")
}

fn cmd_remote<W: Write>(settings_path: &Path, command: &RemoteCommand, out: &mut W) -> Result<()> {
    let settings = load_settings(settings_path)?;
    commands::run_remote(
        &settings,
        command,
        |settings| PiHoleClient::new(&settings.api_url, &settings.api_secret),
        out,
    )
}
