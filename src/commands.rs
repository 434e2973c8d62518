//! Command implementations shared by the `phc` binary.
//!
//! Every operation writes its user-facing messages to `out` and returns `Ok`
//! for anything it can explain to the user. Only unexpected failures (such as
//! an unreadable settings file) escape as errors.

use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::api::{ApplianceApi, ApplianceStatus};
use crate::error::ApiError;
use crate::Settings;

const GENERIC_FAILURE: &str = "Opss! Something went wrong. Try again!";

/// Commands that talk to the appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Up,
    Down(Option<String>),
    Status,
}

impl RemoteCommand {
    fn action(&self) -> &'static str {
        match self {
            RemoteCommand::Up => "enabling",
            RemoteCommand::Down(_) => "disabling",
            RemoteCommand::Status => "checking",
        }
    }
}

pub fn write_usage<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "phc v{}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "-------------")?;
    writeln!(out, "\nUsage:")?;
    writeln!(out, "  phc setUrl <apiUrl>")?;
    writeln!(out, "  phc setSecret <apiSecret>")?;
    writeln!(out, "  phc up")?;
    writeln!(out, "  phc down [seconds]")?;
    writeln!(out, "  phc status")?;
    Ok(())
}

/// Store the appliance URL
///
/// # Errors
///
/// Returns an error if the settings file cannot be read or written.
pub fn set_url<W: Write>(settings_path: &Path, url: Option<&str>, out: &mut W) -> Result<()> {
    let Some(url) = url else {
        writeln!(out, "Please provide url value")?;
        return Ok(());
    };

    let mut settings = Settings::load(settings_path)?;
    settings.api_url = url.to_string();
    settings.save(settings_path)?;
    debug!("saved api url to {}", settings_path.display());

    writeln!(out, "Url has been set")?;
    Ok(())
}

/// Store the appliance API secret
///
/// # Errors
///
/// Returns an error if the settings file cannot be read or written.
pub fn set_secret<W: Write>(
    settings_path: &Path,
    secret: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let Some(secret) = secret else {
        writeln!(out, "Please provide secret value")?;
        return Ok(());
    };

    let mut settings = Settings::load(settings_path)?;
    settings.api_secret = secret.to_string();
    settings.save(settings_path)?;
    debug!("saved api secret to {}", settings_path.display());

    writeln!(out, "Secret has been set")?;
    Ok(())
}

/// Print guidance and usage when the URL or secret is missing.
///
/// Returns whether remote commands may proceed.
pub fn check_prerequisites<W: Write>(settings: &Settings, out: &mut W) -> Result<bool> {
    if !settings.has_url() {
        writeln!(
            out,
            "please use setUrl and setSecret to provide your pi-hole's api url and secret."
        )?;
        write_usage(out)?;
        return Ok(false);
    }

    if !settings.has_secret() {
        writeln!(
            out,
            "API secret has not been set. Use setSecret to provide your pi-hole's api secret."
        )?;
        write_usage(out)?;
        return Ok(false);
    }

    Ok(true)
}

/// Validate settings, connect, then run one remote command
///
/// `connect` is only invoked once both URL and secret are present.
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn run_remote<A, F, W>(
    settings: &Settings,
    command: &RemoteCommand,
    connect: F,
    out: &mut W,
) -> Result<()>
where
    A: ApplianceApi,
    F: FnOnce(&Settings) -> Result<A, ApiError>,
    W: Write,
{
    if !check_prerequisites(settings, out)? {
        return Ok(());
    }

    let api = match connect(settings) {
        Ok(api) => api,
        Err(e) => return report_api_error(command.action(), &e, out),
    };

    match command {
        RemoteCommand::Up => up(&api, out),
        RemoteCommand::Down(seconds) => down(&api, parse_seconds(seconds.as_deref()), out),
        RemoteCommand::Status => status(&api, out),
    }
}

/// Reject a subcommand nobody recognises, after the usual settings checks
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn unknown_command<W: Write>(settings: &Settings, name: &str, out: &mut W) -> Result<()> {
    if !check_prerequisites(settings, out)? {
        return Ok(());
    }

    writeln!(out, "Unknown command '{name}'")?;
    write_usage(out)
}

/// Enable filtering
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn up<A: ApplianceApi, W: Write>(api: &A, out: &mut W) -> Result<()> {
    match api.enable() {
        Ok(response) if response.state() == ApplianceStatus::Enabled => {
            writeln!(out, "Pi-Hole has been enabled.")?;
        }
        Ok(response) => {
            debug!("enable answered with status '{}'", response.status);
            writeln!(out, "{GENERIC_FAILURE}")?;
        }
        Err(e) => report_api_error("enabling", &e, out)?,
    }
    Ok(())
}

/// Disable filtering for `seconds`, zero meaning until re-enabled
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn down<A: ApplianceApi, W: Write>(api: &A, seconds: u64, out: &mut W) -> Result<()> {
    match api.disable(seconds) {
        Ok(response) if response.state() == ApplianceStatus::Disabled => {
            if seconds == 0 {
                writeln!(out, "Pi-Hole has been disabled.")?;
            } else {
                writeln!(out, "Pi-Hole has been disabled for {seconds} second(s)")?;
            }
        }
        Ok(response) => {
            debug!("disable answered with status '{}'", response.status);
            writeln!(out, "{GENERIC_FAILURE}")?;
        }
        Err(e) => report_api_error("disabling", &e, out)?,
    }
    Ok(())
}

/// Report the current filtering state
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn status<A: ApplianceApi, W: Write>(api: &A, out: &mut W) -> Result<()> {
    match api.status().map(|response| response.state()) {
        Ok(ApplianceStatus::Enabled) => writeln!(out, "Pi-Hole is enabled.")?,
        Ok(ApplianceStatus::Disabled) => writeln!(out, "Pi-Hole is disabled.")?,
        Ok(ApplianceStatus::Other(other)) => {
            debug!("status answered with '{other}'");
            writeln!(out, "{GENERIC_FAILURE}")?;
        }
        Err(e) => report_api_error("checking", &e, out)?,
    }
    Ok(())
}

/// Duration argument of `down`; negative or non-integer values mean 0
#[must_use]
pub fn parse_seconds(arg: Option<&str>) -> u64 {
    match arg {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(seconds) if seconds < 0 => {
                warn!("negative duration '{raw}', disabling until re-enabled");
                0
            }
            Ok(seconds) => seconds.unsigned_abs(),
            Err(_) => {
                warn!("ignoring invalid duration '{raw}', disabling until re-enabled");
                0
            }
        },
        None => 0,
    }
}

fn report_api_error<W: Write>(action: &str, err: &ApiError, out: &mut W) -> Result<()> {
    writeln!(out, "something went wrong while {action} your pi-hole : {err}")?;
    writeln!(
        out,
        "Check that your api secret is correct and that the pi-hole is reachable."
    )?;
    Ok(())
}
