use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub mod api;
pub mod commands;
pub mod error;

// Constants
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// Locally persisted appliance settings
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(rename = "ApiUrl", default, deserialize_with = "null_as_empty")]
    pub api_url: String,
    #[serde(rename = "ApiSecret", default, deserialize_with = "null_as_empty")]
    pub api_secret: String,
}

// Older settings files store unset fields as null
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Settings {
    /// Load settings from file
    ///
    /// A missing file yields empty settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or contains invalid JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Ok(Self::default());
        }

        let path_str = path_ref.to_string_lossy();
        let content = fs::read_to_string(path_ref)
            .with_context(|| format!("failed to read settings from {path_str}"))?;

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON from {path_str}"))
    }

    /// Save settings to file, overwriting any previous content
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or permissions cannot be set.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();

        let content = serde_json::to_string_pretty(self)
            .with_context(|| "failed to serialize settings to JSON")?;
        fs::write(path_ref, content)
            .with_context(|| format!("failed to write settings to {path_str}"))?;

        // The file holds the API secret - set to 600 (rw-------)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path_ref)
                .with_context(|| format!("failed to get metadata for {path_str}"))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path_ref, perms)
                .with_context(|| format!("failed to set permissions for {path_str}"))?;
        }

        Ok(())
    }

    #[must_use]
    pub fn has_url(&self) -> bool {
        !self.api_url.is_empty()
    }

    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.api_secret.is_empty()
    }
}

/// Settings file location next to the running executable
///
/// # Errors
///
/// Returns an error if the executable path cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    let exe = env::current_exe().context("failed to locate the running executable")?;
    let dir = exe
        .parent()
        .context("executable path has no parent directory")?;
    Ok(dir.join(SETTINGS_FILE_NAME))
}
