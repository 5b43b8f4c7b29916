use crate::cli::{Cli, LogLevel};
use crate::sync::SyncOptions;

/// Resolved runtime configuration. Owns everything `main` needs after
/// argument parsing; the Debug impl never prints the access token.
pub struct Config {
    pub project_id: String,
    pub screen_id: Option<String>,
    pub metadata_only: bool,
    pub formats: Vec<String>,
    pub densities: Vec<String>,
    pub directory: Option<String>,
    pub access_token: String,
    pub no_progress_bar: bool,
    pub log_level: LogLevel,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            project_id: cli.project_id,
            screen_id: cli.screen_id,
            metadata_only: cli.metadata_only,
            formats: cli.formats,
            densities: cli.densities,
            directory: cli.directory.map(|d| expand_tilde(&d)),
            access_token: cli.access_token,
            no_progress_bar: cli.no_progress_bar,
            log_level: cli.log_level,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            project_id: self.project_id.clone(),
            screen_id: self.screen_id.clone(),
            metadata_only: self.metadata_only,
            formats: self.formats.clone(),
            densities: self.densities.clone(),
            directory: self.directory.clone(),
            no_progress_bar: self.no_progress_bar,
        }
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("screen_id", &self.screen_id)
            .field("metadata_only", &self.metadata_only)
            .field("formats", &self.formats)
            .field("densities", &self.densities)
            .field("directory", &self.directory)
            .field("access_token", &"<redacted>")
            .field("no_progress_bar", &self.no_progress_bar)
            .finish_non_exhaustive()
    }
}
