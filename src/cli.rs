use clap::{Parser, ValueEnum};

/// Download a Zeplin project's screens, layers and exported assets into
/// a local directory tree with machine-readable metadata.
#[derive(Parser, Debug)]
#[command(name = "zeplin-sync", version, about)]
pub struct Cli {
    /// Project to sync
    #[arg(short = 'p', long)]
    pub project_id: String,

    /// Sync only this screen
    #[arg(short = 's', long)]
    pub screen_id: Option<String>,

    /// Write metadata.json and log.json without downloading assets
    #[arg(long)]
    pub metadata_only: bool,

    /// Asset formats to download
    #[arg(
        short = 'f',
        long,
        value_delimiter = ',',
        default_value = "png,jpg,webp,svg,pdf"
    )]
    pub formats: Vec<String>,

    /// Asset densities to download
    #[arg(short = 'e', long, value_delimiter = ',', default_value = "1,1.5,2,3,4")]
    pub densities: Vec<String>,

    /// Output directory (defaults to "<project name>__assets")
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Zeplin personal access token
    #[arg(long, env = "PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Disable the download progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
