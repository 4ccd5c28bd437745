use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::debug;

use crate::errors::ConfigError;

/// Default listen address; port 0 picks a free port
pub const DEFAULT_ADDRESS: &str = "localhost:0";

/// Command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(name = "log-viewer", version)]
#[command(about = "Browse log files over HTTP")]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, env = "LOG_VIEWER_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Directory whose files are served; defaults to the current directory
    #[arg(short, long, env = "LOG_VIEWER_WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,

    /// Serve page templates from this directory instead of the built-in set
    #[arg(short, long, env = "LOG_VIEWER_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

/// Application configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    pub working_directory: Arc<PathBuf>,
    pub templates: Option<PathBuf>,
}

impl Config {
    /// Resolve arguments into a configuration.
    ///
    /// The working directory is made absolute and must exist.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let requested = match args.working_directory {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let working_directory =
            requested
                .canonicalize()
                .map_err(|source| ConfigError::WorkingDirectory {
                    path: requested.clone(),
                    source,
                })?;
        if !working_directory.is_dir() {
            return Err(ConfigError::NotADirectory(working_directory));
        }
        debug!("Working directory: {:?}", working_directory);

        Ok(Self {
            address: args.address,
            working_directory: Arc::new(working_directory),
            templates: args.templates,
        })
    }
}
