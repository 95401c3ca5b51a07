// CLI interface
pub mod commands;

use crate::error::Result;
use crate::resolver::ProfileSelector;
use crate::session::ExportFormat;
use crate::sso_config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "ssosync")]
#[command(
    about = "Refresh ~/.aws/credentials from AWS SSO for tools that only read static credentials",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Sync only this profile from ~/.aws/config
    #[arg(short, long, conflicts_with_all = ["starturl", "config"])]
    pub profile: Option<String>,

    /// Sync every profile that uses this SSO start URL
    #[arg(short = 's', long, conflicts_with = "config")]
    pub starturl: Option<String>,

    /// Declarative SSO config listing the accounts to sync
    /// (defaults to ./ssosync.config.json when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ignore the cached SSO session and log in again
    #[arg(short, long)]
    pub force: bool,

    /// Print the profile's credentials instead of writing the credentials file
    #[arg(short, long, value_enum, value_name = "FORMAT", requires = "profile")]
    pub export: Option<ExportFormat>,

    /// Never try to open a browser
    #[arg(long, global = true)]
    pub headless: bool,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show cached SSO sessions and credential expirations
    Status {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Forget the cached SSO session for the selected start URL
    Logout,

    /// Print a shell completion script, e.g. `eval "$(ssosync completions bash)"`
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Which profiles the run applies to, looking for a default config file in `cwd`
    pub fn selector_in(&self, cwd: &Path) -> ProfileSelector {
        if let Some(name) = &self.profile {
            return ProfileSelector::ProfileName(name.clone());
        }
        if let Some(url) = &self.starturl {
            return ProfileSelector::StartUrl(url.clone());
        }
        if let Some(path) = &self.config {
            return ProfileSelector::ConfigFile(path.clone());
        }
        let default_config = cwd.join(DEFAULT_CONFIG_FILE);
        if default_config.is_file() {
            tracing::debug!("Using {}", default_config.display());
            return ProfileSelector::ConfigFile(default_config);
        }
        ProfileSelector::AutoDetect
    }

    pub fn selector(&self) -> Result<ProfileSelector> {
        Ok(self.selector_in(&std::env::current_dir()?))
    }
}

pub async fn execute(args: Cli) -> Result<()> {
    match &args.command {
        Some(Commands::Completions { shell }) => {
            commands::completions::execute(*shell);
            Ok(())
        }
        Some(Commands::Status { json }) => {
            let ctx = commands::Context::load(args.headless)?;
            commands::status::execute(&ctx, *json)
        }
        Some(Commands::Logout) => {
            let ctx = commands::Context::load(args.headless)?;
            commands::logout::execute(&ctx, &args.selector()?)
        }
        None => {
            let ctx = commands::Context::load(args.headless)?;
            commands::sync::execute(&ctx, &args.selector()?, args.force, args.export).await
        }
    }
}
