mod configure;
mod install;
mod list;
mod outdated;
mod publish;
mod search;
mod show;
mod uninstall;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::registry::{SearchSort, SortDirection};
use crate::session::Session;
use crate::Result;

#[derive(Parser)]
#[command(name = "nbpm")]
#[command(about = "Install, update, search, and publish plugins and themes for the notebook app")]
#[command(version)]
pub struct Cli {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up the access key used to talk to the registry
    Configure,

    /// List installed packages
    #[command(visible_alias = "ls")]
    List,

    /// List installed packages that have newer releases
    Outdated,

    /// Install a package
    Install {
        /// Package name
        name: String,

        /// Install this version instead of the latest
        #[arg(short = 'v', long)]
        version: Option<String>,
    },

    /// Update an installed package
    Update {
        /// Package name
        name: String,

        /// Update to this version instead of the latest
        #[arg(short = 'v', long)]
        version: Option<String>,
    },

    /// Uninstall a package
    #[command(visible_alias = "remove")]
    Uninstall {
        /// Package name
        name: String,
    },

    /// Search the registry
    Search {
        /// Search terms
        query: String,

        /// Sort results by
        #[arg(short, long, value_enum)]
        sort: Option<SearchSort>,

        /// Sort direction
        #[arg(short, long, value_enum)]
        direction: Option<SortDirection>,
    },

    /// Show registry details for a package
    #[command(visible_alias = "info")]
    Show {
        /// Package name
        name: String,
    },

    /// Publish the package in a directory
    Publish {
        /// Package directory containing package.json
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Let the registry validate the package without publishing it
        #[arg(long)]
        dry_run: bool,
    },
}

impl Commands {
    /// Everything except `configure` needs a credential first.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Commands::Configure)
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let settings = Settings::load()?;
        let mut session = Session::system(settings);
        self.execute(&mut session)
    }

    pub fn execute(self, session: &mut Session) -> Result<()> {
        if self.command.requires_auth() {
            session.ensure_authenticated()?;
        }

        match self.command {
            Commands::Configure => configure::run(session),
            Commands::List => list::run(session),
            Commands::Outdated => outdated::run(session),
            Commands::Install { name, version } => install::install(session, &name, version.as_deref()),
            Commands::Update { name, version } => install::update(session, &name, version.as_deref()),
            Commands::Uninstall { name } => uninstall::run(session, &name),
            Commands::Search {
                query,
                sort,
                direction,
            } => search::run(session, &query, sort, direction),
            Commands::Show { name } => show::run(session, &name),
            Commands::Publish { path, dry_run } => publish::run(session, path, dry_run),
        }
    }
}
