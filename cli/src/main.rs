use relate::commands::{self, Session};
use relate::{config, logging};

use anyhow::{Context, Result};
use clap::Parser;
use relate_core::EnvPaths;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relate",
    about = "Install, run and extend local DBMS instances",
    version
)]
struct Cli {
    /// Environment to operate on (defaults to the configured default)
    #[arg(long, short = 'e', global = true, value_name = "ID")]
    environment: Option<String>,

    /// Mirror all log output to the terminal
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Install, start, stop and inspect DBMSs
    Dbms {
        #[command(subcommand)]
        command: DbmsCommand,
    },

    /// Find, install and link extensions
    #[command(alias = "ext")]
    Extension {
        #[command(subcommand)]
        command: ExtensionCommand,
    },

    /// Manage configured environments
    #[command(alias = "env")]
    Environment {
        #[command(subcommand)]
        command: EnvironmentCommand,
    },
}

#[derive(Parser)]
enum DbmsCommand {
    /// Install a new DBMS
    ///
    /// The version can be:
    ///   a semver version or range    4.0.4, 4.0, >=4.1
    ///   a distribution archive       ./neo4j-enterprise-4.0.4-unix.tar.gz
    ///   an extracted distribution    ./neo4j-enterprise-4.0.4
    ///
    /// Examples:
    ///   relate dbms install 4.0 --name movies --credentials secret
    ///   relate dbms install ./neo4j-community-4.1.0-unix.tar.gz
    Install {
        /// Version, archive or directory to install from
        version: String,

        /// Name for the new DBMS
        #[arg(long, short = 'n', default_value = "neo4j")]
        name: String,

        /// Initial password
        #[arg(long, short = 'c', default_value = "")]
        credentials: String,
    },

    /// Start one or more DBMSs
    Start {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Stop one or more DBMSs
    Stop {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Show the status of one or more DBMSs
    Status {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// List installed DBMSs
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Open a DBMS directory in the file manager
    Open {
        id: String,

        /// Print the directory instead of opening it
        #[arg(long, short = 'L')]
        log: bool,
    },

    /// Create an access token an application can use to reach a DBMS
    AccessToken {
        app_id: String,
        dbms_id: String,

        #[arg(long, default_value = "neo4j")]
        principal: String,

        #[arg(long, default_value = "")]
        credentials: String,
    },
}

#[derive(Parser)]
enum ExtensionCommand {
    /// List extension versions in the cache and the registry
    Versions {
        #[arg(long)]
        json: bool,
    },

    /// List installed extensions
    List {
        #[arg(long)]
        json: bool,
    },

    /// Install an extension by version, range or local directory
    ///
    /// Examples:
    ///   relate extension install graph-app 1.2.0
    ///   relate extension install graph-app ./graph-app
    Install { name: String, version: String },

    /// Link a local extension directory instead of copying it
    Link { path: PathBuf },
}

#[derive(Parser)]
enum EnvironmentCommand {
    /// List configured environments (* marks the default)
    List,

    /// Show paths and settings of the selected environment
    Info,

    /// Add an environment; with --remote-url it is a remote environment
    Add {
        id: String,

        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
    },

    /// Make an environment the default
    Use { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = EnvPaths::from_env().context("Failed to resolve relate directories")?;
    logging::init(&paths.logs(), cli.verbose)?;

    let config = config::load_config(&paths)?;
    let environment = config.resolve(cli.environment.as_deref(), &paths)?;
    let session = Session {
        paths,
        config,
        environment,
    };

    match cli.command {
        Command::Dbms { command } => match command {
            DbmsCommand::Install {
                version,
                name,
                credentials,
            } => commands::dbms::install(&session, &name, &credentials, &version).await,
            DbmsCommand::Start { ids } => commands::dbms::start(&session, &ids).await,
            DbmsCommand::Stop { ids } => commands::dbms::stop(&session, &ids).await,
            DbmsCommand::Status { ids } => commands::dbms::status(&session, &ids).await,
            DbmsCommand::List { json } => commands::dbms::list(&session, json).await,
            DbmsCommand::Open { id, log } => commands::dbms::open(&session, &id, log).await,
            DbmsCommand::AccessToken {
                app_id,
                dbms_id,
                principal,
                credentials,
            } => {
                commands::dbms::access_token(&session, &app_id, &dbms_id, &principal, &credentials)
                    .await
            }
        },

        Command::Extension { command } => match command {
            ExtensionCommand::Versions { json } => {
                commands::extension::versions(&session, json).await
            }
            ExtensionCommand::List { json } => commands::extension::list(&session, json).await,
            ExtensionCommand::Install { name, version } => {
                commands::extension::install(&session, &name, &version).await
            }
            ExtensionCommand::Link { path } => commands::extension::link(&session, &path).await,
        },

        Command::Environment { command } => match command {
            EnvironmentCommand::List => commands::environment::list(&session),
            EnvironmentCommand::Info => commands::environment::info(&session),
            EnvironmentCommand::Add { id, remote_url } => {
                commands::environment::add(&session, &id, remote_url)
            }
            EnvironmentCommand::Use { id } => commands::environment::use_environment(&session, &id),
        },
    }
}
