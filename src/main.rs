mod commands;
mod install;
mod version;

use clap::{CommandFactory, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use commands::{dispatch, InstallCommand};
use install::{InstallContext, InstallRequest, NpmInstaller, Registry};

#[derive(Parser, Debug)]
#[command(name = "install-tool")]
#[command(about = "Installs a npm package into the container")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Package name (default install path, registry npm)
    pub name: Option<String>,

    /// Version to install; resolved from the environment when omitted
    #[arg(id = "pkg_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Validate and log without changing the container
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install a package from a registry into the container
    Install(InstallArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Registry to install from
    #[arg(value_enum)]
    pub registry: Registry,

    /// Package name
    pub name: String,

    /// Version to install; resolved from the environment when omitted
    pub version: Option<String>,

    /// Validate and log without changing the container
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
}

impl InstallArgs {
    /// Map parsed arguments onto a command form
    ///
    /// An explicit version always wins; the resolver is only consulted
    /// when the version argument is absent.
    fn into_command(self) -> InstallCommand {
        match self.version {
            Some(version) => InstallCommand::Explicit(InstallRequest {
                name: self.name,
                version,
                dry_run: self.dry_run,
                registry: self.registry,
            }),
            None => InstallCommand::Env {
                registry: self.registry,
                name: self.name,
                dry_run: self.dry_run,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();

    let command = match args.command {
        Some(Command::Install(install_args)) => install_args.into_command(),
        None => match args.name {
            Some(name) => InstallArgs {
                registry: Registry::Npm,
                name,
                version: args.version,
                dry_run: args.dry_run,
            }
            .into_command(),
            None => {
                let _ = Args::command().print_help();
                return ExitCode::from(2);
            }
        },
    };

    let ctx = InstallContext::new(Arc::new(NpmInstaller));
    ExitCode::from(dispatch(&ctx, command).await)
}
