mod commands;
mod errors;
mod installers;
mod libs;
mod logger;
mod schemas;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;

use crate::commands::run::{self, RunArgs};
use crate::installers::OverwritePolicy;

#[derive(Parser)]
#[command(name = "admin-toolbox")]
#[command(about = "Install an isolated toolbox of infrastructure CLIs", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: String,

    /// Workdir holding binaries and per-tool state (default: ~/.admin-toolbox)
    #[arg(short, long)]
    workdir: Option<String>,

    /// Toolbox name, shown in the shell prompt of activated sessions
    #[arg(short = 'n', long)]
    toolbox_name: String,

    /// Print the post-install summary and exit without installing
    #[arg(short, long)]
    info: bool,

    /// What to do when a generated config file would overwrite an edited one
    #[arg(long, value_enum, default_value_t = OverwritePolicy::Ask)]
    overwrite_configs: OverwritePolicy,

    /// Directory with activation/config templates (default: built-in templates)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let workdir_root = match cli.workdir {
        Some(raw) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
        None => match dirs::home_dir() {
            Some(home) => home.join(".admin-toolbox"),
            None => {
                log_error!("Cannot resolve $HOME for the default workdir, pass --workdir");
                process::exit(1);
            }
        },
    };

    let args = RunArgs {
        config_path: PathBuf::from(shellexpand::tilde(&cli.config).into_owned()),
        workdir_root,
        toolbox_name: cli.toolbox_name,
        info_only: cli.info,
        overwrite_configs: cli.overwrite_configs,
        templates_dir: cli.templates,
    };

    if let Err(err) = run::execute(args) {
        log_error!("{}", err);
        process::exit(1);
    }
}
