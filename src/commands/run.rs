//! One full toolbox run, from CLI arguments to the printed summary.
//!
//! Order matters and is fixed: workdir layout, config resolution, platform
//! and dependency gates, activation script composition, then the install
//! loop. The activation script is composed and written *before* any
//! installer runs, so a failed install still leaves a sourceable script for
//! whatever was already in place from earlier runs.

use crate::errors::ToolboxError;
use crate::installers::{self, OverwritePolicy};
use crate::libs::activation::{ActivationScript, Placeholder};
use crate::libs::config_loading::{self, Config};
use crate::libs::workdir::WorkDir;
use crate::libs::{summary, validators};
use crate::{log_debug, log_info};
use colored::Colorize;
use std::path::PathBuf;

pub struct RunArgs {
    pub config_path: PathBuf,
    pub workdir_root: PathBuf,
    pub toolbox_name: String,
    pub info_only: bool,
    pub overwrite_configs: OverwritePolicy,
    pub templates_dir: Option<PathBuf>,
}

pub fn execute(args: RunArgs) -> Result<(), ToolboxError> {
    let workdir = WorkDir::new(&args.workdir_root);
    workdir.prepare()?;

    let config = config_loading::load(
        &args.config_path,
        &workdir,
        &args.toolbox_name,
        args.templates_dir,
    )?;

    if args.info_only {
        println!("{}", summary::render(&config, &workdir));
        return Ok(());
    }

    validators::validate_platform(&config)?;
    validators::check_dependencies(&config)?;

    let installers = installers::build(&config, &workdir, args.overwrite_configs);
    write_activation_script(&config, &workdir, &installers)?;

    {
        let _scratch = workdir.scratch_guard();
        for installer in &installers {
            if installer.enabled() {
                installer.install()?;
            } else {
                log_debug!("'{}' disabled, skip install", installer.name());
            }
        }
    }

    summary::save(&config, &workdir).map_err(|e| {
        ToolboxError::Workdir(format!("cannot write the summary file: {e}"))
    })?;
    log_info!("{}", "Toolbox ready".bright_green());
    println!("\n{}", summary::render(&config, &workdir));
    Ok(())
}

/// Composes the activation script: toolbox-wide values first, then every
/// adapter (enabled or not) in registration order, then validate-and-write.
fn write_activation_script(
    config: &Config,
    workdir: &WorkDir,
    installers: &[Box<dyn installers::Installer>],
) -> Result<(), ToolboxError> {
    let mut script = ActivationScript::from_template(config.template_text("activate.sh")?);
    script.apply(
        "toolbox",
        &[
            (Placeholder("TOOLBOX_NAME"), config.toolbox_name.clone()),
            (Placeholder("WORKDIR_ROOT"), workdir.root.display().to_string()),
            (Placeholder("WORKDIR_TMP"), workdir.tmp.display().to_string()),
            (Placeholder("WORKDIR_BIN"), workdir.bin.display().to_string()),
        ],
    )?;
    for installer in installers {
        script.apply(installer.name(), &installer.activation_replacements())?;
    }
    script.write(&config.activate_path)
}
