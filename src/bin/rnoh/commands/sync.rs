//! `rnoh sync` command

use anyhow::Result;

use crate::cli::SyncArgs;
use rnoh::core::ModuleOptions;
use rnoh::ops::SyncTask;
use rnoh::util::config::load_options;
use rnoh::util::shell::Status;
use rnoh::util::{Environment, Shell, ShellExecutor};

pub fn execute(args: SyncArgs, shell: &Shell) -> Result<()> {
    let env = Environment::from_process()?;

    let options = match &args.options {
        Some(path) => load_options(env.resolve(path).as_path())?,
        None => ModuleOptions::default(),
    };

    SyncTask::new(&ShellExecutor, &env).run(&options)?;
    shell.status(Status::Finished, "sync");
    Ok(())
}
