//! `rnoh run-harmony` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::RunHarmonyArgs;
use rnoh::ops::run::{run_harmony, RunOptions};
use rnoh::util::{Environment, Shell, ShellExecutor};

pub fn execute(args: RunHarmonyArgs, shell: &Arc<Shell>) -> Result<()> {
    let env = Environment::from_process()?;

    let options = RunOptions {
        harmony_project_path: args.harmony_project_path,
        module: args.module,
        build_mode: args.build_mode,
        product: args.product,
        ability: args.ability,
        simulator: args.simulator,
        port: args.port,
        packager: !args.no_packager,
    };

    run_harmony(&ShellExecutor, &env, shell, &options)
}
