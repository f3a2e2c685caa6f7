//! `rnoh bundle-harmony` command

use anyhow::Result;

use crate::cli::BundleHarmonyArgs;
use rnoh::ops::bundle::{bundle, BundleOptions, MetroBundler};
use rnoh::util::Environment;

pub fn execute(args: BundleHarmonyArgs) -> Result<()> {
    let env = Environment::from_process()?;
    let bundler = MetroBundler::locate(env.cwd().clone())?;

    let options = BundleOptions {
        entry_file: args.entry_file,
        dev: args.dev,
        minify: args.minify,
        config: args.config,
        bundle_output: args.bundle_output,
        assets_dest: Some(args.assets_dest),
        sourcemap_output: args.sourcemap_output,
    };

    bundle(&env, &bundler, &options)?;
    Ok(())
}
