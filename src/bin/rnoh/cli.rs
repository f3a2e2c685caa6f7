//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use rnoh::ops::bundle::{DEFAULT_ASSETS_DEST, DEFAULT_BUNDLE_OUTPUT, DEFAULT_ENTRY_FILE};
use rnoh::util::shell::ColorChoice;

/// rnoh - build, bundle and run React Native apps on OpenHarmony
#[derive(Parser)]
#[command(name = "rnoh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run codegen and autolinking the way the build plugin does
    Sync(SyncArgs),

    /// Create the JS bundle and copy its assets into the native project
    BundleHarmony(BundleHarmonyArgs),

    /// Build the app, install it on a device and open it
    RunHarmony(RunHarmonyArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Module plugin options (.json, .json5 or .toml); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,
}

/// `--flag`, `--flag true` and `--flag false`; anything but "false" is true.
fn parse_bool_flag(value: &str) -> Result<bool, String> {
    Ok(value != "false")
}

#[derive(Args)]
pub struct BundleHarmonyArgs {
    /// If false, warnings are disabled and the bundle is minified
    #[arg(
        long,
        value_name = "BOOLEAN",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true",
        value_parser = parse_bool_flag
    )]
    pub dev: bool,

    /// Path to the root JS file, either absolute or relative to JS root
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ENTRY_FILE)]
    pub entry_file: String,

    /// Path to the Metro configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File name where to store the resulting bundle
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BUNDLE_OUTPUT)]
    pub bundle_output: PathBuf,

    /// Directory name where to store assets referenced in the bundle
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ASSETS_DEST)]
    pub assets_dest: PathBuf,

    /// File name where to store the resulting source map
    #[arg(long, value_name = "PATH")]
    pub sourcemap_output: Option<PathBuf>,

    /// Override whether the bundle is minified
    #[arg(
        long,
        value_name = "BOOLEAN",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_bool_flag
    )]
    pub minify: Option<bool>,
}

#[derive(Args)]
pub struct RunHarmonyArgs {
    /// Root of the OpenHarmony project
    #[arg(long, value_name = "PATH", default_value = "./harmony")]
    pub harmony_project_path: PathBuf,

    /// Name of the module to run
    #[arg(long, default_value = "entry")]
    pub module: String,

    /// debug or release
    #[arg(long, default_value = "debug")]
    pub build_mode: String,

    /// Product defined in build-profile.json5
    #[arg(long, default_value = "default")]
    pub product: String,

    /// Name of the ability to start
    #[arg(long, default_value = "EntryAbility")]
    pub ability: String,

    /// Name of a connected simulator to run on
    #[arg(long, value_name = "NAME")]
    pub simulator: Option<String>,

    /// Dev server port [default: $RCT_METRO_PORT or 8081]
    #[arg(long)]
    pub port: Option<u16>,

    /// Do not launch the dev server
    #[arg(long)]
    pub no_packager: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bundle_boolean_flags() {
        let parse = |args: &[&str]| {
            let cli = Cli::try_parse_from([&["rnoh", "bundle-harmony"][..], args].concat()).unwrap();
            match cli.command {
                Commands::BundleHarmony(args) => args,
                _ => unreachable!(),
            }
        };

        let args = parse(&[]);
        assert!(args.dev);
        assert_eq!(args.minify, None);
        assert_eq!(args.entry_file, "index.js");

        let args = parse(&["--dev", "false", "--minify"]);
        assert!(!args.dev);
        assert_eq!(args.minify, Some(true));

        let args = parse(&["--dev", "--minify", "false"]);
        assert!(args.dev);
        assert_eq!(args.minify, Some(false));
    }

    #[test]
    fn test_run_harmony_defaults() {
        let cli = Cli::try_parse_from(["rnoh", "run-harmony", "--no-packager"]).unwrap();
        let Commands::RunHarmony(args) = cli.command else {
            unreachable!()
        };
        assert!(args.no_packager);
        assert_eq!(args.module, "entry");
        assert_eq!(args.port, None);
    }
}
