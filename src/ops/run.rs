//! `run-harmony`: build the app, install it on a device and open it.
//!
//! All device and build tooling is reached through a [`CommandExecutor`]
//! with complete shell command lines, so the whole flow can be replayed
//! against a recording executor.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use rand::Rng;
use regex::Regex;

use crate::core::AbsolutePath;
use crate::ops::sdk::{shell_path, DevEcoSdk};
use crate::ops::sync::{react_native_cli, DEFAULT_METRO_PORT};
use crate::util::diagnostic::{suggestions, Diagnostic, DiagnosticError};
use crate::util::fs::{read_to_string, write_string};
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Job, Status};
use crate::util::{CommandExecutor, Environment, Shell};

const STAGING_DIR_LEN: usize = 32;
const STAGING_DIR_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `run-harmony` arguments.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub harmony_project_path: PathBuf,
    pub module: String,
    pub build_mode: String,
    pub product: String,
    pub ability: String,
    /// Target this simulator instead of the single connected device.
    pub simulator: Option<String>,
    /// Falls back to `RCT_METRO_PORT`, then 8081.
    pub port: Option<u16>,
    /// Start a dev server when none is listening.
    pub packager: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            harmony_project_path: PathBuf::from("./harmony"),
            module: "entry".to_string(),
            build_mode: "debug".to_string(),
            product: "default".to_string(),
            ability: "EntryAbility".to_string(),
            simulator: None,
            port: None,
            packager: true,
        }
    }
}

/// One row of `hdc list targets -v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub method: String,
    pub state: String,
    pub locate: String,
    pub connect_tool: String,
}

/// Parse `hdc list targets -v` output, one device per non-blank line.
pub fn parse_targets(output: &str) -> Vec<DeviceInfo> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut parts = line.split_whitespace().map(str::to_string);
            let mut next = || parts.next().unwrap_or_default();
            DeviceInfo {
                name: next(),
                method: next(),
                state: next(),
                locate: next(),
                connect_tool: next(),
            }
        })
        .collect()
}

/// Pick the device to install on.
///
/// A named simulator must be listed. Otherwise exactly one connected device
/// is required.
pub fn select_device(devices: &[DeviceInfo], simulator: Option<&str>) -> Result<String> {
    if let Some(name) = simulator {
        if devices.iter().any(|d| d.name == name) {
            return Ok(name.to_string());
        }
        return Err(DiagnosticError(
            Diagnostic::error(format!("Simulator with name \"{}\" not found.", name))
                .with_suggestion("Please confirm whether the entered simulator name has been activated."),
        )
        .into());
    }

    let connected: Vec<&DeviceInfo> = devices.iter().filter(|d| d.state == "Connected").collect();
    match connected.as_slice() {
        [device] => Ok(device.name.clone()),
        [] => Err(DiagnosticError(
            Diagnostic::error("No devices are connected in the current environment.")
                .with_suggestion(suggestions::CONNECT_DEVICE),
        )
        .into()),
        many => {
            let mut diag = Diagnostic::error(format!("{} devices are connected.", many.len()));
            for device in many {
                diag = diag.with_context(device.name.clone());
            }
            Err(DiagnosticError(
                diag.with_suggestion("Pick one with --simulator <name>."),
            )
            .into())
        }
    }
}

static FROM_SERVER_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"MetroJSBundleProvider\.fromServerIp\(\s*"([^"]+)"\s*,\s*(\d+)\s*\)"#)
        .expect("valid provider pattern")
});

static NEW_PROVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"new\s+MetroJSBundleProvider\s*\(\s*\)").expect("valid provider pattern")
});

/// Point the app's Metro bundle provider at `port`.
///
/// Rewrites the first `MetroJSBundleProvider.fromServerIp(host, port)` call,
/// or else inserts one before the first `new MetroJSBundleProvider()`.
pub fn rewrite_metro_port(content: &str, port: u16) -> Option<String> {
    if let Some(caps) = FROM_SERVER_IP.captures(content) {
        let replacement = format!("MetroJSBundleProvider.fromServerIp(\"{}\", {})", &caps[1], port);
        return Some(FROM_SERVER_IP.replace(content, replacement.as_str()).into_owned());
    }
    if NEW_PROVIDER.is_match(content) {
        let replacement = format!(
            "MetroJSBundleProvider.fromServerIp(\"localhost\", {}),\n              new MetroJSBundleProvider()",
            port
        );
        return Some(NEW_PROVIDER.replace(content, replacement.as_str()).into_owned());
    }
    None
}

/// Apply [`rewrite_metro_port`] to `path` in place.
pub fn set_metro_port(path: &Path, port: u16) -> Result<()> {
    let content = read_to_string(path)?;
    match rewrite_metro_port(&content, port) {
        Some(updated) => write_string(path, &updated),
        None => Err(DiagnosticError(
            Diagnostic::error(format!(
                "Unable to set the specified port [{}] for the Metro server automatically.",
                port
            ))
            .with_location(path)
            .with_suggestion(format!(
                "Please manually add \"MetroJSBundleProvider.fromServerIp(\"localhost\", {port})\" in the \"new AnyJSBundleProvider\" section of your {file} file.\n\
                 e.g:\n      new AnyJSBundleProvider([\n        MetroJSBundleProvider.fromServerIp(\"localhost\", {port}),\n        new MetroJSBundleProvider(),\n        new ResourceJSBundleProvider(this.rnohCoreContext.uiAbilityContext.resourceManager, 'hermes_bundle.hbc'),\n      ])",
                port = port,
                file = path.display()
            )),
        )
        .into()),
    }
}

/// A random `[0-9a-z]{32}` name for the device-side staging directory.
pub fn staging_dir_name(rng: &mut impl Rng) -> String {
    (0..STAGING_DIR_LEN)
        .map(|_| STAGING_DIR_CHARS[rng.gen_range(0..STAGING_DIR_CHARS.len())] as char)
        .collect()
}

/// `app.bundleName` from `AppScope/app.json5`.
fn read_bundle_name(harmony_project: &AbsolutePath) -> Result<String> {
    let path = harmony_project.join(["AppScope", "app.json5"]);
    let content = read_to_string(path.as_path())?;
    let app: serde_json::Value =
        json5::from_str(&content).with_context(|| format!("failed to parse {}", path))?;
    app.get("app")
        .and_then(|a| a.get("bundleName"))
        .and_then(|b| b.as_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no app.bundleName", path))
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Build, install and launch the app.
///
/// Every [`DiagnosticError`] leaving this function suggests falling back to
/// DevEco Studio.
pub fn run_harmony(
    executor: &dyn CommandExecutor,
    env: &Environment,
    shell: &Arc<Shell>,
    options: &RunOptions,
) -> Result<()> {
    let run = HarmonyRun::prepare(executor, env, shell, options)
        .and_then(|run| run.execute());
    run.map_err(|err| match err.downcast::<DiagnosticError>() {
        Ok(DiagnosticError(diag)) => DiagnosticError(diag.with_suggestion(suggestions::TRY_DEVECO)).into(),
        Err(err) => err,
    })
}

struct HarmonyRun<'a> {
    executor: &'a dyn CommandExecutor,
    shell: &'a Arc<Shell>,
    options: &'a RunOptions,
    harmony: AbsolutePath,
    hdc_bin: String,
    ohpm: String,
    node: String,
    hvigorw_js: String,
    bundle_name: String,
    device: String,
    port: u16,
}

impl<'a> HarmonyRun<'a> {
    fn prepare(
        executor: &'a dyn CommandExecutor,
        env: &'a Environment,
        shell: &'a Arc<Shell>,
        options: &'a RunOptions,
    ) -> Result<Self> {
        let sdk = DevEcoSdk::from_env(env)?;
        let hdc = sdk.toolchains_dir()?.join(["hdc"]);
        sdk.tools_dir()?;

        let harmony = env.resolve(&options.harmony_project_path);
        let bundle_name = read_bundle_name(&harmony)?;

        let hdc_bin = shell_path(hdc.as_path());
        let targets = executor.run(
            &format!("{} list targets -v", hdc_bin),
            &serde_json::Value::Null,
            harmony.as_path(),
        )?;
        let device = select_device(&parse_targets(&targets), options.simulator.as_deref())?;
        tracing::debug!("selected device {}", device);

        let mut port = options
            .port
            .or_else(|| env.metro_port())
            .unwrap_or(DEFAULT_METRO_PORT);
        if options.packager {
            port = start_packager_if_needed(env, shell, &harmony, port)?;
        }

        Ok(HarmonyRun {
            executor,
            shell,
            options,
            harmony,
            hdc_bin,
            ohpm: shell_path(&sdk.ohpm()?),
            node: shell_path(&sdk.node()?),
            hvigorw_js: shell_path(&sdk.hvigorw_js()?),
            bundle_name,
            device,
            port,
        })
    }

    fn execute(&self) -> Result<()> {
        self.job(Status::Installing, "[1/3] installing dependencies", |job| {
            self.stream(&format!("{} install --all --strict_ssl true", self.ohpm), job)
        })?;
        self.job(Status::Building, "[2/3] building app", |job| {
            let command = format!(
                "{} {} -p module={}@default -p product={} -p buildMode={} -p requiredDeviceType=phone assembleHap",
                self.node, self.hvigorw_js, self.options.module, self.options.product, self.options.build_mode
            );
            self.stream(&command, job)
        })?;
        self.job(Status::Installing, "[3/3] installing and opening app", |_| {
            self.install_and_open()
        })
    }

    /// Run `work` as a named job. Errors that are not already diagnostics
    /// become "<name> failed".
    fn job(&self, status: Status, name: &str, work: impl FnOnce(&Job) -> Result<()>) -> Result<()> {
        let job = self.shell.job(status, name);
        match work(&job) {
            Ok(()) => {
                job.finish();
                Ok(())
            }
            Err(err) if err.is::<DiagnosticError>() => Err(err),
            Err(err) => Err(DiagnosticError(
                Diagnostic::error(format!("{} failed", name)).with_context(format!("{:#}", err)),
            )
            .into()),
        }
    }

    fn stream(&self, command: &str, job: &Job) -> Result<()> {
        tracing::debug!("{}", command);
        self.executor
            .run_streaming(command, self.harmony.as_path(), &mut |line: &str| job.line(line))?;
        Ok(())
    }

    /// Run `hdc -t <device> <args>`. Output starting with `[Fail]` is an error.
    fn hdc_on_device(&self, args: &str) -> Result<String> {
        self.hdc(&format!("-t {} {}", self.device, args))
    }

    fn hdc(&self, args: &str) -> Result<String> {
        let command = format!("{} {}", self.hdc_bin, args);
        tracing::debug!("{}", command);
        let output = self
            .executor
            .run(&command, &serde_json::Value::Null, self.harmony.as_path())?;
        if output.starts_with("[Fail]") {
            return Err(DiagnosticError(Diagnostic::error(output.trim_end())).into());
        }
        if !output.is_empty() {
            tracing::debug!("{}", output.trim_end());
        }
        Ok(output)
    }

    fn install_and_open(&self) -> Result<()> {
        let staging = format!("data/local/tmp/{}", staging_dir_name(&mut rand::thread_rng()));

        self.hdc_on_device(&format!("shell aa force-stop {}", self.bundle_name))?;
        let installed = self.install_from(&staging);
        let cleaned = self.hdc_on_device(&format!("shell rm -rf {}", staging));
        installed?;
        cleaned?;

        self.hdc_on_device(&format!(
            "shell aa start -a {} -b {}",
            self.options.ability, self.bundle_name
        ))?;
        self.remove_forwarded_port()?;
        self.hdc_on_device(&format!("rport tcp:{0} tcp:{0}", self.port))?;
        self.shell
            .status(Status::Forwarding, format!("device tcp:{0} -> tcp:{0}", self.port));
        Ok(())
    }

    fn install_from(&self, staging: &str) -> Result<()> {
        self.hdc_on_device(&format!("shell mkdir {}", staging))?;

        let variant = if self.options.simulator.is_some() {
            "unsigned"
        } else {
            "signed"
        };
        let hap_name = format!("{}-default-{}.hap", self.options.module, variant);
        let hap = self.harmony.join([
            self.options.module.as_str(),
            "build",
            "default",
            "outputs",
            "default",
            hap_name.as_str(),
        ]);
        self.hdc_on_device(&format!("file send {} {}", shell_path(hap.as_path()), staging))?;

        let result = self.hdc_on_device(&format!("shell bm install -p {}", staging))?;
        if result.contains("failed to install") {
            return Err(DiagnosticError(
                Diagnostic::error("Installation failed.").with_suggestion(format!(
                    "If an application with the same bundle name is already installed, try uninstalling it:\n{} shell bm uninstall -n {}",
                    self.hdc_bin, self.bundle_name
                )),
            )
            .into());
        }
        Ok(())
    }

    /// Drop a stale host-to-device forward of the dev-server port.
    fn remove_forwarded_port(&self) -> Result<()> {
        let forwards = self.executor.run(
            &format!("{} fport ls", self.hdc_bin),
            &serde_json::Value::Null,
            self.harmony.as_path(),
        )?;
        let mapping = format!("tcp:{0} tcp:{0}", self.port);
        if forwards.contains(&mapping) {
            self.hdc(&format!("fport rm {}", mapping))?;
        }
        Ok(())
    }
}

/// Make sure a dev server will be reachable on `port`.
///
/// A busy port is taken to be a dev server that is already running.
fn start_packager_if_needed(
    env: &Environment,
    shell: &Shell,
    harmony: &AbsolutePath,
    port: u16,
) -> Result<u16> {
    if port != DEFAULT_METRO_PORT {
        let index = harmony.join(["entry", "src", "main", "ets", "pages", "Index.ets"]);
        set_metro_port(index.as_path(), port)?;
    }

    if !port_is_free(port) {
        shell.note(format!("dev server already running on port {}", port));
        return Ok(port);
    }

    let command = format!("{} --port {}", react_native_cli("start"), port);
    let mut cmd = ProcessBuilder::shell_line(command)
        .cwd(env.cwd().as_path())
        .build_command();
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());
    cmd.spawn().context("failed to start the dev server")?;
    shell.note(format!("started dev server on port {}", port));
    Ok(port)
}
