//! Runs the siesta duty cycle on a development host.
//!
//! The simulator stands in for the board so the boot window, console
//! vocabulary, Wi-Fi fallback, and abort path can be exercised without
//! flashing anything. Type into stdin to reach the console; `help` lists
//! the vocabulary, and the extra `fail <note>` command forces the next
//! run cycle through the abort path.

mod platform;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use siesta_core::{
    app::{Device, DeviceConfig, DeviceHooks},
    console::CmdExecStatus,
    platform::Platform,
    sleep::SleepTuning,
    wifi::WifiNetwork,
};

use platform::SimPlatform;

#[derive(Parser, Debug)]
#[command(name = "siesta-sim", about = "Host simulator for the siesta duty cycle")]
struct Args {
    /// Seconds between run-mode cycles.
    #[arg(long, default_value_t = 10)]
    period: u32,
    /// Simulate deep-sleep cycles instead of in-process waits.
    #[arg(long)]
    deep_sleep: bool,
    /// Primary network name.
    #[arg(long, default_value = "home-ap")]
    ssid: String,
    /// Backup network name; empty means none configured.
    #[arg(long, default_value = "")]
    backup_ssid: String,
    /// Network names the simulated scan reports. Defaults to the primary.
    #[arg(long = "visible", value_name = "SSID")]
    visible: Vec<String>,
    /// Association polls before the simulated wifi link comes up.
    #[arg(long, default_value_t = 1)]
    associate_polls: u32,
    /// File standing in for the failure-record flash sector; in-memory
    /// when not given.
    #[arg(long, value_name = "PATH")]
    failure_file: Option<PathBuf>,
}

/// Project hooks for the simulator: logged busywork as the run payload,
/// plus a `fail` command that injects a run-mode failure.
#[derive(Default)]
struct SimHooks {
    cycles: u32,
    fail_next: Option<String>,
}

impl DeviceHooks<SimPlatform> for SimHooks {
    fn run_mode(&mut self, p: &mut SimPlatform) -> Result<(), &'static str> {
        if let Some(note) = self.fail_next.take() {
            info!("sim: injecting run failure '{note}'");
            // The abort path only needs a static message; the full note was
            // already logged above.
            return Err("operator-injected failure");
        }
        self.cycles += 1;
        info!("sim: run cycle {} at {}s", self.cycles, p.now_ms() / 1_000);
        Ok(())
    }

    fn project_command(&mut self, _p: &mut SimPlatform, line: &str) -> CmdExecStatus {
        match line.split_once(' ') {
            Some(("fail", note)) => {
                self.fail_next = Some(note.to_owned());
                CmdExecStatus::Executed
            }
            _ if line == "fail" => {
                self.fail_next = Some("unnamed".to_owned());
                CmdExecStatus::Executed
            }
            _ => CmdExecStatus::NotFound,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let visible = if args.visible.is_empty() {
        vec![args.ssid.clone()]
    } else {
        args.visible.clone()
    };

    let config = DeviceConfig {
        app_name: "siesta-sim",
        app_version: env!("CARGO_PKG_VERSION"),
        run_period_secs: args.period,
        deep_sleep_cycles: args.deep_sleep,
        // Leaked once at startup; network names have to outlive the device.
        primary_network: WifiNetwork::new(args.ssid.leak(), "simulated"),
        backup_network: WifiNetwork::new(args.backup_ssid.leak(), "simulated"),
        sleep: SleepTuning::new(60, 21_600, 250),
        ..DeviceConfig::default()
    };

    let platform = SimPlatform::new(
        visible,
        args.associate_polls,
        args.deep_sleep,
        args.failure_file,
    );
    let mut device = Device::new(platform, SimHooks::default(), config);
    device.boot();
    device.run_forever()
}
