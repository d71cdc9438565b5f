//! Device state machine for boot, duty cycles, and operator commands.

use log::{info, warn};

use crate::{
    console::{CmdExecStatus, Console, ConsoleEvent},
    failure::{self, FailureRecord},
    platform::Platform,
    sleep::{SleepScheduler, SleepTuning},
    wifi::{WifiConnector, WifiNetwork},
};

const HELP_TEXT: &str =
    "commands: help | run | conf | wifi | lightsleep <secs> | deepsleep <secs> | restart | version";

/// Project integration points called around the shared duty cycle.
///
/// Every hook has a do-nothing default so a board can start from
/// [`NoopHooks`] and grow.
pub trait DeviceHooks<P: Platform> {
    /// One-time bring-up after boot, before the configure window opens.
    fn setup(&mut self, _p: &mut P) -> Result<(), &'static str> {
        Ok(())
    }

    /// One run-mode cycle's worth of project work.
    fn run_mode(&mut self, _p: &mut P) -> Result<(), &'static str> {
        Ok(())
    }

    /// Called once per configure-mode pass while an operator is around.
    fn configure_mode(&mut self, _p: &mut P) {}

    /// First look at a console line; `NotFound` passes it along.
    fn project_command(&mut self, _p: &mut P, _line: &str) -> CmdExecStatus {
        CmdExecStatus::NotFound
    }

    /// Second look at a console line, for board-level vocabulary.
    fn platform_command(&mut self, _p: &mut P, _line: &str) -> CmdExecStatus {
        CmdExecStatus::NotFound
    }
}

/// Hook set that does nothing, used during bring-up.
pub struct NoopHooks;

impl<P: Platform> DeviceHooks<P> for NoopHooks {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceMode {
    Run,
    Configure,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeviceConfig {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub boot_window_secs: u32,
    pub run_period_secs: u32,
    pub configure_poll_secs: u32,
    pub deep_sleep_cycles: bool,
    pub wifi_on_run: bool,
    pub abort_grace_secs: u32,
    pub abort_cooldown_secs: u32,
    pub primary_network: WifiNetwork,
    pub backup_network: WifiNetwork,
    pub wifi: WifiConnector,
    pub sleep: SleepTuning,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME"),
            app_version: env!("CARGO_PKG_VERSION"),
            boot_window_secs: 2,
            run_period_secs: 300,
            configure_poll_secs: 1,
            deep_sleep_cycles: false,
            wifi_on_run: true,
            abort_grace_secs: 5,
            abort_cooldown_secs: 600,
            primary_network: WifiNetwork::new("", ""),
            backup_network: WifiNetwork::new("", ""),
            wifi: WifiConnector::default(),
            sleep: SleepTuning::default(),
        }
    }
}

pub struct Device<P, H>
where
    P: Platform,
    H: DeviceHooks<P>,
{
    platform: P,
    hooks: H,
    config: DeviceConfig,
    scheduler: SleepScheduler,
    console: Console,
    mode: DeviceMode,
    mode_set_by_command: bool,
}

include!("boot.rs");
include!("commands.rs");
include!("cycle.rs");

#[cfg(test)]
mod tests;
