use super::*;
use crate::{
    platform::{Platform, mock::MockPlatform},
    sleep::SleepRecord,
};
use heapless::{String, Vec};

#[derive(Default)]
struct ScriptedHooks {
    fail_setup: Option<&'static str>,
    fail_run: Option<&'static str>,
    project_claims: &'static [&'static str],
    platform_claims: &'static [&'static str],
    setup_calls: u32,
    run_calls: u32,
    configure_calls: u32,
    seen_lines: Vec<String<32>, 8>,
}

impl DeviceHooks<MockPlatform> for ScriptedHooks {
    fn setup(&mut self, _p: &mut MockPlatform) -> Result<(), &'static str> {
        self.setup_calls += 1;
        match self.fail_setup {
            Some(msg) => Err(msg),
            None => Ok(()),
        }
    }

    fn run_mode(&mut self, _p: &mut MockPlatform) -> Result<(), &'static str> {
        self.run_calls += 1;
        match self.fail_run {
            Some(msg) => Err(msg),
            None => Ok(()),
        }
    }

    fn configure_mode(&mut self, _p: &mut MockPlatform) {
        self.configure_calls += 1;
    }

    fn project_command(&mut self, _p: &mut MockPlatform, line: &str) -> CmdExecStatus {
        let mut seen = String::new();
        let _ = seen.push_str(line);
        let _ = self.seen_lines.push(seen);
        if self.project_claims.iter().any(|claim| *claim == line) {
            CmdExecStatus::Executed
        } else {
            CmdExecStatus::NotFound
        }
    }

    fn platform_command(&mut self, _p: &mut MockPlatform, line: &str) -> CmdExecStatus {
        if self.platform_claims.iter().any(|claim| *claim == line) {
            CmdExecStatus::Executed
        } else {
            CmdExecStatus::NotFound
        }
    }
}

fn config() -> DeviceConfig {
    DeviceConfig {
        boot_window_secs: 2,
        run_period_secs: 30,
        configure_poll_secs: 1,
        abort_grace_secs: 1,
        abort_cooldown_secs: 120,
        primary_network: WifiNetwork::new("field-ap", "primary-pass"),
        backup_network: WifiNetwork::new("fallback-ap", "backup-pass"),
        wifi: WifiConnector {
            settle_secs: 1,
            retries: 1,
        },
        sleep: SleepTuning::new(600, 6_000, 100),
        ..DeviceConfig::default()
    }
}

fn device(platform: MockPlatform, hooks: ScriptedHooks) -> Device<MockPlatform, ScriptedHooks> {
    Device::new(platform, hooks, config())
}

#[test]
fn quiet_boot_lands_in_run_mode() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    dev.boot();

    assert_eq!(dev.mode(), DeviceMode::Run);
    assert_eq!(dev.hooks.setup_calls, 1);
    assert_eq!(dev.platform.ticked_ms, 2_000);
}

#[test]
fn keypress_during_the_boot_window_selects_configure() {
    let mut p = MockPlatform::new();
    p.type_bytes_after_ms(300, b"x");
    let mut dev = device(p, ScriptedHooks::default());

    dev.boot();

    assert_eq!(dev.mode(), DeviceMode::Configure);
    assert!(dev.platform.ticked_ms < 2_000);
}

#[test]
fn retained_sleep_debt_is_settled_before_anything_else() {
    let mut p = MockPlatform::new();
    p.retained_write(SleepRecord { remaining_secs: 50 }.encode());
    let mut dev = device(p, ScriptedHooks::default());

    dev.boot();

    assert_eq!(dev.platform.sleep_legs.as_slice(), &[50]);
    assert_eq!(dev.platform.retained_raw(), [0; 16]);
    assert_eq!(dev.hooks.setup_calls, 1);
}

#[test]
fn stored_failure_note_is_surfaced_and_cleared_at_boot() {
    let mut p = MockPlatform::new();
    assert!(p.store_failure_record("time=12 msg=sensor offline"));
    let mut dev = device(p, ScriptedHooks::default());

    dev.boot();

    assert!(dev.platform.stored_failure_record().is_none());
    assert_eq!(dev.mode(), DeviceMode::Run);
}

#[test]
fn setup_failure_aborts_before_the_boot_window() {
    let hooks = ScriptedHooks {
        fail_setup: Some("bus dead"),
        ..ScriptedHooks::default()
    };
    let mut dev = device(MockPlatform::new(), hooks);

    dev.boot();

    let stored = dev.platform.stored_failure_record().unwrap();
    assert!(stored.ends_with("msg=bus dead"));
    assert_eq!(dev.platform.sleep_legs.as_slice(), &[120]);
    // Only the abort grace window ran; the boot window never opened.
    assert_eq!(dev.platform.ticked_ms, 1_000);
    assert_eq!(dev.hooks.run_calls, 0);
}

#[test]
fn run_cycle_does_the_project_work_then_sleeps_the_period() {
    let mut p = MockPlatform::new();
    p.set_associated(true);
    let mut dev = device(p, ScriptedHooks::default());
    dev.boot();
    let ticked_after_boot = dev.platform.ticked_ms;

    dev.cycle();

    assert_eq!(dev.hooks.run_calls, 1);
    assert_eq!(dev.platform.ticked_ms - ticked_after_boot, 30_000);
    assert!(dev.platform.sleep_legs.is_empty());
}

#[test]
fn deep_sleep_cycles_power_down_between_syncs() {
    let mut p = MockPlatform::new();
    p.set_associated(true);
    let hooks = ScriptedHooks::default();
    let mut cfg = config();
    cfg.deep_sleep_cycles = true;
    let mut dev = Device::new(p, hooks, cfg);

    dev.cycle();

    assert_eq!(dev.hooks.run_calls, 1);
    assert_eq!(dev.platform.sleep_legs.as_slice(), &[30]);
}

#[test]
fn wifi_outage_skips_the_sync_but_still_sleeps() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    dev.cycle();

    assert_eq!(dev.hooks.run_calls, 0);
    assert_eq!(dev.platform.scan_count, 1);
    assert_eq!(dev.platform.ticked_ms, 30_000);
    assert!(dev.platform.sleep_legs.is_empty());
    assert_eq!(dev.platform.restarts, 0);
}

#[test]
fn run_mode_failure_takes_the_abort_path() {
    let mut p = MockPlatform::new();
    p.set_associated(true);
    let hooks = ScriptedHooks {
        fail_run: Some("sync wedged"),
        ..ScriptedHooks::default()
    };
    let mut dev = device(p, hooks);

    dev.cycle();

    let stored = dev.platform.stored_failure_record().unwrap();
    assert!(stored.ends_with("msg=sync wedged"));
    assert_eq!(dev.platform.sleep_legs.as_slice(), &[120]);
}

#[test]
fn project_hook_outranks_the_builtin_vocabulary() {
    let mut p = MockPlatform::new();
    p.type_bytes(b"restart\n");
    let hooks = ScriptedHooks {
        project_claims: &["restart"],
        ..ScriptedHooks::default()
    };
    let mut dev = device(p, hooks);
    dev.mode = DeviceMode::Configure;

    dev.cycle();

    assert_eq!(dev.platform.restarts, 0);
    assert_eq!(dev.hooks.seen_lines[0].as_str(), "restart");
}

#[test]
fn platform_hook_outranks_the_builtin_vocabulary() {
    let mut p = MockPlatform::new();
    p.type_bytes(b"restart\n");
    let hooks = ScriptedHooks {
        platform_claims: &["restart"],
        ..ScriptedHooks::default()
    };
    let mut dev = device(p, hooks);
    dev.mode = DeviceMode::Configure;

    dev.cycle();

    assert_eq!(dev.platform.restarts, 0);
    // The project hook was offered the line first and declined it.
    assert_eq!(dev.hooks.seen_lines[0].as_str(), "restart");
}

#[test]
fn unknown_commands_fall_through_as_not_found() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("frobnicate"), CmdExecStatus::NotFound);
    assert_eq!(dev.dispatch("help"), CmdExecStatus::Executed);
    assert_eq!(dev.dispatch("version"), CmdExecStatus::Executed);
}

#[test]
fn run_and_conf_switch_modes_and_interrupt_the_cycle() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("conf"), CmdExecStatus::ExecutedInterrupt);
    assert_eq!(dev.mode(), DeviceMode::Configure);
    assert_eq!(dev.dispatch("run"), CmdExecStatus::ExecutedInterrupt);
    assert_eq!(dev.mode(), DeviceMode::Run);
}

#[test]
fn lightsleep_needs_a_numeric_argument() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("lightsleep"), CmdExecStatus::InvalidArgs);
    assert_eq!(dev.dispatch("lightsleep soon"), CmdExecStatus::InvalidArgs);
}

#[test]
fn lightsleep_waits_and_reports_an_interrupt() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("lightsleep 2"), CmdExecStatus::Executed);
    assert_eq!(dev.platform.ticked_ms, 2_000);

    dev.platform.type_bytes_after_ms(500, b"x");
    assert_eq!(
        dev.dispatch("lightsleep 30"),
        CmdExecStatus::ExecutedInterrupt
    );
}

#[test]
fn deepsleep_command_powers_down_for_the_requested_time() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("deepsleep 42"), CmdExecStatus::Executed);
    assert_eq!(dev.platform.sleep_legs.as_slice(), &[42]);
}

#[test]
fn restart_command_restarts_the_platform() {
    let mut dev = device(MockPlatform::new(), ScriptedHooks::default());

    assert_eq!(dev.dispatch("restart"), CmdExecStatus::Executed);
    assert_eq!(dev.platform.restarts, 1);
}

#[test]
fn wifi_command_brings_the_link_up() {
    let mut p = MockPlatform::new();
    p.set_visible_networks(&["field-ap"]);
    let mut dev = device(p, ScriptedHooks::default());

    assert_eq!(dev.dispatch("wifi"), CmdExecStatus::Executed);
    assert_eq!(dev.platform.begun_ssid.as_deref(), Some("field-ap"));
}

#[test]
fn interrupted_sleep_command_holds_the_device_awake() {
    let mut p = MockPlatform::new();
    p.set_associated(true);
    p.type_bytes(b"lightsleep 30\n");
    p.type_bytes_after_ms(500, b"x");
    let mut dev = device(p, ScriptedHooks::default());

    dev.cycle();

    assert_eq!(dev.mode(), DeviceMode::Configure);
    assert_eq!(dev.hooks.configure_calls, 1);
    assert_eq!(dev.hooks.run_calls, 0);
}

#[test]
fn run_command_in_run_mode_stays_in_run() {
    let mut p = MockPlatform::new();
    p.set_associated(true);
    p.type_bytes(b"run\n");
    let mut dev = device(p, ScriptedHooks::default());

    dev.cycle();

    assert_eq!(dev.mode(), DeviceMode::Run);
    assert_eq!(dev.hooks.run_calls, 1);
    // The interrupting command skips the end-of-cycle sleep.
    assert_eq!(dev.platform.ticked_ms, 0);
}

#[test]
fn conf_command_switches_to_configure_polling() {
    let mut p = MockPlatform::new();
    p.type_bytes(b"conf\n");
    let mut dev = device(p, ScriptedHooks::default());

    dev.cycle();

    assert_eq!(dev.mode(), DeviceMode::Configure);
    assert_eq!(dev.hooks.run_calls, 0);
    assert_eq!(dev.hooks.configure_calls, 1);
    assert_eq!(dev.platform.ticked_ms, 1_000);
}
