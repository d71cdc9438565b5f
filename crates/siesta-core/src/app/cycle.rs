impl<P, H> Device<P, H>
where
    P: Platform,
    H: DeviceHooks<P>,
{
    /// Main loop; each pass is one duty cycle.
    pub fn run_forever(&mut self) -> ! {
        loop {
            self.cycle();
        }
    }

    /// One duty cycle: console first, then the active mode's work.
    pub fn cycle(&mut self) {
        let cycle_begin_ms = self.platform.now_ms();
        let interrupted = self.service_console();
        match self.mode {
            DeviceMode::Run => self.run_cycle(cycle_begin_ms, interrupted),
            DeviceMode::Configure => self.configure_cycle(),
        }
    }

    /// Drains console input; `true` when a command cut the cycle short.
    fn service_console(&mut self) -> bool {
        let line = match self.console.service(&mut self.platform) {
            ConsoleEvent::Line(line) => line,
            ConsoleEvent::Idle | ConsoleEvent::TimedOut => return false,
        };

        self.mode_set_by_command = false;
        let status = self.dispatch(line.as_str());
        info!("('{}' => {})", line, status.as_str());

        if status != CmdExecStatus::ExecutedInterrupt {
            return false;
        }
        if !self.mode_set_by_command && self.mode == DeviceMode::Run {
            // An interrupting command while unattended means an operator
            // is present; hold the device awake for them.
            self.mode = DeviceMode::Configure;
            info!("mode {:?}", self.mode);
        }
        true
    }

    fn run_cycle(&mut self, cycle_begin_ms: u64, skip_sleep: bool) {
        if self.config.wifi_on_run && !self.connect_wifi(true) {
            warn!("network unavailable, skipping this cycle's sync");
        } else if let Err(msg) = self.hooks.run_mode(&mut self.platform) {
            self.abort(msg);
            return;
        }

        if skip_sleep || self.mode == DeviceMode::Configure {
            return;
        }
        if self.config.deep_sleep_cycles && self.platform.supports_deep_sleep() {
            self.scheduler.schedule_extended_deep_sleep(
                &mut self.platform,
                cycle_begin_ms,
                self.config.run_period_secs,
            );
        } else {
            self.scheduler
                .interruptible_wait(&mut self.platform, self.config.run_period_secs);
        }
    }

    fn configure_cycle(&mut self) {
        self.hooks.configure_mode(&mut self.platform);
        self.scheduler
            .interruptible_wait(&mut self.platform, self.config.configure_poll_secs);
    }
}
