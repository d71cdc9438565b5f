impl<P, H> Device<P, H>
where
    P: Platform,
    H: DeviceHooks<P>,
{
    pub fn new(platform: P, hooks: H, config: DeviceConfig) -> Self {
        Self {
            scheduler: SleepScheduler::new(config.sleep),
            platform,
            hooks,
            config,
            console: Console::default(),
            mode: DeviceMode::Run,
            mode_set_by_command: false,
        }
    }

    /// Boot order: settle any retained sleep debt, surface the previous
    /// failure, run project bring-up, then offer the configure window.
    pub fn boot(&mut self) {
        self.scheduler
            .resume_extended_deep_sleep_if_applicable(&mut self.platform);
        self.surface_failure_record();

        if let Err(msg) = self.hooks.setup(&mut self.platform) {
            self.abort(msg);
            return;
        }

        info!(
            "boot window {}s, any key for configure mode",
            self.config.boot_window_secs
        );
        self.mode = if self
            .scheduler
            .interruptible_wait(&mut self.platform, self.config.boot_window_secs)
        {
            DeviceMode::Configure
        } else {
            DeviceMode::Run
        };
        info!("mode {:?}", self.mode);
    }

    fn surface_failure_record(&mut self) {
        let Some(raw) = self.platform.take_failure_record() else {
            return;
        };
        match FailureRecord::parse(raw.as_str()) {
            Some(record) => warn!("previous abort at {}: {}", record.time_secs, record.msg),
            None => warn!("previous abort note: {}", raw),
        }
    }

    /// Routes a fault through the abort path; the device stays up only
    /// when the operator interrupts the grace window.
    pub fn abort(&mut self, msg: &str) {
        let interrupted = failure::abort(
            &mut self.platform,
            &self.scheduler,
            self.config.abort_grace_secs,
            self.config.abort_cooldown_secs,
            msg,
        );
        if interrupted {
            self.mode = DeviceMode::Configure;
            info!("mode {:?}", self.mode);
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }
}
