impl<P, H> Device<P, H>
where
    P: Platform,
    H: DeviceHooks<P>,
{
    /// Project hooks see the line first, then platform hooks, then the
    /// built-in vocabulary.
    fn dispatch(&mut self, line: &str) -> CmdExecStatus {
        let status = self.hooks.project_command(&mut self.platform, line);
        if status != CmdExecStatus::NotFound {
            return status;
        }
        let status = self.hooks.platform_command(&mut self.platform, line);
        if status != CmdExecStatus::NotFound {
            return status;
        }
        self.generic_command(line)
    }

    fn generic_command(&mut self, line: &str) -> CmdExecStatus {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("help" | "?") => {
                info!("{}", HELP_TEXT);
                CmdExecStatus::Executed
            }
            Some("version") => {
                info!("{} {}", self.config.app_name, self.config.app_version);
                CmdExecStatus::Executed
            }
            Some("run") => {
                self.mode = DeviceMode::Run;
                self.mode_set_by_command = true;
                CmdExecStatus::ExecutedInterrupt
            }
            Some("conf") => {
                self.mode = DeviceMode::Configure;
                self.mode_set_by_command = true;
                CmdExecStatus::ExecutedInterrupt
            }
            Some("wifi") => {
                if self.connect_wifi(false) {
                    info!("wifi up");
                } else {
                    info!("wifi down");
                }
                CmdExecStatus::Executed
            }
            Some("lightsleep") => match parse_secs(words.next()) {
                Some(secs) => {
                    if self.scheduler.interruptible_wait(&mut self.platform, secs) {
                        CmdExecStatus::ExecutedInterrupt
                    } else {
                        CmdExecStatus::Executed
                    }
                }
                None => CmdExecStatus::InvalidArgs,
            },
            Some("deepsleep") => match parse_secs(words.next()) {
                Some(secs) => {
                    let now_ms = self.platform.now_ms();
                    self.scheduler
                        .schedule_extended_deep_sleep(&mut self.platform, now_ms, secs);
                    CmdExecStatus::Executed
                }
                None => CmdExecStatus::InvalidArgs,
            },
            Some("restart") => {
                self.platform.restart();
                CmdExecStatus::Executed
            }
            _ => CmdExecStatus::NotFound,
        }
    }

    /// Brings the radio up against the configured networks.
    pub fn connect_wifi(&mut self, skip_if_already_connected: bool) -> bool {
        self.config.wifi.connect(
            &mut self.platform,
            &self.scheduler,
            &self.config.primary_network,
            &self.config.backup_network,
            skip_if_already_connected,
        )
    }
}

fn parse_secs(word: Option<&str>) -> Option<u32> {
    word?.parse().ok()
}
