//! Host stand-in for the board: real time, stdin console, in-process state.

use std::{
    fs, io,
    io::Read,
    path::PathBuf,
    sync::mpsc::{Receiver, TryRecvError, channel},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use log::info;
use siesta_core::platform::{FAILURE_RECORD_BYTES, Platform, SLEEP_RECORD_BYTES};

pub struct SimPlatform {
    start: Instant,
    console_rx: Receiver<u8>,
    pending_byte: Option<u8>,
    retained: [u8; SLEEP_RECORD_BYTES],
    visible: Vec<String>,
    associated: bool,
    settle_polls_left: Option<u32>,
    associate_polls: u32,
    deep_sleep: bool,
    failure_file: Option<PathBuf>,
    failure_note: Option<String>,
}

impl SimPlatform {
    pub fn new(
        visible: Vec<String>,
        associate_polls: u32,
        deep_sleep: bool,
        failure_file: Option<PathBuf>,
    ) -> Self {
        Self {
            start: Instant::now(),
            console_rx: spawn_stdin_reader(),
            pending_byte: None,
            retained: [0; SLEEP_RECORD_BYTES],
            visible,
            associated: false,
            settle_polls_left: None,
            associate_polls,
            deep_sleep,
            failure_file,
            failure_note: None,
        }
    }
}

/// Stdin arrives through a channel so the duty cycle can poll for bytes
/// without blocking. Terminal input is line buffered; bytes land here
/// once the operator presses enter.
fn spawn_stdin_reader() -> Receiver<u8> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let mut buf = [0u8; 64];
        loop {
            match io::stdin().lock().read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    for byte in &buf[..n] {
                        if tx.send(*byte).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });
    rx
}

impl Platform for SimPlatform {
    fn now_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_tick(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn feed_watchdog(&mut self) {}

    fn wall_clock_secs(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .unwrap_or(0)
    }

    fn console_byte_ready(&mut self) -> bool {
        if self.pending_byte.is_some() {
            return true;
        }
        match self.console_rx.try_recv() {
            Ok(byte) => {
                self.pending_byte = Some(byte);
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    fn console_read_byte(&mut self) -> Option<u8> {
        self.pending_byte
            .take()
            .or_else(|| self.console_rx.try_recv().ok())
    }

    fn retained_read(&mut self) -> [u8; SLEEP_RECORD_BYTES] {
        self.retained
    }

    fn retained_write(&mut self, raw: [u8; SLEEP_RECORD_BYTES]) {
        self.retained = raw;
    }

    fn wifi_is_associated(&mut self) -> bool {
        if let Some(left) = self.settle_polls_left {
            if left == 0 {
                self.associated = true;
                self.settle_polls_left = None;
            } else {
                self.settle_polls_left = Some(left - 1);
            }
        }
        self.associated
    }

    fn wifi_scan(&mut self, visit: &mut dyn FnMut(&str)) {
        for ssid in &self.visible {
            visit(ssid);
        }
    }

    fn wifi_begin_association(&mut self, ssid: &str, _password: &str) -> bool {
        info!("sim: associating with {ssid}");
        self.settle_polls_left = Some(self.associate_polls.saturating_sub(1));
        true
    }

    fn wifi_disconnect(&mut self) {
        self.associated = false;
        self.settle_polls_left = None;
    }

    fn supports_deep_sleep(&self) -> bool {
        self.deep_sleep
    }

    fn power_off_deep_sleep(&mut self, secs: u32) {
        // A real device resets here and replays boot on wake; the simulator
        // just waits out the leg and carries on in-process.
        info!("sim: deep sleep for {secs}s");
        thread::sleep(Duration::from_secs(u64::from(secs)));
    }

    fn restart(&mut self) {
        info!("sim: restart requested, exiting");
        std::process::exit(0);
    }

    fn store_failure_record(&mut self, line: &str) -> bool {
        match &self.failure_file {
            Some(path) => fs::write(path, line).is_ok(),
            None => {
                self.failure_note = Some(line.to_owned());
                true
            }
        }
    }

    fn take_failure_record(&mut self) -> Option<heapless::String<FAILURE_RECORD_BYTES>> {
        let note = match &self.failure_file {
            Some(path) => {
                let note = fs::read_to_string(path).ok()?;
                let _ = fs::remove_file(path);
                note
            }
            None => self.failure_note.take()?,
        };
        let mut out = heapless::String::new();
        for ch in note.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        Some(out)
    }
}
