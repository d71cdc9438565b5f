//! Byte-at-a-time command console with single-level history recall.

use heapless::String;
use log::info;

use crate::platform::Platform;

/// Longest accepted command line, bytes.
pub const CONSOLE_LINE_BYTES: usize = 128;

const BACKSPACE: u8 = 0x08;
const ESCAPE: u8 = 0x1B;
const POLL_TICK_MS: u32 = 100;
const MAX_IDLE_POLLS: u32 = 40;

/// One accepted input line.
pub type CommandLine = String<CONSOLE_LINE_BYTES>;

/// Outcome of one console service pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsoleEvent {
    /// Nothing to dispatch; also covers an accepted empty line.
    Idle,
    /// A completed line, ready for dispatch.
    Line(CommandLine),
    /// Operator went quiet mid-line; the partial line is kept for next time.
    TimedOut,
}

/// Result of dispatching a completed command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmdExecStatus {
    Executed,
    /// Executed, and any in-progress higher-level wait should be cut short.
    ExecutedInterrupt,
    NotFound,
    InvalidArgs,
}

impl CmdExecStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::ExecutedInterrupt => "executed_interrupt",
            Self::NotFound => "not_found",
            Self::InvalidArgs => "invalid_args",
        }
    }
}

/// Line editor over the platform byte source.
///
/// The console never dispatches by itself; it hands completed lines back so
/// the caller can run them without holding any borrow into the console.
#[derive(Debug, Default)]
pub struct Console {
    buffer: CommandLine,
    last_command: CommandLine,
}

impl Console {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            last_command: String::new(),
        }
    }

    /// Drains available bytes into the line buffer. Returns quickly on quiet
    /// cycles; while an operator is typing it blocks between bytes, bounded
    /// by the idle-poll budget.
    pub fn service<P: Platform>(&mut self, p: &mut P) -> ConsoleEvent {
        if !p.console_byte_ready() {
            return ConsoleEvent::Idle;
        }
        loop {
            while let Some(byte) = p.console_read_byte() {
                match byte {
                    b'\n' | b'\r' => {
                        if self.buffer.is_empty() {
                            return ConsoleEvent::Idle;
                        }
                        let line = core::mem::take(&mut self.buffer);
                        self.last_command = line.clone();
                        return ConsoleEvent::Line(line);
                    }
                    BACKSPACE => {
                        self.buffer.pop();
                    }
                    ESCAPE => {
                        self.buffer = self.last_command.clone();
                    }
                    byte if byte == b' ' || byte.is_ascii_graphic() => {
                        // A full line drops the overflow instead of wrapping.
                        let _ = self.buffer.push(byte as char);
                    }
                    _ => {}
                }
                info!("> {}", self.buffer.as_str());
            }
            let mut idle_polls = 0;
            while !p.console_byte_ready() {
                idle_polls += 1;
                if idle_polls > MAX_IDLE_POLLS {
                    info!("console session abandoned");
                    return ConsoleEvent::TimedOut;
                }
                p.sleep_tick(POLL_TICK_MS);
            }
        }
    }

    /// Most recently accepted line, recalled by the escape byte.
    pub fn last_command(&self) -> &str {
        &self.last_command
    }
}
