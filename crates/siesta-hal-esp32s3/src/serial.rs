//! Operator console input over UART: buffered, never blocking.

use esp_hal::{Blocking, uart::Uart};
use heapless::Deque;

const QUEUE_BYTES: usize = 64;
const CHUNK_BYTES: usize = 16;

/// Wraps the console UART and drains its RX FIFO into a local queue so
/// `byte_ready` stays cheap enough to call from tight wait loops.
pub struct SerialConsole {
    uart: Uart<'static, Blocking>,
    queue: Deque<u8, QUEUE_BYTES>,
}

impl SerialConsole {
    pub fn new(uart: Uart<'static, Blocking>) -> Self {
        Self {
            uart,
            queue: Deque::new(),
        }
    }

    fn pump(&mut self) {
        let mut chunk = [0u8; CHUNK_BYTES];
        while self.queue.len() + CHUNK_BYTES <= QUEUE_BYTES {
            match self.uart.read_buffered(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    for byte in &chunk[..n] {
                        let _ = self.queue.push_back(*byte);
                    }
                }
            }
        }
    }

    pub fn byte_ready(&mut self) -> bool {
        self.pump();
        !self.queue.is_empty()
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        self.pump();
        self.queue.pop_front()
    }
}
