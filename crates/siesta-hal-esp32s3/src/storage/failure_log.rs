use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use heapless::String;
use log::debug;
use siesta_core::platform::FAILURE_RECORD_BYTES;

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

const LOG_MAGIC: u32 = 0x314C_4653; // "SFL1"
const LOG_VERSION: u8 = 1;
const LOG_HEADER_LEN: usize = 8;
// Header, text area, trailing checksum word; kept word-aligned.
const LOG_RECORD_LEN: usize = LOG_HEADER_LEN + FAILURE_RECORD_BYTES + 4;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FailureLogError {
    PartitionTable,
    LogPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Corrupted,
    Unsupported,
}

/// Word-granular access to the SoC flash through the ROM routines. All
/// record I/O here is word-aligned, so no byte-edge handling is needed.
#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FailureLogError> {
        let rc = unsafe { esp_rom_spiflash_unlock() };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FailureLogError::FlashOpFailed(rc));
        }
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FailureLogError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FailureLogError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_erase_sector(sector_addr / FLASH_SECTOR_SIZE) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FailureLogError::FlashOpFailed(rc));
        }
        Ok(())
    }

    /// Reads an arbitrary byte span by walking the covering flash words.
    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FailureLogError> {
        let end = addr + out.len() as u32;
        let mut word_addr = addr & !0b11;
        while word_addr < end {
            let mut word = 0u32;
            let rc =
                unsafe { esp_rom_spiflash_read(word_addr, &mut word as *mut u32 as *const u32, 4) };
            if rc != ESP_ROM_SPIFLASH_RESULT_OK {
                return Err(FailureLogError::FlashOpFailed(rc));
            }
            for (lane, byte) in word.to_le_bytes().iter().enumerate() {
                let flash_addr = word_addr + lane as u32;
                if flash_addr >= addr && flash_addr < end {
                    out[(flash_addr - addr) as usize] = *byte;
                }
            }
            word_addr += 4;
        }
        Ok(())
    }

    /// Writes into freshly erased flash; callers erase the sector first.
    fn write_words(&mut self, addr: u32, data: &[u8]) -> Result<(), FailureLogError> {
        if !addr.is_multiple_of(4) || !data.len().is_multiple_of(4) {
            return Err(FailureLogError::Unsupported);
        }

        for (index, chunk) in data.chunks_exact(4).enumerate() {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let word_addr = addr + (index as u32) * 4;
            let rc = unsafe { esp_rom_spiflash_write(word_addr, &word as *const u32, 4) };
            if rc != ESP_ROM_SPIFLASH_RESULT_OK {
                return Err(FailureLogError::FlashOpFailed(rc));
            }
        }
        Ok(())
    }
}

impl ReadStorage for RawFlash {
    type Error = FailureLogError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FailureLogError::Unsupported)
    }
}

/// One-slot failure note in the last sector of the data partition. The
/// note survives restarts and deep sleep so the next boot can report it.
#[derive(Debug)]
pub struct FailureLogStore {
    flash: RawFlash,
    log_sector_addr: u32,
}

impl FailureLogStore {
    pub fn new() -> Result<Self, FailureLogError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FailureLogError::PartitionTable)?;

        let mut undefined_data: Option<(u32, u32)> = None;
        let mut fallback_nvs: Option<(u32, u32)> = None;

        for entry in table.iter() {
            if entry.is_read_only() || entry.len() < FLASH_SECTOR_SIZE {
                continue;
            }

            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    undefined_data = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) => {
                    if fallback_nvs.is_none() {
                        fallback_nvs = Some((entry.offset(), entry.len()));
                    }
                }
                _ => {}
            }
        }

        let (offset, len) = undefined_data
            .or(fallback_nvs)
            .ok_or(FailureLogError::LogPartitionMissing)?;

        if len < FLASH_SECTOR_SIZE {
            return Err(FailureLogError::PartitionTooSmall);
        }

        let log_sector_addr = offset + len - FLASH_SECTOR_SIZE;
        debug!("failure log sector at {:#x}", log_sector_addr);
        Ok(Self {
            flash,
            log_sector_addr,
        })
    }

    /// Reads the stored note; `Ok(None)` when the slot is empty or holds
    /// foreign data, `Corrupted` when the frame is damaged.
    pub fn load(&mut self) -> Result<Option<String<FAILURE_RECORD_BYTES>>, FailureLogError> {
        let mut buf = [0u8; LOG_RECORD_LEN];
        self.flash.read_bytes(self.log_sector_addr, &mut buf)?;

        if buf.iter().all(|b| *b == 0xFF) {
            return Ok(None);
        }

        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != LOG_MAGIC {
            return Ok(None);
        }
        if buf[4] != LOG_VERSION {
            return Ok(None);
        }

        let checksum_start = LOG_RECORD_LEN - 4;
        let expected = u32::from_le_bytes([
            buf[checksum_start],
            buf[checksum_start + 1],
            buf[checksum_start + 2],
            buf[checksum_start + 3],
        ]);
        if checksum32(&buf[..checksum_start]) != expected {
            return Err(FailureLogError::Corrupted);
        }

        let len = buf[5] as usize;
        if len > FAILURE_RECORD_BYTES {
            return Err(FailureLogError::Corrupted);
        }

        let text = core::str::from_utf8(&buf[LOG_HEADER_LEN..LOG_HEADER_LEN + len])
            .map_err(|_| FailureLogError::Corrupted)?;
        let mut out = String::new();
        out.push_str(text).map_err(|_| FailureLogError::Corrupted)?;
        Ok(Some(out))
    }

    /// Stores one note, truncated to the slot size.
    pub fn store(&mut self, line: &str) -> Result<(), FailureLogError> {
        let text = truncate_to_char_boundary(line, FAILURE_RECORD_BYTES);

        let mut buf = [0u8; LOG_RECORD_LEN];
        buf[0..4].copy_from_slice(&LOG_MAGIC.to_le_bytes());
        buf[4] = LOG_VERSION;
        buf[5] = text.len() as u8;
        buf[LOG_HEADER_LEN..LOG_HEADER_LEN + text.len()].copy_from_slice(text.as_bytes());

        let checksum_start = LOG_RECORD_LEN - 4;
        let checksum = checksum32(&buf[..checksum_start]);
        buf[checksum_start..].copy_from_slice(&checksum.to_le_bytes());

        self.flash.erase_sector(self.log_sector_addr)?;
        self.flash.write_words(self.log_sector_addr, &buf)
    }

    /// Erases the slot so the note is reported exactly once.
    pub fn clear(&mut self) -> Result<(), FailureLogError> {
        self.flash.erase_sector(self.log_sector_addr)
    }
}

fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}
