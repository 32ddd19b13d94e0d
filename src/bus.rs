//! Interface to the peripheral bus drivers the console drives.

use heapless::Vec;

/// Room for every 7-bit address a scan can report.
pub const SCAN_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The target did not acknowledge.
    Nack,
    Timeout,
    InvalidAddress,
    /// The bus has no such operation.
    Unsupported,
    Other,
}

impl BusError {
    pub const fn as_str(self) -> &'static str {
        match self {
            BusError::Nack => "no acknowledge",
            BusError::Timeout => "timeout",
            BusError::InvalidAddress => "invalid address",
            BusError::Unsupported => "not supported",
            BusError::Other => "bus fault",
        }
    }
}

/// Blocking operations on one peripheral bus.
pub trait Bus {
    fn set_target_address(&mut self, address: u8) -> Result<(), BusError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Writes `bytes`, then reads `bytes.len()` bytes back into the same buffer.
    fn write_then_read(&mut self, bytes: &mut [u8]) -> Result<(), BusError>;

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), BusError>;

    /// Pushes the address of every responding device onto `found`.
    fn scan_for_devices(&mut self, found: &mut Vec<u8, SCAN_CAPACITY>) -> Result<(), BusError>;
}

/// Stand-in for a bus that is not wired up; every operation is unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBus;

impl Bus for NoBus {
    fn set_target_address(&mut self, _address: u8) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }

    fn write(&mut self, _bytes: &[u8]) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }

    fn write_then_read(&mut self, _bytes: &mut [u8]) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }

    fn read(&mut self, _buffer: &mut [u8]) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }

    fn scan_for_devices(&mut self, _found: &mut Vec<u8, SCAN_CAPACITY>) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }
}
