//! embassy-rp drivers behind the console's [`Bus`] trait.

use crate::ARG_CAPACITY;
use crate::bus::{Bus, BusError, SCAN_CAPACITY};
use embassy_rp::gpio::Output;
use embassy_rp::i2c::{self, AbortReason, I2c};
use embassy_rp::spi::{self, Spi};
use heapless::Vec;

/// Addresses outside this range are reserved by the I2C spec.
const SCAN_RANGE: core::ops::RangeInclusive<u8> = 0x08..=0x77;

impl From<i2c::Error> for BusError {
    fn from(e: i2c::Error) -> Self {
        match e {
            i2c::Error::Abort(AbortReason::NoAcknowledge) => BusError::Nack,
            i2c::Error::AddressOutOfRange(_) | i2c::Error::AddressReserved(_) => BusError::InvalidAddress,
            _ => BusError::Other,
        }
    }
}

pub struct I2cBus<'d, T: i2c::Instance> {
    i2c: I2c<'d, T, i2c::Blocking>,
    address: u8,
}

impl<'d, T: i2c::Instance> I2cBus<'d, T> {
    pub fn new(i2c: I2c<'d, T, i2c::Blocking>) -> Self {
        Self { i2c, address: 0 }
    }
}

impl<T: i2c::Instance> Bus for I2cBus<'_, T> {
    fn set_target_address(&mut self, address: u8) -> Result<(), BusError> {
        if address > 0x7f {
            return Err(BusError::InvalidAddress);
        }
        self.address = address;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        Ok(self.i2c.blocking_write(self.address, bytes)?)
    }

    fn write_then_read(&mut self, bytes: &mut [u8]) -> Result<(), BusError> {
        let request: Vec<u8, ARG_CAPACITY> = Vec::from_slice(bytes).map_err(|_| BusError::Other)?;
        Ok(self.i2c.blocking_write_read(self.address, &request, bytes)?)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), BusError> {
        Ok(self.i2c.blocking_read(self.address, buffer)?)
    }

    fn scan_for_devices(&mut self, found: &mut Vec<u8, SCAN_CAPACITY>) -> Result<(), BusError> {
        let mut probe = [0u8; 1];
        for address in SCAN_RANGE {
            if self.i2c.blocking_read(address, &mut probe).is_ok() {
                let _ = found.push(address);
            }
        }
        Ok(())
    }
}

/// SPI controller with a single software-driven chip select.
///
/// SPI has no addressing, so addressing and scanning are unsupported.
pub struct SpiBus<'d, T: spi::Instance> {
    spi: Spi<'d, T, spi::Blocking>,
    cs: Output<'d>,
}

impl<'d, T: spi::Instance> SpiBus<'d, T> {
    pub fn new(spi: Spi<'d, T, spi::Blocking>, cs: Output<'d>) -> Self {
        Self { spi, cs }
    }

    fn selected<R>(&mut self, f: impl FnOnce(&mut Spi<'d, T, spi::Blocking>) -> Result<R, spi::Error>) -> Result<R, BusError> {
        self.cs.set_low();
        let result = f(&mut self.spi);
        self.cs.set_high();
        result.map_err(|_| BusError::Other)
    }
}

impl<T: spi::Instance> Bus for SpiBus<'_, T> {
    fn set_target_address(&mut self, _address: u8) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.selected(|spi| spi.blocking_write(bytes))
    }

    fn write_then_read(&mut self, bytes: &mut [u8]) -> Result<(), BusError> {
        self.selected(|spi| {
            spi.blocking_write(bytes)?;
            spi.blocking_read(bytes)
        })
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), BusError> {
        self.selected(|spi| spi.blocking_read(buffer))
    }

    fn scan_for_devices(&mut self, _found: &mut Vec<u8, SCAN_CAPACITY>) -> Result<(), BusError> {
        Err(BusError::Unsupported)
    }
}
