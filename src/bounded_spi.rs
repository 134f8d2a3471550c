//! `SpiDevice` on top of an embedded-hal 0.2 full-duplex bus and a chip select pin.
//!
//! Each byte waits a bounded number of polls for the bus. A bus that never
//! becomes ready is reported as `BoundedSpiError::Timeout` instead of reading
//! back as zero, so a dead bus cannot pass for a 0 ohm RTD.

use embedded_hal_02::digital::v2::OutputPin;
use embedded_hal_02::spi::FullDuplex;
use embedded_hal_1::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

/// Polls per send or receive before giving up.
pub const DEFAULT_RETRIES: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoundedSpiError<SE, PE> {
    /// Bus did not accept or deliver a byte within the retry budget.
    Timeout,
    /// SPI bus error
    Spi(SE),
    /// Chip select pin error
    Pin(PE),
}

impl<SE: core::fmt::Debug, PE: core::fmt::Debug> spi::Error for BoundedSpiError<SE, PE> {
    fn kind(&self) -> ErrorKind {
        match self {
            BoundedSpiError::Pin(_) => ErrorKind::ChipSelectFault,
            _ => ErrorKind::Other,
        }
    }
}

pub struct BoundedSpi<SPI, CS> {
    spi: SPI,
    cs: CS,
    retries: u16,
}

impl<SPI, CS, SE, PE> BoundedSpi<SPI, CS>
where
    SPI: FullDuplex<u8, Error = SE>,
    CS: OutputPin<Error = PE>,
{
    /// Chip select is driven high (deselected) here.
    pub fn new(spi: SPI, cs: CS) -> Result<Self, BoundedSpiError<SE, PE>> {
        Self::with_retries(spi, cs, DEFAULT_RETRIES)
    }

    pub fn with_retries(spi: SPI, mut cs: CS, retries: u16) -> Result<Self, BoundedSpiError<SE, PE>> {
        cs.set_high().map_err(BoundedSpiError::Pin)?;
        Ok(BoundedSpi { spi, cs, retries })
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn transfer_byte(&mut self, byte: u8) -> Result<u8, BoundedSpiError<SE, PE>> {
        let retries = self.retries;
        let spi = &mut self.spi;
        poll::<_, _, SE, PE>(retries, || spi.send(byte))?;
        poll(retries, || spi.read())
    }

    fn run(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), BoundedSpiError<SE, PE>> {
        for op in operations.iter_mut() {
            match op {
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.transfer_byte(0x00)?;
                    }
                }
                Operation::Write(buf) => {
                    for &b in buf.iter() {
                        self.transfer_byte(b)?;
                    }
                }
                Operation::Transfer(read, write) => {
                    let len = core::cmp::max(read.len(), write.len());
                    for i in 0..len {
                        let received = self.transfer_byte(write.get(i).copied().unwrap_or(0x00))?;
                        if let Some(b) = read.get_mut(i) {
                            *b = received;
                        }
                    }
                }
                Operation::TransferInPlace(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.transfer_byte(*b)?;
                    }
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
        Ok(())
    }
}

fn poll<T, F, SE, PE>(retries: u16, mut f: F) -> Result<T, BoundedSpiError<SE, PE>>
where
    F: FnMut() -> nb::Result<T, SE>,
{
    for _ in 0..=retries {
        match f() {
            Ok(value) => return Ok(value),
            Err(nb::Error::WouldBlock) => continue,
            Err(nb::Error::Other(e)) => return Err(BoundedSpiError::Spi(e)),
        }
    }

    #[cfg(feature = "defmt")]
    defmt::warn!("spi timeout after {=u16} polls", retries);

    Err(BoundedSpiError::Timeout)
}

impl<SPI, CS, SE, PE> ErrorType for BoundedSpi<SPI, CS>
where
    SPI: FullDuplex<u8, Error = SE>,
    CS: OutputPin<Error = PE>,
    SE: core::fmt::Debug,
    PE: core::fmt::Debug,
{
    type Error = BoundedSpiError<SE, PE>;
}

impl<SPI, CS, SE, PE> SpiDevice for BoundedSpi<SPI, CS>
where
    SPI: FullDuplex<u8, Error = SE>,
    CS: OutputPin<Error = PE>,
    SE: core::fmt::Debug,
    PE: core::fmt::Debug,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(BoundedSpiError::Pin)?;
        let result = self.run(operations);
        // deselect even when the transfer failed
        let deselect = self.cs.set_high().map_err(BoundedSpiError::Pin);
        result.and(deselect)
    }
}
