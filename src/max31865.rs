//! MAX31865 RTD-to-digital converter, PT100 in continuous conversion mode.
//!
//! Every read checks the fault bit of the RTD LSB register. A set bit is cleared
//! right away by rewriting the configuration register; the reading is still
//! returned, flagged, so the caller can decide to drop it.

use embedded_hal_1::delay::DelayUs;
use embedded_hal_1::spi::SpiDevice;

use crate::rtd::{RawCode, Resistance, Temperature, DEFAULT_REFERENCE_OHMS};

const MAX31865_WRITE: u8 = 0x80;

const MAX31865_CONFIG_ADDR: u8 = 0x00;
const MAX31865_RTD_MSB_ADDR: u8 = 0x01;

const MAX31865_CONFIG_VBIAS: u8 = 0b1000_0000;
const MAX31865_CONFIG_AUTO_CONVERSION: u8 = 0b0100_0000;
const MAX31865_CONFIG_THREE_WIRE: u8 = 0b0001_0000;
const MAX31865_CONFIG_FAULT_CLEAR: u8 = 0b0000_0010;
const MAX31865_CONFIG_FILTER_50HZ: u8 = 0b0000_0001;

const MAX31865_RTD_FAULT: u16 = 0x0001;

/// Bias voltage and first conversion settle time after configuration.
const MAX31865_STARTUP_MS: u32 = 100;

/// MAX31865 errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI bus error
    Spi(E),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wiring {
    TwoOrFourWire,
    ThreeWire,
}

impl Default for Wiring {
    fn default() -> Self {
        Wiring::ThreeWire
    }
}

/// Notch filter for the mains frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Filter {
    Hz50,
    Hz60,
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Hz60
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub wiring: Wiring,
    pub filter: Filter,
    /// Reference resistor on the board, in ohms.
    pub reference_ohms: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            wiring: Wiring::ThreeWire,
            filter: Filter::Hz60,
            reference_ohms: DEFAULT_REFERENCE_OHMS,
        }
    }
}

impl Config {
    /// Configuration register value. Bias and continuous conversion are always
    /// on, and the fault status clear bit is set so the same write also clears
    /// a latched fault.
    pub fn bits(&self) -> u8 {
        let mut bits = MAX31865_CONFIG_VBIAS | MAX31865_CONFIG_AUTO_CONVERSION | MAX31865_CONFIG_FAULT_CLEAR;
        if self.wiring == Wiring::ThreeWire {
            bits |= MAX31865_CONFIG_THREE_WIRE;
        }
        if self.filter == Filter::Hz50 {
            bits |= MAX31865_CONFIG_FILTER_50HZ;
        }
        bits
    }
}

/// Decoded RTD MSB/LSB register pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterReading {
    pub raw: RawCode,
    pub fault: bool,
}

impl RegisterReading {
    pub fn decode(msb: u8, lsb: u8) -> Self {
        let word = u16::from_be_bytes([msb, lsb]);
        RegisterReading {
            raw: RawCode::new(word >> 1),
            fault: word & MAX31865_RTD_FAULT != 0,
        }
    }
}

/// One measurement cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub raw: RawCode,
    /// resistance in 0.01 ohm
    pub resistance: Resistance,
    /// temperature in 0.1 C, always within -200.0 C to 850.0 C
    pub temperature: Temperature,
    /// The device reported a fault during this read, temperature is unreliable.
    pub fault: bool,
}

impl Reading {
    pub fn new(register: RegisterReading, reference_ohms: u16) -> Self {
        let resistance = Resistance::from_raw(register.raw, reference_ohms);
        Reading {
            raw: register.raw,
            resistance,
            temperature: Temperature::from_resistance(resistance),
            fault: register.fault,
        }
    }
}

/// MAX31865 with a PT100 element.
pub struct Max31865<SPI> {
    spi: SPI,
    config: Config,
}

impl<SPI> Max31865<SPI>
where
    SPI: SpiDevice,
{
    pub fn new(spi: SPI, config: Config) -> Self {
        Max31865 { spi, config }
    }

    /// Write the configuration and wait for the first conversion.
    pub fn init(&mut self, delay: &mut impl DelayUs) -> Result<(), Error<SPI::Error>> {
        self.write_config()?;
        delay.delay_ms(MAX31865_STARTUP_MS);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) -> Result<(), Error<SPI::Error>> {
        self.config = config;
        self.write_config()
    }

    /// Read the RTD registers. On a fault the configuration is written again,
    /// which clears the fault status and keeps conversions running.
    pub fn read_register(&mut self) -> Result<RegisterReading, Error<SPI::Error>> {
        let mut buf = [MAX31865_RTD_MSB_ADDR, 0x00, 0x00];
        self.spi.transfer_in_place(&mut buf).map_err(Error::Spi)?;

        let reading = RegisterReading::decode(buf[1], buf[2]);
        if reading.fault {
            #[cfg(feature = "defmt")]
            defmt::warn!("rtd fault, raw: {=u16}, clearing", reading.raw.bits());

            self.clear_fault()?;
        }
        Ok(reading)
    }

    pub fn clear_fault(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_config()
    }

    /// Read the RTD registers and convert to temperature.
    pub fn read(&mut self) -> Result<Reading, Error<SPI::Error>> {
        let register = self.read_register()?;
        Ok(Reading::new(register, self.config.reference_ohms))
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    fn write_config(&mut self) -> Result<(), Error<SPI::Error>> {
        let bits = self.config.bits();

        #[cfg(feature = "defmt")]
        defmt::debug!("config: {=u8:#04x}", bits);

        self.write_register(MAX31865_CONFIG_ADDR, bits)
    }

    fn write_register(&mut self, register: u8, payload: u8) -> Result<(), Error<SPI::Error>> {
        self.spi
            .write(&[MAX31865_WRITE | register, payload])
            .map_err(Error::Spi)
    }
}
