//! PT100 resistance and temperature types.
//!
//! - RawCode: 15 bit ratio of RTD to reference resistance
//! - Resistance: 0.01 ohm resolution
//! - Temperature: 0.1 C resolution, -200.0 C to 850.0 C

use core::fmt;

mod cvd;

pub use self::cvd::Branch;

/// Full scale of the 15-bit ADC.
pub const ADC_FULL_SCALE: i64 = 32768;

/// Reference resistor fitted on most PT100 breakout boards, in ohms.
pub const DEFAULT_REFERENCE_OHMS: u16 = 426;

/// Ratio of RTD resistance to the reference resistor, scaled to `0..=32767`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawCode(u16);

impl RawCode {
    pub const MAX: RawCode = RawCode(0x7fff);

    /// Keeps the low 15 bits of `code`.
    pub const fn new(code: u16) -> Self {
        RawCode(code & 0x7fff)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// RTD resistance in hundredths of an ohm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resistance(i32);

impl Resistance {
    /// Resistance of a PT100 element at 0 C.
    pub const ICE_POINT: Resistance = Resistance(10000);

    pub const fn from_hundredths(hundredths: i32) -> Self {
        Resistance(hundredths)
    }

    /// Scale a raw code against the reference resistor.
    pub fn from_raw(raw: RawCode, reference_ohms: u16) -> Self {
        let scaled = i64::from(raw.bits()) * i64::from(reference_ohms) * 100 / ADC_FULL_SCALE;
        // 0x7fff * 0xffff * 100 / 32768 still fits an i32
        Resistance(scaled as i32)
    }

    pub const fn hundredths(self) -> i32 {
        self.0
    }

    pub fn ohms(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

/// Temperature in tenths of a degree Celsius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(i16);

impl Temperature {
    /// -200.0 C, lower end of the IEC 60751 range.
    pub const MIN: Temperature = Temperature(-2000);
    /// 850.0 C, upper end of the IEC 60751 range.
    pub const MAX: Temperature = Temperature(8500);

    /// Convert an RTD resistance with the Callendar-Van Dusen equation.
    ///
    /// Always returns a value in `MIN..=MAX`, whatever the input.
    pub fn from_resistance(resistance: Resistance) -> Self {
        Temperature(cvd::temperature(resistance.hundredths()))
    }

    pub const fn tenths(self) -> i16 {
        self.0
    }

    pub fn celsius(self) -> f32 {
        self.0 as f32 / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}
