// src/leaves/units.rs

use core::fmt;

/// Maps a raw pressure register word to an engineering value.
///
/// Sensor models differ in their linearization, so the mapping is injected
/// into each [`PLeaf`](super::PLeaf) at construction. Closures work too:
///
/// ```
/// use xerxes::leaves::{Conversion, Linear};
///
/// let micro_bar_to_pascal = |raw: u32| f64::from(raw) / 10.0;
/// assert_eq!(micro_bar_to_pascal.convert(1000), 100.0);
/// assert_eq!(Linear::new(0.5, 1.0).convert(4), 3.0);
/// ```
pub trait Conversion: Send + Sync {
    fn convert(&self, raw: u32) -> f64;
}

impl<F> Conversion for F
where
    F: Fn(u32) -> f64 + Send + Sync,
{
    fn convert(&self, raw: u32) -> f64 {
        self(raw)
    }
}

/// `raw * gain + offset`.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Linear {
    pub gain: f64,
    pub offset: f64,
}

impl Linear {
    pub const IDENTITY: Linear = Linear { gain: 1.0, offset: 0.0 };

    pub const fn new(gain: f64, offset: f64) -> Self {
        Linear { gain, offset }
    }
}

impl Conversion for Linear {
    fn convert(&self, raw: u32) -> f64 {
        f64::from(raw) * self.gain + self.offset
    }
}

/// Absolute temperature.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Temperature(f64);

impl Temperature {
    const ZERO_CELSIUS: f64 = 273.15;

    pub const fn from_kelvin(kelvin: f64) -> Self {
        Temperature(kelvin)
    }

    /// Leaves report temperatures as milli-kelvin register words.
    pub fn from_milli_kelvin(milli_kelvin: u32) -> Self {
        Temperature(f64::from(milli_kelvin) / 1000.0)
    }

    pub fn from_celsius(celsius: f64) -> Self {
        Temperature(celsius + Self::ZERO_CELSIUS)
    }

    #[inline]
    pub const fn kelvin(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn celsius(&self) -> f64 {
        self.0 - Self::ZERO_CELSIUS
    }

    /// Unit used in summaries, degrees Celsius.
    #[inline]
    pub fn preferred(&self) -> f64 {
        self.celsius()
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} °C", self.celsius())
    }
}
