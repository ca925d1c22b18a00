//! Thermistor conversion for the slave's ADC reading.
//!
//! The slave samples an NTC thermistor through a voltage divider with a 12-bit
//! ADC. The raw count is turned into a resistance, then into a temperature
//! with the Beta form of the Steinhart-Hart equation:
//!
//! ```text
//! V       = raw * Vcc / 4095
//! R       = R_fixed / (Vcc / V - 1)
//! 1 / T_K = 1 / T0_K + ln(R / R_nominal) / Beta
//! ```
//!
//! Celsius is truncated toward zero before the Fahrenheit conversion, which
//! is evaluated with real (not integer) division.

use thiserror_no_std::Error;

use crate::protocol::ADC_MAX;

const KELVIN_OFFSET: f32 = 273.15;

/// Electrical parameters of the thermistor divider on the slave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermistorParams {
    /// Resistance at [`Self::t_nominal_c`], in ohms
    pub r_nominal: f32,
    /// Nominal temperature, in °C
    pub t_nominal_c: f32,
    /// Beta coefficient
    pub beta: f32,
    /// ADC reference / divider supply voltage
    pub vcc: f32,
    /// Fixed divider resistor, in ohms
    pub r_fixed: f32,
}

impl ThermistorParams {
    /// Values calibrated for the deployed slave board.
    pub const DEFAULT: Self = Self {
        r_nominal: 10_000.0,
        t_nominal_c: 18.3,
        beta: 10_050.0,
        vcc: 3.3,
        r_fixed: 9_000.0,
    };
}

impl Default for ThermistorParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reasons a raw reading cannot be turned into a temperature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    #[error("ADC reading {raw} is full scale; divider resistance is undefined")]
    DivideByZero { raw: u16 },
    #[error("ADC reading {raw} exceeds the 12-bit range")]
    OutOfRange { raw: u16 },
    #[error("ADC reading {raw} produced a non-finite temperature")]
    NonFinite { raw: u16 },
}

/// A converted temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperature {
    /// Whole degrees Celsius, truncated toward zero
    pub celsius: i32,
    /// Degrees Fahrenheit, rounded to the nearest integer
    pub fahrenheit: i32,
}

impl Temperature {
    fn from_celsius(celsius: i32) -> Self {
        let fahrenheit = libm::roundf(celsius as f32 * 9.0 / 5.0 + 32.0) as i32;
        Self {
            celsius,
            fahrenheit,
        }
    }

    /// Fahrenheit clamped into the 16-bit unsigned register.
    pub fn register_value(&self) -> u16 {
        self.fahrenheit.clamp(0, u16::MAX as i32) as u16
    }
}

/// Convert a raw 12-bit ADC count to a temperature.
pub fn convert(raw: u16, params: &ThermistorParams) -> Result<Temperature, DomainError> {
    if raw > ADC_MAX {
        return Err(DomainError::OutOfRange { raw });
    }
    if raw == ADC_MAX {
        return Err(DomainError::DivideByZero { raw });
    }

    let voltage = raw as f32 * (params.vcc / ADC_MAX as f32);
    // At raw == 0 this is R_fixed / inf == 0, i.e. a shorted thermistor
    let resistance = params.r_fixed / ((params.vcc / voltage) - 1.0);

    let t0_k = params.t_nominal_c + KELVIN_OFFSET;
    let inv_t = 1.0 / t0_k + libm::logf(resistance / params.r_nominal) / params.beta;
    let kelvin = 1.0 / inv_t;
    let celsius = kelvin - KELVIN_OFFSET;

    if !celsius.is_finite() {
        return Err(DomainError::NonFinite { raw });
    }

    Ok(Temperature::from_celsius(celsius as i32))
}
