//! Unit conversion for aggregated values.
//!
//! Units are written the way metpy/pint spell them (`m`, `mm`, `K`, `degC`,
//! `m/s`, ...). Each known unit maps onto a base unit of its dimension with a
//! scale and an offset, so affine temperature scales convert correctly.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum UnitError {
    #[error("Unknown unit `{0}`")]
    Unknown(String),

    #[error("Cannot convert `{from}` to `{to}`: incompatible dimensions")]
    Incompatible { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Temperature,
    Pressure,
    Speed,
    Dimensionless,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Unit {
    dimension: Dimension,
    // base = value * scale + offset
    scale: f64,
    offset: f64,
}

impl Unit {
    const fn linear(dimension: Dimension, scale: f64) -> Self {
        Unit {
            dimension,
            scale,
            offset: 0.0,
        }
    }

    fn parse(s: &str) -> Result<Self, UnitError> {
        use Dimension::*;

        let unit = match s.trim() {
            "m" | "meter" | "metre" | "meters" | "metres" => Unit::linear(Length, 1.0),
            "cm" | "centimeter" | "centimetre" => Unit::linear(Length, 1e-2),
            "mm" | "millimeter" | "millimetre" => Unit::linear(Length, 1e-3),
            "km" | "kilometer" | "kilometre" => Unit::linear(Length, 1e3),
            "in" | "inch" | "inches" => Unit::linear(Length, 0.0254),

            "K" | "kelvin" => Unit::linear(Temperature, 1.0),
            "degC" | "°C" | "celsius" | "degree_Celsius" => Unit {
                dimension: Temperature,
                scale: 1.0,
                offset: 273.15,
            },
            "degF" | "°F" | "fahrenheit" | "degree_Fahrenheit" => Unit {
                dimension: Temperature,
                scale: 5.0 / 9.0,
                offset: 273.15 - 32.0 * 5.0 / 9.0,
            },

            "Pa" | "pascal" => Unit::linear(Pressure, 1.0),
            "hPa" | "hectopascal" | "mbar" => Unit::linear(Pressure, 1e2),
            "kPa" | "kilopascal" => Unit::linear(Pressure, 1e3),

            "m/s" | "m s**-1" | "m s-1" | "meter / second" => Unit::linear(Speed, 1.0),
            "km/h" | "km h**-1" | "kilometer / hour" => Unit::linear(Speed, 1.0 / 3.6),

            "1" | "dimensionless" | "fraction" => Unit::linear(Dimensionless, 1.0),
            "%" | "percent" => Unit::linear(Dimensionless, 1e-2),

            other => return Err(UnitError::Unknown(other.to_string())),
        };

        Ok(unit)
    }
}

/// A validated conversion between two units of the same dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    from: Unit,
    to: Unit,
}

impl Conversion {
    pub fn new(from: &str, to: &str) -> Result<Self, UnitError> {
        let (from_unit, to_unit) = (Unit::parse(from)?, Unit::parse(to)?);

        if from_unit.dimension != to_unit.dimension {
            return Err(UnitError::Incompatible {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(Conversion {
            from: from_unit,
            to: to_unit,
        })
    }

    pub fn apply(&self, value: f64) -> f64 {
        let base = value * self.from.scale + self.from.offset;
        (base - self.to.offset) / self.to.scale
    }
}

/// Returns the conversion needed between two unit strings, or `None` when
/// they are spelled the same and values pass through untouched.
pub fn conversion(from: &str, to: &str) -> Result<Option<Conversion>, UnitError> {
    if from == to {
        return Ok(None);
    }

    Conversion::new(from, to).map(Some)
}

// -- Tests -------------------------------------------------------------------
