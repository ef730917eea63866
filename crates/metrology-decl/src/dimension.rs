//! Physical dimensions of quantities.
//!
//! A quantity may declare its dimension as a vector of SI base exponents.
//! Derivation expressions are checked against it: `{0} / {1}` over
//! length and time must produce exactly the dimension of speed.
//!
//! All arithmetic is checked; an exponent leaving the `i8` range yields
//! `None` instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SI base dimensional exponents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimension {
    /// Length (L), metre
    pub length: i8,
    /// Mass (M), kilogram
    pub mass: i8,
    /// Time (T), second
    pub time: i8,
    /// Temperature (Θ), kelvin
    pub temperature: i8,
    /// Electric current (I), ampere
    pub current: i8,
    /// Amount of substance (N), mole
    pub amount: i8,
    /// Luminous intensity (J), candela
    pub luminosity: i8,
    /// Plane angle, radian. Dimensionless in SI but tracked separately.
    pub angle: i8,
}

const SYMBOLS: [&str; 8] = ["m", "kg", "s", "K", "A", "mol", "cd", "rad"];

impl Dimension {
    /// All exponents zero.
    pub const DIMENSIONLESS: Dimension = Dimension {
        length: 0,
        mass: 0,
        time: 0,
        temperature: 0,
        current: 0,
        amount: 0,
        luminosity: 0,
        angle: 0,
    };

    /// Length dimension (L).
    pub const LENGTH: Dimension = Dimension {
        length: 1,
        ..Self::DIMENSIONLESS
    };

    /// Mass dimension (M).
    pub const MASS: Dimension = Dimension {
        mass: 1,
        ..Self::DIMENSIONLESS
    };

    /// Time dimension (T).
    pub const TIME: Dimension = Dimension {
        time: 1,
        ..Self::DIMENSIONLESS
    };

    /// Temperature dimension (Θ).
    pub const TEMPERATURE: Dimension = Dimension {
        temperature: 1,
        ..Self::DIMENSIONLESS
    };

    fn exponents(&self) -> [i8; 8] {
        [
            self.length,
            self.mass,
            self.time,
            self.temperature,
            self.current,
            self.amount,
            self.luminosity,
            self.angle,
        ]
    }

    fn from_exponents(e: [i8; 8]) -> Self {
        Dimension {
            length: e[0],
            mass: e[1],
            time: e[2],
            temperature: e[3],
            current: e[4],
            amount: e[5],
            luminosity: e[6],
            angle: e[7],
        }
    }

    fn zip_checked(&self, other: &Dimension, op: fn(i8, i8) -> Option<i8>) -> Option<Dimension> {
        let (lhs, rhs) = (self.exponents(), other.exponents());
        let mut out = [0i8; 8];
        for i in 0..8 {
            out[i] = op(lhs[i], rhs[i])?;
        }
        Some(Self::from_exponents(out))
    }

    /// Check if all exponents are zero.
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    /// Multiply dimensions (add exponents).
    pub fn multiply(&self, other: &Dimension) -> Option<Dimension> {
        self.zip_checked(other, i8::checked_add)
    }

    /// Divide dimensions (subtract exponents).
    pub fn divide(&self, other: &Dimension) -> Option<Dimension> {
        self.zip_checked(other, i8::checked_sub)
    }

    /// Raise to an integer power (scale exponents).
    pub fn pow(&self, exponent: i32) -> Option<Dimension> {
        let factor = i8::try_from(exponent).ok()?;
        let mut out = self.exponents();
        for e in &mut out {
            *e = e.checked_mul(factor)?;
        }
        Some(Self::from_exponents(out))
    }

    /// Take the `degree`-th root. Every exponent must divide exactly.
    pub fn root(&self, degree: i8) -> Option<Dimension> {
        if degree <= 0 {
            return None;
        }
        let mut out = self.exponents();
        for e in &mut out {
            if *e % degree != 0 {
                return None;
            }
            *e /= degree;
        }
        Some(Self::from_exponents(out))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }

        let parts: Vec<String> = self
            .exponents()
            .iter()
            .zip(SYMBOLS)
            .filter(|(exp, _)| **exp != 0)
            .map(|(exp, symbol)| match exp {
                1 => symbol.to_string(),
                _ => format!("{symbol}^{exp}"),
            })
            .collect();
        write!(f, "{}", parts.join("·"))
    }
}
