//! Metric and binary prefixes for prefixed unit instances.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix applied to an original unit instance, e.g. `Kilo` of `Metre`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPrefix {
    Yotta,
    Zetta,
    Exa,
    Peta,
    Tera,
    Giga,
    Mega,
    Kilo,
    Hecto,
    Deca,
    Deci,
    Centi,
    Milli,
    Micro,
    Nano,
    Pico,
    Femto,
    Atto,
    Zepto,
    Yocto,
    Kibi,
    Mebi,
    Gibi,
    Tebi,
    Pebi,
    Exbi,
    Zebi,
    Yobi,
}

/// SI prefixes with their power-of-ten exponents, ordered by scale.
const DECIMAL_PREFIXES: &[(MetricPrefix, &str, i32)] = &[
    (MetricPrefix::Yotta, "Y", 24),
    (MetricPrefix::Zetta, "Z", 21),
    (MetricPrefix::Exa, "E", 18),
    (MetricPrefix::Peta, "P", 15),
    (MetricPrefix::Tera, "T", 12),
    (MetricPrefix::Giga, "G", 9),
    (MetricPrefix::Mega, "M", 6),
    (MetricPrefix::Kilo, "k", 3),
    (MetricPrefix::Hecto, "h", 2),
    (MetricPrefix::Deca, "da", 1),
    (MetricPrefix::Deci, "d", -1),
    (MetricPrefix::Centi, "c", -2),
    (MetricPrefix::Milli, "m", -3),
    (MetricPrefix::Micro, "μ", -6),
    (MetricPrefix::Nano, "n", -9),
    (MetricPrefix::Pico, "p", -12),
    (MetricPrefix::Femto, "f", -15),
    (MetricPrefix::Atto, "a", -18),
    (MetricPrefix::Zepto, "z", -21),
    (MetricPrefix::Yocto, "y", -24),
];

/// IEC binary prefixes with their power-of-two exponents.
const BINARY_PREFIXES: &[(MetricPrefix, &str, i32)] = &[
    (MetricPrefix::Kibi, "Ki", 10),
    (MetricPrefix::Mebi, "Mi", 20),
    (MetricPrefix::Gibi, "Gi", 30),
    (MetricPrefix::Tebi, "Ti", 40),
    (MetricPrefix::Pebi, "Pi", 50),
    (MetricPrefix::Exbi, "Ei", 60),
    (MetricPrefix::Zebi, "Zi", 70),
    (MetricPrefix::Yobi, "Yi", 80),
];

impl MetricPrefix {
    fn entry(self) -> (bool, &'static str, i32) {
        if let Some(&(_, symbol, exp)) = DECIMAL_PREFIXES.iter().find(|(p, _, _)| *p == self) {
            return (false, symbol, exp);
        }
        match BINARY_PREFIXES.iter().find(|(p, _, _)| *p == self) {
            Some(&(_, symbol, exp)) => (true, symbol, exp),
            None => (false, "", 0),
        }
    }

    /// Unit symbol prefix, e.g. `"k"` or `"Ki"`.
    pub fn symbol(self) -> &'static str {
        self.entry().1
    }

    /// Whether this is an IEC binary prefix.
    pub fn is_binary(self) -> bool {
        self.entry().0
    }

    /// Multiplicative factor relative to the unprefixed instance.
    pub fn factor(self) -> f64 {
        match self.entry() {
            (true, _, exp) => 2.0_f64.powi(exp),
            (false, _, exp) => 10.0_f64.powi(exp),
        }
    }

    /// Looks a prefix up by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        DECIMAL_PREFIXES
            .iter()
            .chain(BINARY_PREFIXES)
            .find(|(_, s, _)| *s == symbol)
            .map(|(p, _, _)| *p)
            .or(if symbol == "u" { Some(Self::Micro) } else { None })
    }
}

impl fmt::Display for MetricPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
