use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
    ops::{Div, Mul},
};

/// The symbols used for each SI base dimension, in the order they are stored.
pub(crate) const BASE_SYMBOLS: [&str; 7] = ["kg", "m", "s", "A", "K", "mol", "cd"];

/// The physical dimension of a quantity, expressed as integer powers of the
/// seven SI base dimensions.
///
/// Angles are treated as dimensionless.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    exponents: [i8; 7],
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension::new([0; 7]);
    pub const MASS: Dimension = Dimension::new([1, 0, 0, 0, 0, 0, 0]);
    pub const LENGTH: Dimension = Dimension::new([0, 1, 0, 0, 0, 0, 0]);
    pub const TIME: Dimension = Dimension::new([0, 0, 1, 0, 0, 0, 0]);
    pub const CURRENT: Dimension = Dimension::new([0, 0, 0, 1, 0, 0, 0]);
    pub const TEMPERATURE: Dimension = Dimension::new([0, 0, 0, 0, 1, 0, 0]);
    pub const AMOUNT: Dimension = Dimension::new([0, 0, 0, 0, 0, 1, 0]);
    pub const LUMINOUS_INTENSITY: Dimension =
        Dimension::new([0, 0, 0, 0, 0, 0, 1]);

    const fn new(exponents: [i8; 7]) -> Dimension { Dimension { exponents } }

    pub fn is_dimensionless(self) -> bool { self == Dimension::DIMENSIONLESS }

    /// # Panics
    ///
    /// If an exponent no longer fits in an `i8`. See
    /// [`Dimension::checked_powi()`].
    pub fn powi(self, exponent: i32) -> Dimension {
        self.checked_powi(exponent).unwrap_or_else(|| {
            panic!("Raising {} to the power of {} overflowed", self, exponent)
        })
    }

    pub fn checked_powi(self, exponent: i32) -> Option<Dimension> {
        let mut exponents = self.exponents;
        for e in &mut exponents {
            let scaled = i32::from(*e).checked_mul(exponent)?;
            *e = i8::try_from(scaled).ok()?;
        }

        Some(Dimension { exponents })
    }

    pub fn checked_mul(self, rhs: Dimension) -> Option<Dimension> {
        let mut exponents = self.exponents;
        for (e, r) in exponents.iter_mut().zip(rhs.exponents.iter()) {
            *e = e.checked_add(*r)?;
        }

        Some(Dimension { exponents })
    }

    pub fn checked_div(self, rhs: Dimension) -> Option<Dimension> {
        self.checked_mul(rhs.checked_powi(-1)?)
    }

    /// Each base symbol paired with its (non-zero) exponent.
    pub(crate) fn terms(self) -> impl Iterator<Item = (&'static str, i32)> {
        BASE_SYMBOLS
            .iter()
            .zip(self.exponents.iter())
            .filter(|(_, e)| **e != 0)
            .map(|(symbol, e)| (*symbol, i32::from(*e)))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        self.checked_mul(rhs).unwrap_or_else(|| {
            panic!("Multiplying {} by {} overflowed", self, rhs)
        })
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self.checked_div(rhs).unwrap_or_else(|| {
            panic!("Dividing {} by {} overflowed", self, rhs)
        })
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let mut first = true;

        for (symbol, exponent) in self.terms() {
            if !first {
                write!(f, "*")?;
            }
            first = false;

            if exponent == 1 {
                write!(f, "[{}]", symbol)?;
            } else {
                write!(f, "[{}]^{}", symbol, exponent)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_squared() {
        let velocity = Dimension::LENGTH / Dimension::TIME;

        let got = velocity.powi(2);

        assert_eq!(
            got.terms().collect::<Vec<_>>(),
            vec![("m", 2), ("s", -2)]
        );
    }

    #[test]
    fn dividing_by_yourself_is_dimensionless() {
        let force = Dimension::MASS * Dimension::LENGTH
            / Dimension::TIME.powi(2);

        assert!((force / force).is_dimensionless());
        assert!(!force.is_dimensionless());
    }

    #[test]
    fn exponents_that_dont_fit_are_caught() {
        let length = Dimension::LENGTH;

        assert_eq!(
            length.checked_powi(127).unwrap().terms().next(),
            Some(("m", 127))
        );
        assert_eq!(length.checked_powi(128), None);
        assert_eq!(length.checked_powi(256), None);
        assert_eq!(
            length.checked_powi(-128).unwrap().terms().next(),
            Some(("m", -128))
        );

        let big = length.powi(100);
        assert_eq!(big.checked_mul(big), None);
        assert_eq!(big.checked_div(big), Some(Dimension::DIMENSIONLESS));
        assert_eq!(length.powi(-128).checked_div(length), None);
    }

    #[test]
    #[should_panic]
    fn overflowing_multiplication_panics() {
        let big = Dimension::LENGTH.powi(100);

        let _ = big * big;
    }

    #[test]
    fn display() {
        let inputs = vec![
            (Dimension::DIMENSIONLESS, "dimensionless"),
            (Dimension::LENGTH, "[m]"),
            (
                Dimension::MASS * Dimension::LENGTH / Dimension::TIME.powi(2),
                "[kg]*[m]*[s]^-2",
            ),
        ];

        for (dimension, should_be) in inputs {
            assert_eq!(dimension.to_string(), should_be);
        }
    }
}
