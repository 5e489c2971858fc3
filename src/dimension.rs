//! Physical dimensions: a vector of exponents over the seven SI base quantities. Two units can be
//! converted into each other exactly when their dimensions are equal.

use std::{
    fmt::Display,
    ops::{Add, Mul, Neg, Sub},
};

use crate::fract::{Frac, FracError};

/// The number of SI base dimensions.
pub const NUM_BASE_DIMENSIONS: usize = 7;

/// One of the seven SI base quantities.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Current,
    Temperature,
    Amount,
    Luminosity,
}

impl BaseDimension {
    /// Every base dimension, in the order used for [`DimensionVector`] components.
    pub const ALL: [BaseDimension; NUM_BASE_DIMENSIONS] = [
        BaseDimension::Length,
        BaseDimension::Mass,
        BaseDimension::Time,
        BaseDimension::Current,
        BaseDimension::Temperature,
        BaseDimension::Amount,
        BaseDimension::Luminosity,
    ];

    /// The position of this dimension in a [`DimensionVector`].
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            BaseDimension::Length => "length",
            BaseDimension::Mass => "mass",
            BaseDimension::Time => "time",
            BaseDimension::Current => "current",
            BaseDimension::Temperature => "temperature",
            BaseDimension::Amount => "amount",
            BaseDimension::Luminosity => "luminosity",
        }
    }

    /// The SI base unit measuring this dimension.
    pub const fn base_unit(&self) -> &'static str {
        match self {
            BaseDimension::Length => "meter",
            BaseDimension::Mass => "kilogram",
            BaseDimension::Time => "second",
            BaseDimension::Current => "ampere",
            BaseDimension::Temperature => "kelvin",
            BaseDimension::Amount => "mole",
            BaseDimension::Luminosity => "candela",
        }
    }
}

/// Exponents of the base dimensions. Exponents are rational, so that e.g. the square root of an
/// area is exactly a length and equality never suffers from floating-point drift.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct DimensionVector {
    exponents: [Frac; NUM_BASE_DIMENSIONS],
}

impl DimensionVector {
    /// The dimensionless vector, the identity under composition.
    pub const fn dimensionless() -> Self {
        Self {
            exponents: [Frac::ZERO; NUM_BASE_DIMENSIONS],
        }
    }

    /// Creates a vector with integer exponents, in the order of [`BaseDimension::ALL`].
    pub fn from_exponents(exponents: [i8; NUM_BASE_DIMENSIONS]) -> Self {
        Self {
            exponents: exponents.map(Frac::from),
        }
    }

    /// The vector of a single base dimension, e.g. `[length]`.
    pub fn of(dim: BaseDimension) -> Self {
        let mut out = Self::dimensionless();
        out.exponents[dim.index()] = Frac::ONE;
        out
    }

    /// The exponent of a single base dimension.
    pub fn get(&self, dim: BaseDimension) -> Frac {
        self.exponents[dim.index()]
    }

    pub fn exponents(&self) -> &[Frac; NUM_BASE_DIMENSIONS] {
        &self.exponents
    }

    /// Componentwise sum: the dimension of a product of units. Fails if an exponent overflows.
    pub fn checked_add(&self, other: &Self) -> Result<Self, FracError> {
        let mut out = *self;
        for (e, o) in out.exponents.iter_mut().zip(other.exponents) {
            *e = e.checked_add(o)?;
        }
        Ok(out)
    }

    /// Componentwise difference: the dimension of a quotient of units.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, FracError> {
        let mut out = *self;
        for (e, o) in out.exponents.iter_mut().zip(other.exponents) {
            *e = e.checked_sub(o)?;
        }
        Ok(out)
    }

    /// Multiplies every exponent: the dimension of a unit raised to a power.
    pub fn checked_scale(&self, exponent: Frac) -> Result<Self, FracError> {
        let mut out = *self;
        for e in out.exponents.iter_mut() {
            *e = e.checked_mul(exponent)?;
        }
        Ok(out)
    }

    /// [`DimensionVector::checked_scale`] for exponents known to be small. Panics on overflow.
    pub fn scale(&self, exponent: Frac) -> Self {
        Self {
            exponents: self.exponents.map(|e| e * exponent),
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| *e == Frac::ZERO)
    }
}

impl Add for DimensionVector {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        for (e, o) in self.exponents.iter_mut().zip(rhs.exponents) {
            *e += o;
        }
        self
    }
}

impl Sub for DimensionVector {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        for (e, o) in self.exponents.iter_mut().zip(rhs.exponents) {
            *e -= o;
        }
        self
    }
}

impl Mul<Frac> for DimensionVector {
    type Output = Self;

    fn mul(self, rhs: Frac) -> Self::Output {
        self.scale(rhs)
    }
}

impl Neg for DimensionVector {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.scale(Frac::NEG_ONE)
    }
}

impl std::fmt::Debug for DimensionVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DimensionVector({})", self)
    }
}

impl Display for DimensionVector {
    /// Writes e.g. `[length] * [time]^-2`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "[dimensionless]");
        }

        let parts: Vec<String> = BaseDimension::ALL
            .iter()
            .filter(|d| self.get(**d) != Frac::ZERO)
            .map(|d| {
                let e = self.get(*d);
                if e == Frac::ONE {
                    format!("[{}]", d.name())
                } else {
                    format!("[{}]^{}", d.name(), e)
                }
            })
            .collect();
        write!(f, "{}", parts.join(" * "))
    }
}
