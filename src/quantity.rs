//! Numbers with units attached.

use std::{
    fmt::Display,
    ops::{Add, Div, Mul, Neg, Sub},
};

use tracing::trace;

use crate::{
    dimension::DimensionVector,
    error::QuantityError,
    fract::Frac,
    magnitude::Magnitude,
    table::{from_kelvin, pow_frac, temperature_entry, to_kelvin},
    unit::{UnitArg, UnitExpression},
};

/// A magnitude, scalar or array, measured in a unit. Operations return new quantities; only
/// [`Quantity::set`] and [`Quantity::set_value`] modify one in place.
#[derive(Debug, Clone)]
pub struct Quantity {
    magnitude: Magnitude,
    unit: UnitExpression,
}

impl Quantity {
    /// Creates a quantity, parsing the unit if it is given as a string.
    pub fn new(
        value: impl Into<Magnitude>,
        unit: impl Into<UnitArg>,
    ) -> Result<Self, QuantityError> {
        Ok(Self::from_parts(value.into(), unit.into().resolve()?))
    }

    pub fn from_parts(magnitude: Magnitude, unit: UnitExpression) -> Self {
        Self { magnitude, unit }
    }

    /// A pure number.
    pub fn dimensionless(value: impl Into<Magnitude>) -> Self {
        Self::from_parts(value.into(), UnitExpression::dimensionless())
    }

    pub fn magnitude(&self) -> &Magnitude {
        &self.magnitude
    }

    /// The magnitude, if it is a single number.
    pub fn value(&self) -> Option<f64> {
        self.magnitude.as_scalar()
    }

    pub fn unit(&self) -> &UnitExpression {
        &self.unit
    }

    pub fn into_parts(self) -> (Magnitude, UnitExpression) {
        (self.magnitude, self.unit)
    }

    pub fn dimensionality(&self) -> DimensionVector {
        self.unit.dimensionality()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.unit.is_dimensionless()
    }

    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.unit.is_compatible_with(&other.unit)
    }

    /// The same amount expressed in `target`. Temperature scales with different zero points (e.g.
    /// Celsius to Fahrenheit) go through kelvin; everything else is multiplied by a constant
    /// factor.
    pub fn to(&self, target: impl Into<UnitArg>) -> Result<Self, QuantityError> {
        let target = target.into().resolve()?;
        if !self.unit.is_compatible_with(&target) {
            return Err(QuantityError::DimensionalityError {
                from: self.unit.to_string(),
                to: target.to_string(),
                from_dim: self.unit.dimensionality(),
                to_dim: target.dimensionality(),
            });
        }

        if let (Some(from), Some(to)) = (temperature_entry(&self.unit), temperature_entry(&target))
        {
            trace!(
                target: "metron::quantity",
                from = %self.unit,
                to = %target,
                "affine temperature conversion"
            );
            let magnitude = self.magnitude.map(|v| from_kelvin(to_kelvin(v, &from), &to));
            return Ok(Self::from_parts(magnitude, target));
        }

        let factor = self.unit.conversion_factor_to(&target)?;
        Ok(self.scaled_into(factor, target))
    }

    /// The same amount in SI base units.
    pub fn to_base_units(&self) -> Result<Self, QuantityError> {
        self.to(self.unit.to_base_units()?)
    }

    fn scaled_into(&self, factor: f64, unit: UnitExpression) -> Self {
        Self::from_parts(self.magnitude.map(|x| x * factor), unit)
    }

    fn require_addable(&self, other: &Self, op: &str) -> Result<(), QuantityError> {
        if self.is_compatible_with(other) {
            Ok(())
        } else {
            Err(QuantityError::OperationError(format!(
                "cannot {} {} and {}",
                op, self.unit, other.unit
            )))
        }
    }

    fn require_dimensionless(&self, op: &str) -> Result<(), QuantityError> {
        if self.is_dimensionless() {
            Ok(())
        } else {
            Err(QuantityError::OperationError(format!(
                "cannot {} a plain number and a quantity in {}",
                op, self.unit
            )))
        }
    }

    /// The sum in the unit of `self`.
    pub fn try_add(&self, other: &Self) -> Result<Self, QuantityError> {
        self.require_addable(other, "add")?;
        let other = other.to(&self.unit)?;
        Ok(Self::from_parts(
            self.magnitude.zip_with(&other.magnitude, |a, b| a + b)?,
            self.unit.clone(),
        ))
    }

    /// The difference in the unit of `self`.
    pub fn try_sub(&self, other: &Self) -> Result<Self, QuantityError> {
        self.require_addable(other, "subtract")?;
        let other = other.to(&self.unit)?;
        Ok(Self::from_parts(
            self.magnitude.zip_with(&other.magnitude, |a, b| a - b)?,
            self.unit.clone(),
        ))
    }

    /// Adds a plain number, which is only meaningful for dimensionless quantities.
    pub fn add_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        self.require_dimensionless("add")?;
        Ok(Self::from_parts(self.magnitude.map(|x| x + value), self.unit.clone()))
    }

    pub fn sub_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        self.require_dimensionless("subtract")?;
        Ok(Self::from_parts(self.magnitude.map(|x| x - value), self.unit.clone()))
    }

    /// `value - self`.
    pub fn rsub_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        self.require_dimensionless("subtract")?;
        Ok(Self::from_parts(self.magnitude.map(|x| value - x), self.unit.clone()))
    }

    /// The product. Units never need to be compatible; only array lengths must agree, and the
    /// combined powers must stay representable.
    pub fn try_mul(&self, other: &Self) -> Result<Self, QuantityError> {
        let unit = self
            .unit
            .multiply(&other.unit)
            .map_err(|e| QuantityError::OperationError(format!("cannot multiply units: {}", e)))?;
        Ok(Self::from_parts(
            self.magnitude.zip_with(&other.magnitude, |a, b| a * b)?,
            unit,
        ))
    }

    pub fn try_div(&self, other: &Self) -> Result<Self, QuantityError> {
        let unit = self
            .unit
            .divide(&other.unit)
            .map_err(|e| QuantityError::OperationError(format!("cannot divide units: {}", e)))?;
        Ok(Self::from_parts(
            self.magnitude.zip_with(&other.magnitude, |a, b| a / b)?,
            unit,
        ))
    }

    pub fn mul_scalar(&self, value: f64) -> Self {
        self.scaled_into(value, self.unit.clone())
    }

    pub fn div_scalar(&self, value: f64) -> Self {
        Self::from_parts(self.magnitude.map(|x| x / value), self.unit.clone())
    }

    /// `value / self`, in the reciprocal unit.
    pub fn rdiv_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        let unit = self
            .unit
            .reciprocal()
            .map_err(|e| QuantityError::OperationError(format!("cannot invert unit: {}", e)))?;
        Ok(Self::from_parts(self.magnitude.map(|x| value / x), unit))
    }

    /// Raises magnitude and unit to a rational power. Fails with
    /// [`QuantityError::InvalidValueError`] if a resulting power is too large to represent.
    pub fn pow(&self, exponent: impl Into<Frac>) -> Result<Self, QuantityError> {
        let exponent = exponent.into();
        let unit = self.unit.power(exponent).map_err(|e| {
            QuantityError::InvalidValueError(format!("exponent {}: {}", exponent, e))
        })?;
        Ok(Self::from_parts(self.magnitude.map(|x| pow_frac(x, exponent)), unit))
    }

    /// Raises to a power given as a float, which has to be a simple fraction like `0.5` or `1/3`.
    pub fn powf(&self, exponent: f64) -> Result<Self, QuantityError> {
        let exponent = Frac::try_from_float(exponent).map_err(|_e| {
            QuantityError::InvalidValueError(format!("exponent {} is not rational", exponent))
        })?;
        self.pow(exponent)
    }

    pub fn sqrt(&self) -> Result<Self, QuantityError> {
        self.pow(Frac::ONE_HALF)
    }

    pub fn abs(&self) -> Self {
        Self::from_parts(self.magnitude.abs(), self.unit.clone())
    }

    fn require_comparable(&self, other: &Self) -> Result<Self, QuantityError> {
        if !self.is_compatible_with(other) {
            return Err(QuantityError::ComparisonError(format!(
                "{} with {}",
                self.unit, other.unit
            )));
        }
        other.to(&self.unit)
    }

    /// Whether every element is strictly less than the corresponding element of `other`.
    pub fn try_lt(&self, other: &Self) -> Result<bool, QuantityError> {
        let other = self.require_comparable(other)?;
        self.magnitude.all_pairs(&other.magnitude, |a, b| a < b)
    }

    /// Equal or less than.
    pub fn try_le(&self, other: &Self) -> Result<bool, QuantityError> {
        Ok(self == other || self.try_lt(other)?)
    }

    /// The negation of [`Quantity::try_le`]. For arrays this is not the same as every element being
    /// greater.
    pub fn try_gt(&self, other: &Self) -> Result<bool, QuantityError> {
        Ok(!self.try_le(other)?)
    }

    /// The negation of [`Quantity::try_lt`].
    pub fn try_ge(&self, other: &Self) -> Result<bool, QuantityError> {
        Ok(!self.try_lt(other)?)
    }

    /// The number of elements; a scalar has one.
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// A single element of an array quantity.
    pub fn get(&self, index: usize) -> Result<Self, QuantityError> {
        Ok(Self::from_parts(
            Magnitude::Scalar(self.magnitude.get(index)?),
            self.unit.clone(),
        ))
    }

    /// Overwrites one element with a scalar quantity of a compatible unit.
    pub fn set(&mut self, index: usize, value: &Self) -> Result<(), QuantityError> {
        if !self.is_compatible_with(value) {
            return Err(QuantityError::OperationError(format!(
                "cannot assign {} to {}",
                value.unit, self.unit
            )));
        }
        let converted = value.to(&self.unit)?;
        let x = converted
            .value()
            .ok_or_else(|| QuantityError::ArrayError("can only assign a scalar".into()))?;
        self.magnitude.set(index, x)
    }

    /// Overwrites one element with a plain number. Only dimensionless quantities accept these.
    pub fn set_value(&mut self, index: usize, value: f64) -> Result<(), QuantityError> {
        self.require_dimensionless("assign")?;
        self.magnitude.set(index, value)
    }

    /// The elements as scalar quantities.
    pub fn iter(&self) -> impl Iterator<Item = Quantity> + '_ {
        self.magnitude
            .iter()
            .map(|x| Self::from_parts(Magnitude::Scalar(x), self.unit.clone()))
    }
}

impl PartialEq for Quantity {
    /// Approximately equal after conversion. Quantities of different dimensions are never equal.
    fn eq(&self, other: &Self) -> bool {
        if !self.is_compatible_with(other) {
            return false;
        }
        other
            .to(&self.unit)
            .map(|o| self.magnitude.all_close(&o.magnitude))
            .unwrap_or(false)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

impl Add for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn add(self, rhs: Self) -> Self::Output {
        self.try_add(rhs)
    }
}

impl Sub for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.try_sub(rhs)
    }
}

impl Mul for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn mul(self, rhs: Self) -> Self::Output {
        self.try_mul(rhs)
    }
}

impl Div for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn div(self, rhs: Self) -> Self::Output {
        self.try_div(rhs)
    }
}

impl Add<f64> for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn add(self, rhs: f64) -> Self::Output {
        self.add_scalar(rhs)
    }
}

impl Sub<f64> for &Quantity {
    type Output = Result<Quantity, QuantityError>;

    fn sub(self, rhs: f64) -> Self::Output {
        self.sub_scalar(rhs)
    }
}

impl Add<&Quantity> for f64 {
    type Output = Result<Quantity, QuantityError>;

    fn add(self, rhs: &Quantity) -> Self::Output {
        rhs.add_scalar(self)
    }
}

impl Sub<&Quantity> for f64 {
    type Output = Result<Quantity, QuantityError>;

    fn sub(self, rhs: &Quantity) -> Self::Output {
        rhs.rsub_scalar(self)
    }
}

impl Mul<f64> for &Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Div<f64> for &Quantity {
    type Output = Quantity;

    fn div(self, rhs: f64) -> Self::Output {
        self.div_scalar(rhs)
    }
}

impl Mul<&Quantity> for f64 {
    type Output = Quantity;

    fn mul(self, rhs: &Quantity) -> Self::Output {
        rhs.mul_scalar(self)
    }
}

impl Div<&Quantity> for f64 {
    type Output = Result<Quantity, QuantityError>;

    fn div(self, rhs: &Quantity) -> Self::Output {
        rhs.rdiv_scalar(self)
    }
}

impl Neg for &Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity::from_parts(self.magnitude.map(|x| -x), self.unit.clone())
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        -&self
    }
}
