//! Quantities with a standard uncertainty, propagated through arithmetic assuming independent
//! errors.

use std::{
    fmt::Display,
    ops::{Add, Div, Mul, Neg, Sub},
};

use crate::{
    error::QuantityError,
    fract::Frac,
    magnitude::Magnitude,
    quantity::Quantity,
    unit::{UnitArg, UnitExpression},
};

/// A [`Quantity`] with a non-negative uncertainty of the same shape, in the same unit.
#[derive(Debug, Clone)]
pub struct UncertainQuantity {
    quantity: Quantity,
    uncertainty: Magnitude,
}

fn hypot_mag(a: &Magnitude, b: &Magnitude) -> Result<Magnitude, QuantityError> {
    a.zip_with(b, |x, y| (x * x + y * y).sqrt())
}

impl UncertainQuantity {
    /// Creates a measurement. The uncertainty is `uncertainty` if given, otherwise
    /// `|value| * relative_uncertainty`, otherwise zero.
    pub fn new(
        value: impl Into<Magnitude>,
        unit: impl Into<UnitArg>,
        uncertainty: Option<Magnitude>,
        relative_uncertainty: Option<f64>,
    ) -> Result<Self, QuantityError> {
        let quantity = Quantity::new(value, unit)?;
        let uncertainty = match (uncertainty, relative_uncertainty) {
            (Some(u), _) => u,
            (None, Some(r)) => quantity.magnitude().map(|v| v.abs() * r),
            (None, None) => quantity.magnitude().zeros_like(),
        };
        Self::from_quantity(quantity, uncertainty)
    }

    /// A measurement with an absolute uncertainty.
    pub fn with_uncertainty(
        value: impl Into<Magnitude>,
        unit: impl Into<UnitArg>,
        uncertainty: impl Into<Magnitude>,
    ) -> Result<Self, QuantityError> {
        Self::new(value, unit, Some(uncertainty.into()), None)
    }

    /// A measurement with an uncertainty given as a fraction of its value.
    pub fn with_relative_uncertainty(
        value: impl Into<Magnitude>,
        unit: impl Into<UnitArg>,
        relative_uncertainty: f64,
    ) -> Result<Self, QuantityError> {
        Self::new(value, unit, None, Some(relative_uncertainty))
    }

    /// Attaches an uncertainty to a quantity. A scalar uncertainty is repeated across an array
    /// quantity; otherwise the shapes must match.
    pub fn from_quantity(
        quantity: Quantity,
        uncertainty: impl Into<Magnitude>,
    ) -> Result<Self, QuantityError> {
        let uncertainty = uncertainty.into();
        let uncertainty = match (quantity.magnitude(), &uncertainty) {
            (Magnitude::Scalar(_), Magnitude::Array(_)) => {
                return Err(QuantityError::ArrayError(
                    "a scalar value needs a scalar uncertainty".into(),
                ))
            }
            (value, _) => uncertainty.broadcast_like(value)?,
        };
        if let Some(bad) = uncertainty.iter().find(|s| s.is_nan() || *s < 0.0) {
            return Err(QuantityError::InvalidValueError(format!(
                "uncertainty must be non-negative, got {}",
                bad
            )));
        }
        Ok(Self {
            quantity,
            uncertainty,
        })
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn magnitude(&self) -> &Magnitude {
        self.quantity.magnitude()
    }

    pub fn value(&self) -> Option<f64> {
        self.quantity.value()
    }

    pub fn unit(&self) -> &UnitExpression {
        self.quantity.unit()
    }

    /// The absolute uncertainty, in [`UncertainQuantity::unit`].
    pub fn uncertainty(&self) -> &Magnitude {
        &self.uncertainty
    }

    /// Same as [`UncertainQuantity::uncertainty`].
    pub fn std_dev(&self) -> &Magnitude {
        &self.uncertainty
    }

    /// `uncertainty / |value|`, taken as zero wherever that is not finite (e.g. a value of zero).
    pub fn relative_uncertainty(&self) -> Magnitude {
        self.uncertainty
            .zip_with(self.magnitude(), |s, v| {
                let r = s / v.abs();
                if r.is_finite() {
                    r
                } else {
                    0.0
                }
            })
            // the shapes always match
            .unwrap_or_else(|_e| self.uncertainty.zeros_like())
    }

    /// Converts value and uncertainty. The uncertainty only ever gets the linear factor, never a
    /// temperature offset: 20 ± 0.5 °C is 293.15 ± 0.5 K.
    pub fn to(&self, target: impl Into<UnitArg>) -> Result<Self, QuantityError> {
        let converted = self.quantity.to(target)?;
        let factor = self.unit().conversion_factor_to(converted.unit())?.abs();
        let uncertainty = self.uncertainty.map(|s| s * factor);
        Self::from_quantity(converted, uncertainty)
    }

    /// The sum, with uncertainties added in quadrature.
    pub fn try_add(&self, other: &Self) -> Result<Self, QuantityError> {
        let result = self.quantity.try_add(&other.quantity)?;
        let other = other.to(self.unit())?;
        Self::from_quantity(result, hypot_mag(&self.uncertainty, &other.uncertainty)?)
    }

    /// The difference, with uncertainties added in quadrature.
    pub fn try_sub(&self, other: &Self) -> Result<Self, QuantityError> {
        let result = self.quantity.try_sub(&other.quantity)?;
        let other = other.to(self.unit())?;
        Self::from_quantity(result, hypot_mag(&self.uncertainty, &other.uncertainty)?)
    }

    /// Adds an exact quantity: the uncertainty is unchanged.
    pub fn add_quantity(&self, other: &Quantity) -> Result<Self, QuantityError> {
        Self::from_quantity(self.quantity.try_add(other)?, self.uncertainty.clone())
    }

    pub fn sub_quantity(&self, other: &Quantity) -> Result<Self, QuantityError> {
        Self::from_quantity(self.quantity.try_sub(other)?, self.uncertainty.clone())
    }

    pub fn add_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        Self::from_quantity(self.quantity.add_scalar(value)?, self.uncertainty.clone())
    }

    pub fn sub_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        Self::from_quantity(self.quantity.sub_scalar(value)?, self.uncertainty.clone())
    }

    /// `value - self`.
    pub fn rsub_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        Self::from_quantity(self.quantity.rsub_scalar(value)?, self.uncertainty.clone())
    }

    /// Relative uncertainties of a product or quotient add in quadrature.
    fn combine_relative(&self, other: &Self, result: Quantity) -> Result<Self, QuantityError> {
        let relative = hypot_mag(&self.relative_uncertainty(), &other.relative_uncertainty())?;
        let uncertainty = result.magnitude().abs().zip_with(&relative, |v, r| v * r)?;
        Self::from_quantity(result, uncertainty)
    }

    pub fn try_mul(&self, other: &Self) -> Result<Self, QuantityError> {
        let result = self.quantity.try_mul(&other.quantity)?;
        self.combine_relative(other, result)
    }

    pub fn try_div(&self, other: &Self) -> Result<Self, QuantityError> {
        let result = self.quantity.try_div(&other.quantity)?;
        self.combine_relative(other, result)
    }

    /// Multiplies by an exact quantity, scaling the uncertainty by its magnitude.
    pub fn mul_quantity(&self, other: &Quantity) -> Result<Self, QuantityError> {
        let uncertainty = self
            .uncertainty
            .zip_with(other.magnitude(), |s, v| s * v.abs())?;
        Self::from_quantity(self.quantity.try_mul(other)?, uncertainty)
    }

    pub fn div_quantity(&self, other: &Quantity) -> Result<Self, QuantityError> {
        let uncertainty = self
            .uncertainty
            .zip_with(other.magnitude(), |s, v| s / v.abs())?;
        Self::from_quantity(self.quantity.try_div(other)?, uncertainty)
    }

    pub fn mul_scalar(&self, value: f64) -> Self {
        Self {
            quantity: self.quantity.mul_scalar(value),
            uncertainty: self.uncertainty.map(|s| s * value.abs()),
        }
    }

    pub fn div_scalar(&self, value: f64) -> Self {
        Self {
            quantity: self.quantity.div_scalar(value),
            uncertainty: self.uncertainty.map(|s| s / value.abs()),
        }
    }

    /// `value / self`. The relative uncertainty carries over unchanged.
    pub fn rdiv_scalar(&self, value: f64) -> Result<Self, QuantityError> {
        let result = self.quantity.rdiv_scalar(value)?;
        let uncertainty = result
            .magnitude()
            .abs()
            .zip_with(&self.relative_uncertainty(), |v, r| v * r)?;
        Self::from_quantity(result, uncertainty)
    }

    /// Raises to a rational power: the relative uncertainty is multiplied by `|exponent|`.
    pub fn pow(&self, exponent: impl Into<Frac>) -> Result<Self, QuantityError> {
        let exponent = exponent.into();
        let factor = f64::from(exponent).abs();
        let result = self.quantity.pow(exponent)?;
        let uncertainty = result
            .magnitude()
            .abs()
            .zip_with(&self.relative_uncertainty(), |v, r| factor * r * v)?;
        Self::from_quantity(result, uncertainty)
    }

    /// Raises to a power given as a float, which has to be a simple fraction.
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
        Self {
            quantity: self.quantity.abs(),
            uncertainty: self.uncertainty.clone(),
        }
    }
}

impl From<Quantity> for UncertainQuantity {
    /// An exact measurement.
    fn from(quantity: Quantity) -> Self {
        let uncertainty = quantity.magnitude().zeros_like();
        Self {
            quantity,
            uncertainty,
        }
    }
}

impl From<UncertainQuantity> for Quantity {
    /// Drops the uncertainty.
    fn from(value: UncertainQuantity) -> Self {
        value.quantity
    }
}

impl Display for UncertainQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ± {} {}",
            self.quantity.magnitude(),
            self.uncertainty,
            self.quantity.unit()
        )
    }
}

impl Add for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn add(self, rhs: Self) -> Self::Output {
        self.try_add(rhs)
    }
}

impl Sub for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.try_sub(rhs)
    }
}

impl Mul for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn mul(self, rhs: Self) -> Self::Output {
        self.try_mul(rhs)
    }
}

impl Div for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn div(self, rhs: Self) -> Self::Output {
        self.try_div(rhs)
    }
}

impl Add<&Quantity> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn add(self, rhs: &Quantity) -> Self::Output {
        self.add_quantity(rhs)
    }
}

impl Sub<&Quantity> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn sub(self, rhs: &Quantity) -> Self::Output {
        self.sub_quantity(rhs)
    }
}

impl Mul<&Quantity> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn mul(self, rhs: &Quantity) -> Self::Output {
        self.mul_quantity(rhs)
    }
}

impl Div<&Quantity> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn div(self, rhs: &Quantity) -> Self::Output {
        self.div_quantity(rhs)
    }
}

impl Mul<f64> for &UncertainQuantity {
    type Output = UncertainQuantity;

    fn mul(self, rhs: f64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Div<f64> for &UncertainQuantity {
    type Output = UncertainQuantity;

    fn div(self, rhs: f64) -> Self::Output {
        self.div_scalar(rhs)
    }
}

impl Mul<&UncertainQuantity> for f64 {
    type Output = UncertainQuantity;

    fn mul(self, rhs: &UncertainQuantity) -> Self::Output {
        rhs.mul_scalar(self)
    }
}

impl Div<&UncertainQuantity> for f64 {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn div(self, rhs: &UncertainQuantity) -> Self::Output {
        rhs.rdiv_scalar(self)
    }
}

impl Add<f64> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn add(self, rhs: f64) -> Self::Output {
        self.add_scalar(rhs)
    }
}

impl Sub<f64> for &UncertainQuantity {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn sub(self, rhs: f64) -> Self::Output {
        self.sub_scalar(rhs)
    }
}

impl Add<&UncertainQuantity> for f64 {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn add(self, rhs: &UncertainQuantity) -> Self::Output {
        rhs.add_scalar(self)
    }
}

impl Sub<&UncertainQuantity> for f64 {
    type Output = Result<UncertainQuantity, QuantityError>;

    fn sub(self, rhs: &UncertainQuantity) -> Self::Output {
        rhs.rsub_scalar(self)
    }
}

impl Neg for &UncertainQuantity {
    type Output = UncertainQuantity;

    fn neg(self) -> Self::Output {
        UncertainQuantity {
            quantity: -&self.quantity,
            uncertainty: self.uncertainty.clone(),
        }
    }
}
