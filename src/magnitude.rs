//! The numeric part of a quantity: a single number or a one-dimensional array of them. Binary
//! operations broadcast a scalar against an array and otherwise need equal lengths.

use std::fmt::Display;

use approx::{AbsDiffEq, RelativeEq};
use nalgebra::DVector;

use crate::error::QuantityError;

/// Relative tolerance of [`Magnitude::all_close`].
pub const RELATIVE_TOLERANCE: f64 = 1e-5;
/// Absolute tolerance of [`Magnitude::all_close`].
pub const ABSOLUTE_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub enum Magnitude {
    Scalar(f64),
    Array(DVector<f64>),
}

impl Magnitude {
    /// Applies `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Magnitude::Scalar(x) => Magnitude::Scalar(f(*x)),
            Magnitude::Array(v) => Magnitude::Array(v.map(f)),
        }
    }

    /// Combines two magnitudes elementwise, broadcasting scalars.
    pub fn zip_with(
        &self,
        other: &Self,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, QuantityError> {
        match (self, other) {
            (Magnitude::Scalar(a), Magnitude::Scalar(b)) => Ok(Magnitude::Scalar(f(*a, *b))),
            (Magnitude::Scalar(a), Magnitude::Array(b)) => {
                Ok(Magnitude::Array(b.map(|y| f(*a, y))))
            }
            (Magnitude::Array(a), Magnitude::Scalar(b)) => {
                Ok(Magnitude::Array(a.map(|x| f(x, *b))))
            }
            (Magnitude::Array(a), Magnitude::Array(b)) => {
                if a.len() != b.len() {
                    return Err(QuantityError::ArrayError(format!(
                        "length mismatch: {} and {}",
                        a.len(),
                        b.len()
                    )));
                }
                Ok(Magnitude::Array(a.zip_map(b, f)))
            }
        }
    }

    /// Whether `pred` holds for every pair of elements, broadcasting scalars.
    pub fn all_pairs(
        &self,
        other: &Self,
        pred: impl Fn(f64, f64) -> bool,
    ) -> Result<bool, QuantityError> {
        let flags = self.zip_with(other, |a, b| if pred(a, b) { 1.0 } else { 0.0 })?;
        let all = flags.iter().all(|x| x == 1.0);
        Ok(all)
    }

    /// Elementwise `|a - b| <= atol + rtol * |b|`. Mismatched lengths are never close.
    pub fn all_close(&self, other: &Self) -> bool {
        self.all_pairs(other, |a, b| {
            a == b || (a - b).abs() <= ABSOLUTE_TOLERANCE + RELATIVE_TOLERANCE * b.abs()
        })
        .unwrap_or(false)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    /// The elements as a slice; a scalar is a slice of one.
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Magnitude::Scalar(x) => std::slice::from_ref(x),
            Magnitude::Array(v) => v.as_slice(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    /// The number of elements. A scalar has one.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Magnitude::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Magnitude::Scalar(x) => Some(*x),
            Magnitude::Array(_) => None,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), QuantityError> {
        match self {
            Magnitude::Scalar(_) => Err(QuantityError::ArrayError(
                "cannot index a scalar magnitude".into(),
            )),
            Magnitude::Array(v) if index >= v.len() => Err(QuantityError::ArrayError(format!(
                "index {} out of range for length {}",
                index,
                v.len()
            ))),
            Magnitude::Array(_) => Ok(()),
        }
    }

    /// The element at `index` of an array.
    pub fn get(&self, index: usize) -> Result<f64, QuantityError> {
        self.check_index(index)?;
        Ok(self.as_slice()[index])
    }

    /// Overwrites the element at `index` of an array.
    pub fn set(&mut self, index: usize, value: f64) -> Result<(), QuantityError> {
        self.check_index(index)?;
        if let Magnitude::Array(v) = self {
            v[index] = value;
        }
        Ok(())
    }

    /// This magnitude repeated to the shape of `other`: a scalar against an array becomes an array
    /// of copies. Arrays must already match.
    pub fn broadcast_like(&self, other: &Self) -> Result<Self, QuantityError> {
        self.zip_with(other, |a, _b| a)
    }

    /// Zeros in the shape of `self`.
    pub fn zeros_like(&self) -> Self {
        self.map(|_x| 0.0)
    }
}

impl Default for Magnitude {
    fn default() -> Self {
        Magnitude::Scalar(0.0)
    }
}

impl From<f64> for Magnitude {
    fn from(value: f64) -> Self {
        Magnitude::Scalar(value)
    }
}

impl From<Vec<f64>> for Magnitude {
    fn from(value: Vec<f64>) -> Self {
        Magnitude::Array(DVector::from_vec(value))
    }
}

impl From<&[f64]> for Magnitude {
    fn from(value: &[f64]) -> Self {
        Magnitude::Array(DVector::from_vec(value.to_vec()))
    }
}

impl<const N: usize> From<[f64; N]> for Magnitude {
    fn from(value: [f64; N]) -> Self {
        Magnitude::Array(DVector::from_vec(value.to_vec()))
    }
}

impl From<DVector<f64>> for Magnitude {
    fn from(value: DVector<f64>) -> Self {
        Magnitude::Array(value)
    }
}

impl Display for Magnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Magnitude::Scalar(x) => write!(f, "{}", x),
            Magnitude::Array(v) => {
                let items: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl AbsDiffEq for Magnitude {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        match (self, other) {
            (Magnitude::Scalar(a), Magnitude::Scalar(b)) => a.abs_diff_eq(b, epsilon),
            (Magnitude::Array(a), Magnitude::Array(b)) => {
                a.len() == b.len() && a.abs_diff_eq(b, epsilon)
            }
            _ => false,
        }
    }
}

impl RelativeEq for Magnitude {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        match (self, other) {
            (Magnitude::Scalar(a), Magnitude::Scalar(b)) => a.relative_eq(b, epsilon, max_relative),
            (Magnitude::Array(a), Magnitude::Array(b)) => {
                a.len() == b.len() && a.relative_eq(b, epsilon, max_relative)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_broadcast() {
        let a = Magnitude::from(vec![1.0, 2.0, 3.0]);
        let s = Magnitude::from(2.0);
        assert_eq!(
            a.zip_with(&s, |x, y| x * y).unwrap(),
            Magnitude::from(vec![2.0, 4.0, 6.0])
        );
        assert_eq!(
            s.zip_with(&a, |x, y| x - y).unwrap(),
            Magnitude::from(vec![1.0, 0.0, -1.0])
        );
        assert_eq!(s.zip_with(&s, |x, y| x + y).unwrap(), Magnitude::Scalar(4.0));
        assert!(matches!(
            a.zip_with(&Magnitude::from([1.0, 2.0]), |x, y| x + y),
            Err(QuantityError::ArrayError(_))
        ));
        assert_eq!(s.broadcast_like(&a).unwrap(), Magnitude::from([2.0, 2.0, 2.0]));
    }

    #[test]
    fn test_all_close() {
        assert!(Magnitude::from(1.0).all_close(&Magnitude::from(1.0 + 1e-7)));
        assert!(!Magnitude::from(1.0).all_close(&Magnitude::from(1.001)));
        assert!(Magnitude::from(0.0).all_close(&Magnitude::from(1e-9)));
        assert!(Magnitude::from([1.0, 2.0]).all_close(&Magnitude::from([1.0, 2.0])));
        assert!(!Magnitude::from([1.0, 2.0]).all_close(&Magnitude::from([1.0, 2.0, 3.0])));
        assert!(Magnitude::from([3.0, 3.0]).all_close(&Magnitude::from(3.0)));
    }

    #[test]
    fn test_indexing() {
        let mut a = Magnitude::from([1.0, 2.0, 3.0]);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get(1), Ok(2.0));
        a.set(1, 5.0).unwrap();
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1.0, 5.0, 3.0]);
        assert!(a.get(3).is_err());

        let mut s = Magnitude::from(1.0);
        assert_eq!(s.len(), 1);
        assert!(s.get(0).is_err());
        assert!(s.set(0, 2.0).is_err());
        assert_eq!(s.as_scalar(), Some(1.0));
    }

    #[test]
    fn test_display_and_approx() {
        assert_eq!(Magnitude::from(2.5).to_string(), "2.5");
        assert_eq!(Magnitude::from([1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_relative_eq!(
            Magnitude::from([0.1 + 0.2, 1.0]),
            Magnitude::from([0.3, 1.0])
        );
    }
}
