//! A rational data type, used for the exponents of units and dimensions. Exponents have to stay
//! exact under repeated multiplication and division: `meter^0.5` squared must be exactly `meter`,
//! not `meter^1.0000000000000002`.

use num_traits::{Float, One, Zero};
use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};
use thiserror::Error;

/// The base type used. Unit exponents are tiny, but intermediate products can get large before
/// they're reduced, so those are computed with `i128`.
pub type BaseInt = i64;

/// The largest denominator tried when reading a float as a [`Frac`].
pub const MAX_FLOAT_DENOM: BaseInt = 100_000;

// This only has to absorb the rounding in computing e.g. 1.0 / 3.0. It has to stay well below the
// error of the best approximation to an irrational with denominator MAX_FLOAT_DENOM, or sqrt(2)
// would be accepted as a unit power.
/// The tolerance used to convert floats to `Frac`s.
pub const FLOAT_PARSE_TOLERANCE: f64 = 1e-12;

/// A fraction in lowest terms with a positive denominator. Because the representation is
/// canonical, the derived `Eq` and `Hash` are exact rational equality.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct Frac {
    /// The numerator. Carries the sign.
    numerator: BaseInt,
    /// The denominator. Always positive.
    denominator: BaseInt,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FracError {
    #[error(
        "Could not convert {0} to a fraction with denominator at most {}: outside of tolerance {}",
        MAX_FLOAT_DENOM,
        FLOAT_PARSE_TOLERANCE
    )]
    FloatParseError(f64),
    #[error("Could not parse {0}")]
    StringParseError(String),
    #[error("Fraction has a zero denominator")]
    ZeroDenominator,
    #[error("Cannot represent {0} with {}-bit integers", BaseInt::BITS)]
    Overflow(String),
}

impl Frac {
    pub const ZERO: Frac = Frac::new_int(0);

    pub const ONE: Frac = Frac::new_int(1);

    pub const NEG_ONE: Frac = Frac::new_int(-1);

    pub const ONE_HALF: Frac = Frac {
        numerator: 1,
        denominator: 2,
    };

    /// Creates a new `Frac` representing an integer.
    pub const fn new_int(n: BaseInt) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }

    /// Creates a new `Frac` from a numerator and denominator, reducing to lowest terms.
    pub fn new(numerator: BaseInt, denominator: BaseInt) -> Result<Self, FracError> {
        if denominator == 0 {
            Err(FracError::ZeroDenominator)
        } else {
            Self::try_reduce(numerator as i128, denominator as i128)
        }
    }

    /// Creates a new `Frac`, panicking on a zero denominator. Meant for literals: see [`frac!`].
    pub fn new_ratio(numerator: BaseInt, denominator: BaseInt) -> Self {
        assert!(
            denominator != 0,
            "Invalid fraction: {}/{} has a zero denominator",
            numerator,
            denominator
        );
        Self::reduce(numerator as i128, denominator as i128)
    }

    /// Puts an arbitrary fraction into canonical form, failing if it does not fit. `BaseInt::MIN`
    /// is rejected as a numerator, so that checked fractions can always be negated.
    fn try_reduce(numerator: i128, denominator: i128) -> Result<Self, FracError> {
        let overflow = || FracError::Overflow(format!("{}/{}", numerator, denominator));
        let g = Self::gcd(numerator, denominator);
        let (mut n, mut d) = (numerator / g, denominator / g);
        if d < 0 {
            n = n.checked_neg().ok_or_else(overflow)?;
            d = d.checked_neg().ok_or_else(overflow)?;
        }
        if n == BaseInt::MIN as i128 {
            return Err(overflow());
        }
        Ok(Self {
            numerator: BaseInt::try_from(n).map_err(|_e| overflow())?,
            denominator: BaseInt::try_from(d).map_err(|_e| overflow())?,
        })
    }

    /// Like [`Frac::try_reduce`], but panics on overflow. Used by the operator impls, which
    /// overflow the way integer arithmetic does.
    fn reduce(numerator: i128, denominator: i128) -> Self {
        match Self::try_reduce(numerator, denominator) {
            Ok(f) => f,
            Err(e) => panic!("{}", e),
        }
    }

    /// `self + rhs`, or [`FracError::Overflow`] if the result does not fit.
    pub fn checked_add(self, rhs: Self) -> Result<Self, FracError> {
        let lhs = self.numerator as i128 * rhs.denominator as i128;
        let rhs_n = rhs.numerator as i128 * self.denominator as i128;
        let n = lhs
            .checked_add(rhs_n)
            .ok_or_else(|| FracError::Overflow(format!("{} + {}", self, rhs)))?;
        Self::try_reduce(n, self.denominator as i128 * rhs.denominator as i128)
    }

    /// `self - rhs`, or [`FracError::Overflow`] if the result does not fit.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, FracError> {
        self.checked_add(rhs.checked_neg()?)
    }

    /// `self * rhs`, or [`FracError::Overflow`] if the result does not fit.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, FracError> {
        Self::try_reduce(
            self.numerator as i128 * rhs.numerator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }

    /// `-self`. Fails only for a numerator of `BaseInt::MIN`.
    pub fn checked_neg(self) -> Result<Self, FracError> {
        Self::try_reduce(-(self.numerator as i128), self.denominator as i128)
    }

    /// The greatest common divisor, always nonnegative. `gcd(0, 0)` is 1 so that it can always be
    /// divided by.
    pub const fn gcd(p: i128, q: i128) -> i128 {
        let mut p = p.abs();
        let mut q = q.abs();
        while q != 0 {
            let r = p % q;
            p = q;
            q = r;
        }

        if p == 0 {
            1
        } else {
            p
        }
    }

    /// The numerator, carrying the sign.
    pub const fn numerator(&self) -> BaseInt {
        self.numerator
    }

    /// The denominator, always positive.
    pub const fn denominator(&self) -> BaseInt {
        self.denominator
    }

    pub const fn is_integer(&self) -> bool {
        self.denominator == 1
    }

    /// Returns the value as an integer, if it is one.
    pub const fn to_integer(&self) -> Option<BaseInt> {
        if self.is_integer() {
            Some(self.numerator)
        } else {
            None
        }
    }

    pub const fn is_negative(&self) -> bool {
        self.numerator < 0
    }

    pub const fn is_positive(&self) -> bool {
        self.numerator > 0
    }

    pub const fn abs(&self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    /// Attempts to read a float as a [`Frac`], using the continued fraction expansion. Errors if
    /// no fraction with denominator at most [`MAX_FLOAT_DENOM`] is within
    /// [`FLOAT_PARSE_TOLERANCE`] of the input.
    pub fn try_from_float<T: Float>(x: T) -> Result<Self, FracError> {
        let x = x.to_f64().ok_or(FracError::FloatParseError(f64::NAN))?;
        if !x.is_finite() || x.abs() > 1e12 {
            return Err(FracError::FloatParseError(x));
        }

        // convergents h/k of the continued fraction
        let (mut h0, mut h1): (i128, i128) = (0, 1);
        let (mut k0, mut k1): (i128, i128) = (1, 0);
        let mut r = x;
        for _ in 0..64 {
            let a = r.floor();
            let a_int = a as i128;
            let (h2, k2) = (a_int * h1 + h0, a_int * k1 + k0);
            if k2 > MAX_FLOAT_DENOM as i128 {
                break;
            }
            (h0, h1) = (h1, h2);
            (k0, k1) = (k1, k2);

            if (x - h1 as f64 / k1 as f64).abs() <= FLOAT_PARSE_TOLERANCE * x.abs().max(1.0) {
                return Self::try_reduce(h1, k1);
            }

            let rem = r - a;
            if rem == 0.0 {
                break;
            }
            r = rem.recip();
        }

        Err(FracError::FloatParseError(x))
    }

    /// Parses an exact decimal like `-2.25` into a `Frac`. No exponent notation.
    fn parse_decimal(s: &str) -> Result<Self, FracError> {
        let err = || FracError::StringParseError(s.to_owned());
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = digits.split_once('.').ok_or_else(err)?;
        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty()
            || frac_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(err());
        }
        // 10^18 still fits in i64
        if frac_part.len() > 18 || int_part.len() + frac_part.len() > 36 {
            return Err(err());
        }

        let numerator: i128 = format!("{int_part}{frac_part}").parse().map_err(|_e| err())?;
        let denominator = 10i128.pow(frac_part.len() as u32);
        Self::try_reduce(sign * numerator, denominator)
    }
}

impl Default for Frac {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Frac> for f64 {
    fn from(value: Frac) -> Self {
        (value.numerator as f64) / (value.denominator as f64)
    }
}

macro_rules! frac_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Frac {
                fn from(x: $t) -> Self {
                    Self::new_int(x as BaseInt)
                }
            }
        )*
    };
}

frac_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl FromStr for Frac {
    type Err = FracError;

    /// Accepts integers (`-2`), exact decimals (`1.5`), and ratios (`1/3`), optionally wrapped in
    /// parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(s)
            .trim();
        let err = || FracError::StringParseError(s.to_owned());

        if let Some((n, d)) = s.split_once('/') {
            let n = BaseInt::from_str(n.trim()).map_err(|_e| err())?;
            let d = BaseInt::from_str(d.trim()).map_err(|_e| err())?;
            Self::new(n, d)
        } else if s.contains('.') {
            Self::parse_decimal(s)
        } else {
            let n = BaseInt::from_str(s).map_err(|_e| err())?;
            Self::new(n, 1)
        }
    }
}

impl Add for Frac {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::reduce(
            self.numerator as i128 * rhs.denominator as i128
                + rhs.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }
}

impl AddAssign for Frac {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Frac {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl SubAssign for Frac {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Frac {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::reduce(
            self.numerator as i128 * rhs.numerator as i128,
            self.denominator as i128 * rhs.denominator as i128,
        )
    }
}

impl Div for Frac {
    type Output = Self;

    /// Note: this panics when dividing by zero, like integer division.
    fn div(self, rhs: Self) -> Self::Output {
        assert!(!rhs.is_zero(), "Cannot divide {} by zero", self);
        Self::reduce(
            self.numerator as i128 * rhs.denominator as i128,
            self.denominator as i128 * rhs.numerator as i128,
        )
    }
}

impl Neg for Frac {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::reduce(-(self.numerator as i128), self.denominator as i128)
    }
}

impl Ord for Frac {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.numerator as i128 * other.denominator as i128)
            .cmp(&(other.numerator as i128 * self.denominator as i128))
    }
}

impl PartialOrd for Frac {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Zero for Frac {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl One for Frac {
    fn one() -> Self {
        Self::ONE
    }

    fn is_one(&self) -> bool {
        *self == Self::ONE
    }
}

impl std::fmt::Debug for Frac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frac!({}/{})", self.numerator, self.denominator)
    }
}

impl Display for Frac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[macro_export]
macro_rules! frac {
    ($num:literal / $denom:literal) => {
        $crate::fract::Frac::new_ratio($num, $denom)
    };
    ($num:expr) => {
        $crate::fract::Frac::new_int(($num) as $crate::fract::BaseInt)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frac;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_macro() {
        assert_eq!(Frac::new(1, 6).unwrap(), frac!(1 / 6));
        assert_eq!(Frac::new_int(2), frac!(2));
        assert_eq!(Frac::new(-1, 2).unwrap(), frac!(-1 / 2));
        assert_eq!(Frac::new(2, 4).unwrap(), Frac::ONE_HALF);
        assert_eq!(frac!(4 / -8), frac!(-1 / 2));
    }

    #[test]
    fn test_gcd() {
        assert_eq!(Frac::gcd(4, 24), 4);
        assert_eq!(Frac::gcd(25, 4), 1);
        assert_eq!(Frac::gcd(-25, 10), 5);
        assert_eq!(Frac::gcd(64, 8), 8);
        assert_eq!(Frac::gcd(0, 0), 1);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(frac!(1 / 2) + frac!(1 / 3), frac!(5 / 6));
        assert_eq!(frac!(1 / 2) - frac!(1 / 2), Frac::ZERO);
        assert_eq!(frac!(2 / 3) * frac!(3 / 4), frac!(1 / 2));
        assert_eq!(frac!(1 / 2) / frac!(1 / 4), frac!(2));
        assert_eq!(-frac!(1 / 3), frac!(-1 / 3));
        assert!(frac!(1 / 3) < frac!(1 / 2));
        assert!(frac!(-1 / 2) < Frac::ZERO);
    }

    #[test]
    fn test_repeated_ops_stay_exact() {
        let mut x = Frac::ZERO;
        for _ in 0..10 {
            x += frac!(1 / 10);
        }
        assert_eq!(x, Frac::ONE);
        assert!((frac!(1 / 2) * frac!(2)).is_one());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Frac::from_str("1/2").unwrap(), Frac::ONE_HALF);
        assert_eq!(Frac::from_str("-5/8").unwrap(), frac!(-5 / 8));
        assert_eq!(Frac::from_str("4").unwrap(), frac!(4));
        assert_eq!(Frac::from_str("+4").unwrap(), frac!(4));
        assert_eq!(Frac::from_str("0.25").unwrap(), frac!(1 / 4));
        assert_eq!(Frac::from_str("-2.5").unwrap(), frac!(-5 / 2));
        assert_eq!(Frac::from_str("(1/3)").unwrap(), frac!(1 / 3));
        assert_eq!(Frac::from_str("( -1 / 3 )").unwrap(), frac!(-1 / 3));
        assert!(Frac::from_str("1/0").is_err());
        assert!(Frac::from_str("abc").is_err());
        assert!(Frac::from_str("1.").is_err());
        assert!(Frac::from_str("1e3").is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Frac::new_int(BaseInt::MAX);
        let min = Frac::new_int(BaseInt::MIN);
        assert_eq!(frac!(1 / 2).checked_add(frac!(1 / 3)), Ok(frac!(5 / 6)));
        assert_eq!(frac!(1 / 2).checked_sub(frac!(1 / 2)), Ok(Frac::ZERO));
        assert_eq!(frac!(2 / 3).checked_mul(frac!(3 / 4)), Ok(frac!(1 / 2)));
        assert_eq!(max.checked_neg(), Ok(Frac::new_int(-BaseInt::MAX)));

        assert!(matches!(max.checked_add(Frac::ONE), Err(FracError::Overflow(_))));
        assert!(matches!(min.checked_sub(Frac::ONE), Err(FracError::Overflow(_))));
        assert!(matches!(max.checked_mul(frac!(2)), Err(FracError::Overflow(_))));
        assert!(matches!(min.checked_neg(), Err(FracError::Overflow(_))));
        assert!(matches!(min.checked_mul(min), Err(FracError::Overflow(_))));

        let tiny = Frac::from_str("0.000000000000000001").unwrap();
        assert!(matches!(tiny.checked_add(frac!(1 / 11)), Err(FracError::Overflow(_))));
        assert!(Frac::new(BaseInt::MIN, -1).is_err());
        assert!(Frac::from_str("-9223372036854775808").is_err());
        assert_eq!(
            Frac::from_str("-9223372036854775807"),
            Ok(Frac::new_int(-BaseInt::MAX))
        );
    }

    #[test]
    fn test_from_float() {
        assert_eq!(Frac::try_from_float(0.5).unwrap(), Frac::ONE_HALF);
        assert_eq!(Frac::try_from_float(-3.0).unwrap(), frac!(-3));
        assert_eq!(Frac::try_from_float(1.0 / 3.0).unwrap(), frac!(1 / 3));
        assert_eq!(Frac::try_from_float(-0.75).unwrap(), frac!(-3 / 4));
        assert_eq!(Frac::try_from_float(0.0).unwrap(), Frac::ZERO);
        assert!(Frac::try_from_float(std::f64::consts::PI).is_err());
        assert!(Frac::try_from_float(f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", frac!(3)), "3");
        assert_eq!(format!("{}", frac!(-1 / 3)), "-1/3");
        assert_eq!(format!("{:?}", frac!(1 / 2)), "frac!(1/2)");
        assert_eq!(f64::from(frac!(-3 / 4)), -0.75);
    }
}
