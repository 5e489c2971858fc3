//! Numbers with physical units: parsing unit strings, checking dimensions, converting between
//! compatible units (including temperature scales with offset zero points), and propagating
//! measurement uncertainty through arithmetic.
//!
//! ```
//! use metron::{Quantity, UncertainQuantity};
//!
//! let speed = Quantity::new(60.0, "mile / hour").unwrap();
//! let si = speed.to("m / s").unwrap();
//! assert!((si.value().unwrap() - 26.8224).abs() < 1e-9);
//!
//! let a = UncertainQuantity::with_uncertainty(100.0, "m", 1.0).unwrap();
//! let b = UncertainQuantity::with_uncertainty(50.0, "m", 0.5).unwrap();
//! let sum = (&a + &b).unwrap();
//! assert_eq!(sum.value(), Some(150.0));
//! ```

pub mod dimension;
pub mod error;
pub mod fract;
pub mod magnitude;
pub mod parsing;
pub mod quantity;
pub mod table;
pub mod uncertainty;
pub mod unit;
pub mod validator;

pub use dimension::{BaseDimension, DimensionVector};
pub use error::QuantityError;
pub use fract::Frac;
pub use magnitude::Magnitude;
pub use quantity::Quantity;
pub use uncertainty::UncertainQuantity;
pub use unit::{UnitArg, UnitExpression};
pub use validator::{suggest_unit, validate_unit, UnitValidator};
