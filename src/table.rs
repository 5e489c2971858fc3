//! The static conversion table: every atomic unit name and alias, its linear factor relative to the
//! SI unit of its family, and for temperature scales the offset of their zero point. The table
//! itself is generated at build time from `data/units.csv` and `data/families.csv`.

use tracing::trace;

use crate::{
    dimension::{BaseDimension, DimensionVector},
    error::QuantityError,
    fract::Frac,
    unit::{merge, UnitExpression},
};

/// Conversion data for one atomic unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    /// Multiply by this to get the family's SI unit.
    pub factor: f64,
    /// Added before scaling, for temperature scales whose zero is not absolute zero.
    pub offset: Option<f64>,
    /// The base unit this is a multiple of: `foot` has family `meter`.
    pub family: &'static str,
    /// Whether SI prefixes can be attached.
    pub prefixable: bool,
}

include!(concat!(env!("OUT_DIR"), "/unit_table.rs"));

/// The family whose temperatures go through the affine conversion path.
pub const TEMPERATURE_FAMILY: &str = "kelvin";

/// SI prefixes by full name.
pub const PREFIX_NAMES: [(&str, f64); 20] = [
    ("yotta", 1e24),
    ("zetta", 1e21),
    ("exa", 1e18),
    ("peta", 1e15),
    ("tera", 1e12),
    ("giga", 1e9),
    ("mega", 1e6),
    ("kilo", 1e3),
    ("hecto", 1e2),
    ("deca", 1e1),
    ("deci", 1e-1),
    ("centi", 1e-2),
    ("milli", 1e-3),
    ("micro", 1e-6),
    ("nano", 1e-9),
    ("pico", 1e-12),
    ("femto", 1e-15),
    ("atto", 1e-18),
    ("zepto", 1e-21),
    ("yocto", 1e-24),
];

/// SI prefixes by symbol. `da` has to come before `d`.
pub const PREFIX_SYMBOLS: [(&str, f64); 22] = [
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("μ", 1e-6),
    ("µ", 1e-6),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// Splits a name like `meganewton` or `GPa` into the prefix, its factor, and the prefixable unit
/// it is attached to. Returns `None` if no such split exists. Names already in the table are not
/// split.
pub fn split_prefix(name: &str) -> Option<(&'static str, f64, &'static str)> {
    if UNITS.contains_key(name) {
        return None;
    }

    PREFIX_NAMES
        .iter()
        .chain(PREFIX_SYMBOLS.iter())
        .find_map(|&(prefix, factor)| {
            let rest = name.strip_prefix(prefix)?;
            let (unit, def) = UNITS.get_entry(rest)?;
            (def.prefixable && def.offset.is_none()).then_some((prefix, factor, *unit))
        })
}

/// Looks up an atomic unit, trying SI prefixes if the name is not directly in the table.
pub fn lookup(name: &str) -> Option<UnitDef> {
    if let Some(def) = UNITS.get(name) {
        return Some(*def);
    }

    let (prefix, factor, unit) = split_prefix(name)?;
    trace!(target: "metron::table", name, prefix, unit, "resolved prefixed unit");
    UNITS.get(unit).map(|def| UnitDef {
        factor: def.factor * factor,
        ..*def
    })
}

/// Looks up an atomic unit, failing with [`QuantityError::UnitNotFoundError`].
pub fn try_lookup(name: &str) -> Result<UnitDef, QuantityError> {
    lookup(name).ok_or_else(|| QuantityError::UnitNotFoundError(name.to_string()))
}

/// The dimension of a unit family.
pub fn family_dimension(family: &str) -> Option<DimensionVector> {
    FAMILIES.get(family).copied().map(DimensionVector::from_exponents)
}

/// The dimension of a single atomic unit.
pub fn unit_dimension(name: &str) -> Result<DimensionVector, QuantityError> {
    let def = try_lookup(name)?;
    family_dimension(def.family).ok_or_else(|| QuantityError::UnitNotFoundError(name.to_string()))
}

/// Every name in the table, without prefixed forms.
pub fn unit_names() -> impl Iterator<Item = &'static str> {
    UNITS.keys().copied()
}

/// Raises a factor to a rational power, staying with `powi` when the power is an integer.
pub(crate) fn pow_frac(base: f64, power: Frac) -> f64 {
    match power.to_integer().and_then(|n| i32::try_from(n).ok()) {
        Some(n) => base.powi(n),
        None => base.powf(f64::from(power)),
    }
}

/// The factor that turns one of `expr` into the corresponding amount of SI base units.
pub fn si_factor(expr: &UnitExpression) -> Result<f64, QuantityError> {
    let mut factor = expr.scale();
    for (name, power) in expr.components() {
        factor *= pow_frac(try_lookup(name)?.factor, *power);
    }
    Ok(factor)
}

/// The multiplier that converts a value in `from` into a value in `to`.
pub fn conversion_factor(from: &UnitExpression, to: &UnitExpression) -> Result<f64, QuantityError> {
    let (from_dim, to_dim) = (from.dimensionality(), to.dimensionality());
    if from_dim != to_dim {
        return Err(QuantityError::DimensionalityError {
            from: from.to_string(),
            to: to.to_string(),
            from_dim,
            to_dim,
        });
    }
    Ok(si_factor(from)? / si_factor(to)?)
}

/// Rewrites every component as its family's unit: `foot / minute` becomes `meter / second`. The
/// scale is not carried over. Components in the `dimensionless` family disappear.
pub fn to_base_units(expr: &UnitExpression) -> Result<UnitExpression, QuantityError> {
    let mut components: Vec<(String, Frac)> = vec![];
    for (name, power) in expr.components() {
        let family = try_lookup(name)?.family;
        if family == "dimensionless" {
            continue;
        }
        merge(&mut components, family, *power)?;
    }
    UnitExpression::from_components(components, 1.0)
}

/// The table entry of a plain temperature scale: a single unit in the kelvin family, unscaled and
/// to the first power. Anything else (`kelvin^2`, `1000 kelvin`) converts linearly.
pub fn temperature_entry(expr: &UnitExpression) -> Option<UnitDef> {
    match expr.components() {
        [(name, power)] if *power == Frac::ONE && expr.scale() == 1.0 => {
            lookup(name).filter(|def| def.family == TEMPERATURE_FAMILY)
        }
        _ => None,
    }
}

/// Converts a reading on a temperature scale to kelvin.
pub fn to_kelvin(value: f64, def: &UnitDef) -> f64 {
    (value + def.offset.unwrap_or(0.0)) * def.factor
}

/// Converts kelvin to a reading on a temperature scale.
pub fn from_kelvin(kelvin: f64, def: &UnitDef) -> f64 {
    kelvin / def.factor - def.offset.unwrap_or(0.0)
}

/// The names of the SI base units, in the order of [`BaseDimension::ALL`].
pub fn base_unit_names() -> [&'static str; 7] {
    BaseDimension::ALL.map(|d| d.base_unit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_invariants() {
        for (name, def) in UNITS.entries() {
            assert!(
                FAMILIES.contains_key(def.family),
                "{} has family {}",
                name,
                def.family
            );
            assert!(def.factor > 0.0, "{}", name);
        }
        for family in FAMILIES.keys() {
            assert!(UNITS.contains_key(*family), "{}", family);
            assert_eq!(UNITS[*family].factor, 1.0);
        }
        for name in base_unit_names() {
            assert!(FAMILIES.contains_key(name));
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("ft").map(|d| d.family), Some("meter"));
        assert_eq!(lookup("C").and_then(|d| d.offset), Some(273.15));
        assert_eq!(lookup("kelvin").and_then(|d| d.offset), None);
        assert_eq!(lookup("bogus"), None);
        assert_eq!(
            try_lookup("furlongs"),
            Err(QuantityError::UnitNotFoundError("furlongs".into()))
        );
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(split_prefix("meganewton"), Some(("mega", 1e6, "newton")));
        assert_eq!(split_prefix("GPa"), Some(("G", 1e9, "Pa")));
        assert_eq!(split_prefix("dam"), Some(("da", 1e1, "m")));
        assert_eq!(split_prefix("mmol"), Some(("m", 1e-3, "mol")));
        // already in the table
        assert_eq!(split_prefix("km"), None);
        assert_eq!(split_prefix("kilonewton"), None);
        // affine scales never take prefixes
        assert_eq!(split_prefix("kilocelsius"), None);
        assert_eq!(split_prefix("mdegC"), None);
        // feet are not prefixable
        assert_eq!(split_prefix("kft"), None);

        assert_relative_eq!(lookup("μs").map(|d| d.factor).unwrap_or(0.0), 1e-6);
        assert_relative_eq!(
            lookup("megagram").map(|d| d.factor).unwrap_or(0.0),
            1e3,
            max_relative = 1e-12
        );
        assert_eq!(lookup("GPa").map(|d| d.family), Some("pascal"));
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(
            unit_dimension("newton"),
            Ok(DimensionVector::from_exponents([1, 1, -2, 0, 0, 0, 0]))
        );
        assert_eq!(unit_dimension("percent"), Ok(DimensionVector::dimensionless()));
        assert_eq!(unit_dimension("rad"), Ok(DimensionVector::dimensionless()));
        assert!(unit_dimension("nope").is_err());
    }

    #[test]
    fn test_affine() {
        let celsius = lookup("celsius").unwrap();
        let fahrenheit = lookup("fahrenheit").unwrap();
        assert_eq!(to_kelvin(0.0, &celsius), 273.15);
        assert_relative_eq!(to_kelvin(212.0, &fahrenheit), 373.15, max_relative = 1e-12);
        assert_relative_eq!(from_kelvin(373.15, &celsius), 100.0, max_relative = 1e-12);
        assert_relative_eq!(
            from_kelvin(to_kelvin(-40.0, &celsius), &fahrenheit),
            -40.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_pow_frac() {
        assert_eq!(pow_frac(10.0, Frac::from(3)), 1000.0);
        assert_eq!(pow_frac(2.0, Frac::from(-1)), 0.5);
        assert_relative_eq!(pow_frac(8.0, Frac::new_ratio(1, 3)), 2.0, max_relative = 1e-12);
    }
}
