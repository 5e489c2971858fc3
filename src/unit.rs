//! Unit expressions: products of atomic units raised to rational powers, times a numeric scale.
//!
//! A unit string is parsed with the following precedence:
//! 1. A top-level `/` splits the string at its first occurrence, and the two sides are divided.
//!    This makes `a/b/c` mean `a / (b/c)`, i.e. `a * c / b`.
//! 2. Otherwise the pieces separated by `*` (or by whitespace, if there is no `*`) are multiplied.
//! 3. Otherwise the string is an atom: a unit name with an optional `^power`, or a number that gets
//!    folded into the scale.
//!
//! Separators inside parentheses are ignored, so rational powers like `meter^(1/3)` survive.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    dimension::DimensionVector,
    error::QuantityError,
    fract::{Frac, FracError},
    parsing::{atom, find_top_level, numeric_literal, split_top_level},
    table::{self, pow_frac},
};

/// How many distinct unit strings the global parse cache remembers.
pub const CACHE_CAPACITY: usize = 1000;

/// The name of the empty unit.
pub const DIMENSIONLESS: &str = "dimensionless";

/// A unit: atomic unit names with rational powers, in the order they first appeared, and a scale.
/// Every name is known to the conversion table, so the dimension is always defined.
#[derive(Debug, Clone)]
pub struct UnitExpression {
    /// How this unit is displayed: the input string if parsed, or the canonical rendering.
    name: String,
    /// Never contains zero powers or repeated names.
    components: Vec<(String, Frac)>,
    scale: f64,
    dimension: DimensionVector,
}

/// Adds `power` to the power of `name`.
pub(crate) fn merge(
    components: &mut Vec<(String, Frac)>,
    name: &str,
    power: Frac,
) -> Result<(), FracError> {
    match components.iter_mut().find(|(n, _)| n == name) {
        Some((_, p)) => *p = p.checked_add(power)?,
        None => components.push((name.to_string(), power)),
    }
    Ok(())
}

/// Writes a power so that it parses back to the same value: `2`, `0.5` or `(1/3)`.
fn format_power(power: Frac) -> String {
    if power.is_integer() {
        power.to_string()
    } else if 1_000_000 % power.denominator() == 0 {
        f64::from(power).to_string()
    } else {
        format!("({})", power)
    }
}

fn format_component(name: &str, power: Frac) -> String {
    if power == Frac::ONE {
        name.to_string()
    } else {
        format!("{}^{}", name, format_power(power))
    }
}

/// The canonical rendering: `num^p * num / den^p * den`, `1 / den` if nothing is in the numerator,
/// `dimensionless` if there is nothing at all. A scale other than 1 leads the numerator.
fn render(components: &[(String, Frac)], scale: f64) -> String {
    let mut numerator: Vec<String> = vec![];
    if scale != 1.0 {
        numerator.push(scale.to_string());
    }
    let mut denominator: Vec<String> = vec![];
    for (name, power) in components {
        if power.is_positive() {
            numerator.push(format_component(name, *power));
        } else if power.is_negative() {
            denominator.push(format_component(name, -*power));
        }
    }

    match (numerator.is_empty(), denominator.is_empty()) {
        (true, true) => DIMENSIONLESS.to_string(),
        (false, true) => numerator.join(" * "),
        (true, false) => format!("1 / {}", denominator.join(" * ")),
        (false, false) => format!("{} / {}", numerator.join(" * "), denominator.join(" * ")),
    }
}

impl UnitExpression {
    /// Assembles an expression whose names have already been checked against the table.
    fn build(
        mut components: Vec<(String, Frac)>,
        scale: f64,
        dimension: DimensionVector,
    ) -> Self {
        components.retain(|(_, p)| *p != Frac::ZERO);
        Self {
            name: render(&components, scale),
            components,
            scale,
            dimension,
        }
    }

    /// The empty unit.
    pub fn dimensionless() -> Self {
        Self::build(vec![], 1.0, DimensionVector::dimensionless())
    }

    /// A dimensionless unit that is a pure number, like the `1000` in `1000 * meter`.
    pub fn scalar(scale: f64) -> Self {
        Self::build(vec![], scale, DimensionVector::dimensionless())
    }

    /// Creates an expression from names and powers. Repeated names are combined.
    pub fn from_components(
        components: impl IntoIterator<Item = (String, Frac)>,
        scale: f64,
    ) -> Result<Self, QuantityError> {
        let mut merged = vec![];
        let mut dimension = DimensionVector::dimensionless();
        for (name, power) in components {
            if name == DIMENSIONLESS {
                continue;
            }
            // stored powers are negated when rendered
            power.checked_neg()?;
            let atom = table::unit_dimension(&name)?.checked_scale(power)?;
            dimension = dimension.checked_add(&atom)?;
            merge(&mut merged, &name, power)?;
        }
        Ok(Self::build(merged, scale, dimension))
    }

    /// Parses a unit string, going through the global parse cache.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        Self::parse_scaled(s, 1.0)
    }

    /// Parses a unit string and multiplies its scale by `scale`.
    pub fn parse_scaled(s: &str, scale: f64) -> Result<Self, QuantityError> {
        let key = ParseCache::key(s, scale);
        let hit = UNIT_CACHE.lock().get(&key).cloned();
        if let Some(unit) = hit {
            return Ok(unit);
        }

        // the lock is not held while parsing
        let unit = Self::parse_uncached(s, scale)?;
        UNIT_CACHE.lock().insert(key, unit.clone());
        Ok(unit)
    }

    /// Parses without touching any cache.
    pub fn parse_uncached(s: &str, scale: f64) -> Result<Self, QuantityError> {
        let parsed = Self::parse_expression(s)?;
        if scale == 1.0 {
            Ok(Self {
                name: s.trim().to_string(),
                ..parsed
            })
        } else {
            Ok(parsed.multiply(&Self::scalar(scale))?)
        }
    }

    fn parse_expression(s: &str) -> Result<Self, QuantityError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuantityError::UnitParseError("empty unit string".into()));
        }

        if let Some(i) = find_top_level(s, |c| c == '/') {
            let (num, den) = (s[..i].trim(), s[i + 1..].trim());
            if num.is_empty() || den.is_empty() {
                return Err(QuantityError::UnitParseError(format!(
                    "missing operand of '/' in {}",
                    s
                )));
            }
            return Ok(Self::parse_expression(num)?.divide(&Self::parse_expression(den)?)?);
        }

        let pieces = if find_top_level(s, |c| c == '*').is_some() {
            split_top_level(s, |c| c == '*')
        } else if find_top_level(s, char::is_whitespace).is_some() {
            split_top_level(s, char::is_whitespace)
        } else {
            return Self::parse_atom(s);
        };
        if pieces.is_empty() {
            return Err(QuantityError::UnitParseError(s.to_string()));
        }

        pieces
            .into_iter()
            .try_fold(Self::dimensionless(), |acc, piece| {
                Ok::<_, QuantityError>(acc.multiply(&Self::parse_expression(piece)?)?)
            })
    }

    fn parse_atom(s: &str) -> Result<Self, QuantityError> {
        if let Ok((_, value)) = numeric_literal(s) {
            if !value.is_finite() || value == 0.0 {
                return Err(QuantityError::UnitParseError(format!(
                    "invalid numeric factor {}",
                    s
                )));
            }
            return Ok(Self::scalar(value));
        }

        let (_, (name, power)) =
            atom(s).map_err(|_e| QuantityError::UnitParseError(s.to_string()))?;
        let power = power.unwrap_or(Frac::ONE);
        if name == DIMENSIONLESS {
            return Ok(Self::dimensionless());
        }
        let dimension = table::unit_dimension(name)?.checked_scale(power)?;
        Ok(Self::build(vec![(name.to_string(), power)], 1.0, dimension))
    }

    /// The product of two units. Powers of the same name are summed. Fails only if a power
    /// overflows.
    pub fn multiply(&self, other: &Self) -> Result<Self, FracError> {
        let mut components = self.components.clone();
        for (name, power) in &other.components {
            merge(&mut components, name, *power)?;
        }
        Ok(Self::build(
            components,
            self.scale * other.scale,
            self.dimension.checked_add(&other.dimension)?,
        ))
    }

    /// The quotient of two units.
    pub fn divide(&self, other: &Self) -> Result<Self, FracError> {
        let mut components = self.components.clone();
        for (name, power) in &other.components {
            merge(&mut components, name, power.checked_neg()?)?;
        }
        Ok(Self::build(
            components,
            self.scale / other.scale,
            self.dimension.checked_sub(&other.dimension)?,
        ))
    }

    /// Raises every power, and the scale, to `exponent`.
    pub fn power(&self, exponent: Frac) -> Result<Self, FracError> {
        let components = self
            .components
            .iter()
            .map(|(n, p)| Ok((n.clone(), p.checked_mul(exponent)?)))
            .collect::<Result<Vec<_>, FracError>>()?;
        Ok(Self::build(
            components,
            pow_frac(self.scale, exponent),
            self.dimension.checked_scale(exponent)?,
        ))
    }

    /// `dimensionless / self`.
    pub fn reciprocal(&self) -> Result<Self, FracError> {
        Self::dimensionless().divide(self)
    }

    /// The same unit, displayed in canonical form.
    pub fn simplified(&self) -> Self {
        Self {
            name: render(&self.components, self.scale),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[(String, Frac)] {
        &self.components
    }

    /// The power of a single atomic unit, zero if absent.
    pub fn power_of(&self, name: &str) -> Frac {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map_or(Frac::ZERO, |(_, p)| *p)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dimensionality(&self) -> DimensionVector {
        self.dimension
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    /// Whether values in this unit can be converted to `other`.
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.dimension == other.dimension
    }

    /// The multiplier taking values in this unit to values in `other`.
    pub fn conversion_factor_to(&self, other: &Self) -> Result<f64, QuantityError> {
        table::conversion_factor(self, other)
    }

    /// This unit with every component replaced by its family's SI unit.
    pub fn to_base_units(&self) -> Result<Self, QuantityError> {
        table::to_base_units(self)
    }
}

impl PartialEq for UnitExpression {
    /// Same scale and same powers, in any order.
    fn eq(&self, other: &Self) -> bool {
        self.scale == other.scale
            && self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .all(|(n, p)| other.power_of(n) == *p)
    }
}

impl Display for UnitExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for UnitExpression {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A unit given either as a string still to be parsed or as an already-built expression.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitArg {
    Raw(String),
    Built(UnitExpression),
}

impl UnitArg {
    pub fn resolve(self) -> Result<UnitExpression, QuantityError> {
        match self {
            UnitArg::Raw(s) => UnitExpression::parse(&s),
            UnitArg::Built(u) => Ok(u),
        }
    }
}

impl From<&str> for UnitArg {
    fn from(value: &str) -> Self {
        UnitArg::Raw(value.to_string())
    }
}

impl From<String> for UnitArg {
    fn from(value: String) -> Self {
        UnitArg::Raw(value)
    }
}

impl From<&String> for UnitArg {
    fn from(value: &String) -> Self {
        UnitArg::Raw(value.clone())
    }
}

impl From<UnitExpression> for UnitArg {
    fn from(value: UnitExpression) -> Self {
        UnitArg::Built(value)
    }
}

impl From<&UnitExpression> for UnitArg {
    fn from(value: &UnitExpression) -> Self {
        UnitArg::Built(value.clone())
    }
}

/// A bounded memo of parsed unit strings. Once full it stops accepting entries; nothing is ever
/// evicted.
#[derive(Debug, Clone, Default)]
pub struct ParseCache {
    entries: HashMap<String, UnitExpression>,
    capacity: usize,
    saturated: bool,
}

/// The cache used by [`UnitExpression::parse`].
static UNIT_CACHE: Lazy<Mutex<ParseCache>> =
    Lazy::new(|| Mutex::new(ParseCache::new(CACHE_CAPACITY)));

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            saturated: false,
        }
    }

    /// The cache key of a unit string parsed with an extra scale.
    pub fn key(s: &str, scale: f64) -> String {
        format!("{}:{}", s.trim(), scale)
    }

    pub fn get(&self, key: &str) -> Option<&UnitExpression> {
        self.entries.get(key)
    }

    /// Stores an entry, returning whether there was room for it.
    pub fn insert(&mut self, key: String, unit: UnitExpression) -> bool {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if !self.saturated {
                self.saturated = true;
                debug!(
                    target: "metron::unit",
                    capacity = self.capacity,
                    "unit parse cache is full, further units will not be cached"
                );
            }
            return false;
        }
        self.entries.insert(key, unit);
        true
    }

    /// Parses through this cache instead of the global one.
    pub fn parse(&mut self, s: &str, scale: f64) -> Result<UnitExpression, QuantityError> {
        let key = Self::key(s, scale);
        if let Some(unit) = self.get(&key) {
            return Ok(unit.clone());
        }
        let unit = UnitExpression::parse_uncached(s, scale)?;
        self.insert(key, unit.clone());
        Ok(unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }
}

/// How many entries the global parse cache holds.
pub fn global_cache_len() -> usize {
    UNIT_CACHE.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dimension::BaseDimension, frac};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn unit(s: &str) -> UnitExpression {
        UnitExpression::parse(s).unwrap()
    }

    fn dims(exps: [i8; 7]) -> DimensionVector {
        DimensionVector::from_exponents(exps)
    }

    #[test]
    fn test_parse_atoms() {
        let m = unit("meter");
        assert_eq!(m.components(), &[("meter".to_string(), frac!(1))]);
        assert_eq!(m.dimensionality(), DimensionVector::of(BaseDimension::Length));
        assert_eq!(unit("s^-2").power_of("s"), frac!(-2));
        assert_eq!(unit("meter^(1/3)").power_of("meter"), frac!(1 / 3));
        assert_eq!(unit("kg^0.5").power_of("kg"), frac!(1 / 2));
        assert!(unit("dimensionless").components().is_empty());
        assert!(unit("meter^0").is_dimensionless());
        assert_eq!(unit("  km ").name(), "km");
    }

    #[test]
    fn test_parse_compound() {
        let force = dims([1, 1, -2, 0, 0, 0, 0]);
        assert_eq!(unit("kg * m / s^2").dimensionality(), force);
        assert_eq!(unit("kg m / s^2").dimensionality(), force);
        assert_eq!(unit("kg*m/s^2").dimensionality(), force);
        assert_eq!(unit("kg m*s^-2").dimensionality(), force);
        assert_eq!(unit("kg * m / s^2"), unit("m kg s^-2"));
        assert_eq!(unit("newton").dimensionality(), force);
        assert_eq!(unit("meter * meter").power_of("meter"), frac!(2));
        assert!(unit("meter / meter").is_dimensionless());
        assert!(unit("meter / meter").components().is_empty());
    }

    #[test]
    fn test_chained_division() {
        // the first slash splits, so the rest is one denominator
        let u = unit("meter/second/kilogram");
        assert_eq!(u.power_of("meter"), frac!(1));
        assert_eq!(u.power_of("second"), frac!(-1));
        assert_eq!(u.power_of("kilogram"), frac!(1));
        assert_eq!(u, unit("meter * kilogram / second"));
    }

    #[test]
    fn test_numeric_tokens() {
        let per_second = unit("1 / second");
        assert_eq!(per_second.scale(), 1.0);
        assert_eq!(per_second.power_of("second"), frac!(-1));
        assert_eq!(per_second, unit("second^-1"));

        let ml = unit("0.001 * liter");
        assert_relative_eq!(ml.scale(), 0.001);
        assert_relative_eq!(
            ml.conversion_factor_to(&unit("mL")).unwrap(),
            1.0,
            max_relative = 1e-12
        );
        assert_eq!(unit("1000 meter").simplified().name(), "1000 * meter");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            UnitExpression::parse("furlong"),
            Err(QuantityError::UnitNotFoundError("furlong".into()))
        );
        assert_eq!(
            UnitExpression::parse("meter * furlong / s"),
            Err(QuantityError::UnitNotFoundError("furlong".into()))
        );
        for bad in ["", "   ", "meter /", "/ second", "meter^x", "meter^", "m^(1/0)", "*", "0 m"] {
            assert!(
                matches!(
                    UnitExpression::parse(bad),
                    Err(QuantityError::UnitParseError(_))
                ),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_algebra() {
        let m = unit("meter");
        let s = unit("second");
        let v = m.divide(&s).unwrap();
        assert_eq!(v.name(), "meter / second");
        assert_eq!(v.dimensionality(), dims([1, 0, -1, 0, 0, 0, 0]));

        let a = v.divide(&s).unwrap();
        assert_eq!(a.name(), "meter / second^2");

        assert_eq!(s.reciprocal().unwrap().name(), "1 / second");
        assert_eq!(m.divide(&m).unwrap().name(), "dimensionless");
        assert_eq!(m.multiply(&m).unwrap().name(), "meter^2");
        assert_eq!(m.power(frac!(1 / 2)).unwrap().name(), "meter^0.5");
        assert_eq!(m.power(frac!(1 / 3)).unwrap().name(), "meter^(1/3)");
        assert_eq!(v.power(frac!(-2)).unwrap().name(), "second^2 / meter^2");
        let round_trip = unit("kg").multiply(&v).and_then(|u| u.divide(&unit("kg")));
        assert_eq!(round_trip.unwrap().name(), "meter / second");
    }

    #[test]
    fn test_exponent_overflow() {
        for s in [
            "meter^9223372036854775807 * meter",
            "meter^0.000000000000000001 * foot^(1/11)",
            "meter^-9223372036854775808",
            "meter^-9223372036854775807 / meter^2",
        ] {
            assert!(
                matches!(UnitExpression::parse(s), Err(QuantityError::UnitParseError(_))),
                "{:?}",
                s
            );
        }

        let big = unit("meter^9223372036854775807");
        assert_eq!(big.reciprocal().unwrap().power_of("meter"), frac!((-i64::MAX)));
        assert!(big.multiply(&unit("meter")).is_err());
        assert!(big.divide(&unit("meter^-1")).is_err());
        assert!(big.power(frac!(2)).is_err());
        assert!(UnitExpression::from_components(
            [("percent".to_string(), Frac::new_int(i64::MIN))],
            1.0
        )
        .is_err());
    }

    #[test]
    fn test_power_roundtrip() {
        let area = unit("meter^2");
        assert_eq!(area.power(frac!(1 / 2)).unwrap(), unit("meter"));
        let root = unit("meter").power(frac!(1 / 3)).unwrap();
        assert_eq!(root.power(frac!(3)).unwrap(), unit("meter"));
        assert_eq!(unit("1000 * meter").power(frac!(2)).unwrap().scale(), 1e6);
    }

    #[test]
    fn test_conversion_factors() {
        assert_relative_eq!(unit("km").conversion_factor_to(&unit("m")).unwrap(), 1000.0);
        assert_relative_eq!(
            unit("mile / hour").conversion_factor_to(&unit("m/s")).unwrap(),
            0.44704,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            unit("meter^2").conversion_factor_to(&unit("cm^2")).unwrap(),
            1e4,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            unit("kilonewton").conversion_factor_to(&unit("MN")).unwrap(),
            1e-3,
            max_relative = 1e-12
        );
        assert!(matches!(
            unit("meter").conversion_factor_to(&unit("second")),
            Err(QuantityError::DimensionalityError { .. })
        ));
    }

    #[test]
    fn test_to_base_units() {
        let u = unit("foot / minute").to_base_units().unwrap();
        assert_eq!(u.name(), "meter / second");
        assert_eq!(unit("kN").to_base_units().unwrap().name(), "newton");
        assert_eq!(unit("percent").to_base_units().unwrap().name(), "dimensionless");
        assert_eq!(
            unit("ft * in").to_base_units().unwrap().name(),
            "meter^2"
        );
    }

    #[test]
    fn test_parse_cache() {
        let mut cache = ParseCache::new(2);
        assert!(cache.is_empty());
        cache.parse("meter", 1.0).unwrap();
        cache.parse("meter", 1.0).unwrap();
        assert_eq!(cache.len(), 1);
        cache.parse("second", 1.0).unwrap();
        let third = cache.parse("kilogram", 1.0).unwrap();
        assert_eq!(third.power_of("kilogram"), frac!(1));
        assert_eq!(cache.len(), 2);
        assert!(cache.is_saturated());
        assert!(cache.get(&ParseCache::key("kilogram", 1.0)).is_none());

        // the scale is part of the key
        let mut cache = ParseCache::new(10);
        let km = cache.parse("meter", 1000.0).unwrap();
        let m = cache.parse("meter", 1.0).unwrap();
        assert_eq!(km.scale(), 1000.0);
        assert_eq!(m.scale(), 1.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_global_cache_bound() {
        for i in 0..(CACHE_CAPACITY + 100) {
            let u = UnitExpression::parse(&format!("meter^{}", i + 2)).unwrap();
            assert_eq!(u.power_of("meter"), frac!(i + 2));
        }
        assert!(global_cache_len() <= CACHE_CAPACITY);
    }

    #[test]
    fn test_unit_arg() {
        let built = UnitArg::from(unit("m / s")).resolve().unwrap();
        let raw = UnitArg::from("m / s").resolve().unwrap();
        assert_eq!(built, raw);
        assert!(UnitArg::from("nonsense").resolve().is_err());
    }

    fn atom_name() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "meter", "ft", "kg", "second", "hour", "A", "kelvin", "mol", "cd", "newton", "J",
            "percent", "rad", "km", "lb",
        ])
    }

    prop_compose! {
        fn unit_expression()(
            parts in prop::collection::vec((atom_name(), -3i64..=3, 1i64..=3), 0..5)
        ) -> UnitExpression {
            UnitExpression::from_components(
                parts.into_iter().map(|(n, num, den)| (n.to_string(), Frac::new_ratio(num, den))),
                1.0,
            ).unwrap()
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]
        #[test]
        fn test_dimensional_closure(a in unit_expression(), b in unit_expression()) {
            prop_assert_eq!(
                a.multiply(&b).unwrap().dimensionality(),
                a.dimensionality() + b.dimensionality()
            );
            prop_assert_eq!(
                a.divide(&b).unwrap().dimensionality(),
                a.dimensionality() - b.dimensionality()
            );
            prop_assert!(a.divide(&a).unwrap().is_dimensionless());
        }

        #[test]
        fn test_simplify_idempotent(a in unit_expression()) {
            let once = a.simplified();
            let reparsed = UnitExpression::parse(once.name()).unwrap();
            prop_assert_eq!(&reparsed, &a);
            let twice = reparsed.simplified();
            prop_assert_eq!(twice.name(), once.name());
        }
    }
}
