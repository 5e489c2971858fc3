//! Checking unit strings without building quantities, and "did you mean" suggestions for names
//! that are not in the table.

use crate::{
    dimension::DimensionVector, error::QuantityError, fract::Frac, table, unit::UnitExpression,
};

/// Suggestions further away than this are dropped, unless one name contains the other.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Levenshtein edit distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Validates unit strings against the conversion table.
#[derive(Debug, Clone)]
pub struct UnitValidator {
    names: Vec<&'static str>,
}

impl Default for UnitValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitValidator {
    pub fn new() -> Self {
        let mut names: Vec<&'static str> = table::unit_names().collect();
        names.sort_unstable();
        Self { names }
    }

    /// Every unit name that can be suggested.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn is_valid(&self, unit: &str) -> bool {
        self.validate(unit).is_ok()
    }

    /// Parses the string, returning the reason it is invalid if it is.
    pub fn validate(&self, unit: &str) -> Result<UnitExpression, QuantityError> {
        UnitExpression::parse(unit)
    }

    pub fn dimensionality(&self, unit: &str) -> Result<DimensionVector, QuantityError> {
        Ok(self.validate(unit)?.dimensionality())
    }

    /// The canonical form, with cancelled units removed: `meter * second / second` is `meter`.
    pub fn simplify(&self, unit: &str) -> Result<String, QuantityError> {
        Ok(self.validate(unit)?.simplified().to_string())
    }

    /// Succeeds if the two units measure the same kind of thing.
    pub fn check_dimensionality(&self, a: &str, b: &str) -> Result<(), QuantityError> {
        let (ua, ub) = (self.validate(a)?, self.validate(b)?);
        if ua.is_compatible_with(&ub) {
            Ok(())
        } else {
            Err(QuantityError::DimensionalityError {
                from: a.to_string(),
                to: b.to_string(),
                from_dim: ua.dimensionality(),
                to_dim: ub.dimensionality(),
            })
        }
    }

    /// The atomic units and their powers: `meter/second^2` is `meter: 1, second: -2`.
    pub fn parse_compound_unit(&self, unit: &str) -> Result<Vec<(String, Frac)>, QuantityError> {
        Ok(self.validate(unit)?.components().to_vec())
    }

    /// Known names close to `unit`, ignoring case: within a small edit distance, or containing or
    /// contained in it. The closest come first.
    pub fn suggest_corrections(&self, unit: &str, max_suggestions: usize) -> Vec<&'static str> {
        let query = unit.trim().to_lowercase();
        if query.is_empty() {
            return vec![];
        }

        let mut scored: Vec<(usize, &'static str)> = self
            .names
            .iter()
            .filter_map(|&name| {
                let lower = name.to_lowercase();
                let distance = levenshtein_distance(&query, &lower);
                let related = lower.contains(&query) || query.contains(&lower);
                (related || distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, name))
            })
            .collect();
        scored.sort();
        scored
            .into_iter()
            .take(max_suggestions)
            .map(|(_, name)| name)
            .collect()
    }
}

/// Whether `unit` parses.
pub fn validate_unit(unit: &str) -> bool {
    UnitValidator::new().is_valid(unit)
}

/// Up to five corrections for a misspelled unit.
pub fn suggest_unit(unit: &str) -> Vec<&'static str> {
    UnitValidator::new().suggest_corrections(unit, 5)
}
