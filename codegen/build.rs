// Generates the unit conversion tables from the CSV files in `data/`.

// Every alias is its own row in `data/units.csv`, so a typo'd family or a duplicated alias is
// caught here instead of turning into a unit that silently has no dimension at runtime.

use std::collections::{HashMap, HashSet};
use std::env;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// A row of `data/units.csv`.
#[derive(Debug, Deserialize)]
struct UnitRow {
    name: String,
    family: String,
    factor: f64,
    offset: Option<f64>,
    prefixable: bool,
}

/// A row of `data/families.csv`: the exponents of the seven SI base dimensions.
#[derive(Debug, Deserialize)]
struct FamilyRow {
    name: String,
    length: i8,
    mass: i8,
    time: i8,
    current: i8,
    temperature: i8,
    amount: i8,
    luminosity: i8,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, Box<dyn StdError>> {
    let reader = BufReader::new(File::open(path)?);
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = vec![];
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn main() -> Result<(), Box<dyn StdError>> {
    let out_dir = env::var_os("OUT_DIR").ok_or(env::VarError::NotPresent)?;
    let manifest_dir =
        env::var_os("CARGO_MANIFEST_DIR").ok_or(env::VarError::NotPresent)?;
    let data_dir = PathBuf::from(manifest_dir).join("data");

    let units: Vec<UnitRow> = read_rows(&data_dir.join("units.csv"))?;
    let families: Vec<FamilyRow> = read_rows(&data_dir.join("families.csv"))?;

    let mut family_dims: HashMap<&str, [i8; 7]> = HashMap::new();
    for fam in &families {
        let dims = [
            fam.length,
            fam.mass,
            fam.time,
            fam.current,
            fam.temperature,
            fam.amount,
            fam.luminosity,
        ];
        if family_dims.insert(fam.name.as_str(), dims).is_some() {
            return Err(format!("family {} is defined twice", fam.name).into());
        }
    }

    let mut seen = HashSet::new();
    for unit in &units {
        if !seen.insert(unit.name.as_str()) {
            return Err(format!("unit {} is defined twice", unit.name).into());
        }
        if !family_dims.contains_key(unit.family.as_str()) {
            return Err(format!("unit {} has unknown family {}", unit.name, unit.family).into());
        }
        if !unit.factor.is_finite() || unit.factor <= 0.0 {
            return Err(format!("unit {} has invalid factor {}", unit.name, unit.factor).into());
        }
        if unit.offset.is_some() && unit.prefixable {
            return Err(format!("affine unit {} cannot take prefixes", unit.name).into());
        }
    }
    // Families have to be units themselves, otherwise to_base_units produces unparseable output.
    for fam in &families {
        if !seen.contains(fam.name.as_str()) {
            return Err(format!("family {} is not itself a unit", fam.name).into());
        }
    }

    let mut unit_entries = String::new();
    for unit in &units {
        let offset = match unit.offset {
            Some(o) => format!("Some({:?})", o),
            None => "None".to_string(),
        };
        writeln!(
            unit_entries,
            "    {:?} => UnitDef {{ factor: {:?}, offset: {}, family: {:?}, prefixable: {} }},",
            unit.name, unit.factor, offset, unit.family, unit.prefixable
        )?;
    }

    let mut family_entries = String::new();
    for fam in &families {
        writeln!(
            family_entries,
            "    {:?} => {:?},",
            fam.name,
            family_dims[fam.name.as_str()]
        )?;
    }

    let table = format!(
        r#"
/// Every atomic unit name and alias, with its conversion data.
#[allow(clippy::excessive_precision)]
pub static UNITS: phf::Map<&'static str, UnitDef> = phf::phf_map! {{
{unit_entries}}};

/// The dimension exponents of every base-unit family, in the order of [`BaseDimension::ALL`].
pub static FAMILIES: phf::Map<&'static str, [i8; 7]> = phf::phf_map! {{
{family_entries}}};
"#
    );

    let dest_path = Path::new(&out_dir).join("unit_table.rs");
    std::fs::write(dest_path, table)?;

    println!("cargo:rerun-if-changed=data/units.csv");
    println!("cargo:rerun-if-changed=data/families.csv");
    println!("cargo:rerun-if-changed=codegen/build.rs");

    Ok(())
}
