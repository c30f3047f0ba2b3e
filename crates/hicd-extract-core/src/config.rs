//! Deployment configuration.
//!
//! Ward codes and the lab analyte table differ between hospitals. The defaults
//! are the tables of the HICD deployment this crate was written against; load
//! another deployment's tables with [`ExtractionConfig::from_json`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Ward letter and named-unit lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardTable {
    /// Ward letter → three-digit ward code
    letters: BTreeMap<String, String>,
    /// Named unit (e.g. "UTI") → three-digit ward code
    #[serde(default)]
    units: BTreeMap<String, String>,
}

impl Default for WardTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WardTable {
    /// Create a table with the default ward mappings.
    pub fn new() -> Self {
        Self {
            letters: Self::default_letters(),
            units: Self::default_units(),
        }
    }

    /// An empty table.
    pub fn empty() -> Self {
        Self {
            letters: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }

    /// Ward code for a ward letter.
    pub fn code_for_letter(&self, letter: char) -> Option<&str> {
        self.letters
            .get(&letter.to_ascii_uppercase().to_string())
            .map(String::as_str)
    }

    /// Ward code for a ward name: "ENFERMARIA G", "G", or a named unit.
    pub fn code_for_ward(&self, name: &str) -> Option<&str> {
        let upper = name.trim().to_uppercase();
        if let Some(code) = self.units.get(&upper) {
            return Some(code.as_str());
        }
        let letter = upper
            .strip_prefix("ENFERMARIA")
            .map(str::trim)
            .unwrap_or(&upper);
        let mut chars = letter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.code_for_letter(c),
            _ => None,
        }
    }

    /// Strings that identify a ward inside bed or clinic fields.
    ///
    /// For "ENFERMARIA G" this is `["012.012", "ENFERMARIA G"]`; for a named
    /// unit such as "UTI" it is `["007.007", "U T I"]`, the spelled-out form
    /// the listings use.
    pub fn match_terms(&self, name: &str) -> Vec<String> {
        let upper = name.trim().to_uppercase();
        let Some(code) = self.code_for_ward(&upper) else {
            return Vec::new();
        };
        let label = if self.units.contains_key(&upper) {
            upper
                .chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            let letter = upper.trim_start_matches("ENFERMARIA").trim();
            format!("ENFERMARIA {letter}")
        };
        vec![format!("{code}.{code}"), label]
    }

    /// Add or replace a ward letter mapping.
    pub fn add_ward(&mut self, letter: &str, code: &str) -> ConfigResult<()> {
        let letter = letter.trim().to_uppercase();
        if letter.chars().count() != 1 || !letter.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidWard(letter));
        }
        validate_code(code)?;
        self.letters.insert(letter, code.to_string());
        Ok(())
    }

    /// Add or replace a named unit mapping.
    pub fn add_unit(&mut self, name: &str, code: &str) -> ConfigResult<()> {
        let name = name.trim().to_uppercase();
        if name.is_empty() {
            return Err(ConfigError::InvalidWard(name));
        }
        validate_code(code)?;
        self.units.insert(name, code.to_string());
        Ok(())
    }

    fn validate(&self) -> ConfigResult<()> {
        self.letters
            .values()
            .chain(self.units.values())
            .try_for_each(|code| validate_code(code))
    }

    /// Default ward letter mappings.
    fn default_letters() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("A".into(), "008".into());
        map.insert("B".into(), "009".into());
        map.insert("C".into(), "010".into());
        map.insert("D".into(), "011".into());
        map.insert("G".into(), "012".into());
        map.insert("H".into(), "013".into());
        map.insert("J".into(), "015".into());
        map.insert("K".into(), "016".into());
        map.insert("L".into(), "017".into());
        map.insert("M".into(), "018".into());
        map
    }

    /// Default named units.
    fn default_units() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("UTI".into(), "007".into());
        map.insert("CIP".into(), "002".into());
        map
    }
}

fn validate_code(code: &str) -> ConfigResult<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidWard(code.to_string()))
    }
}

/// A named analyte recognized in free-text result pages, e.g.
/// `Hematocrito.......: 40,5 % VR: 36 a 46`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalytePattern {
    /// Code reported for the analyte
    pub code: String,
    /// Regex fragment matching the analyte label
    pub label: String,
    /// Regex fragment matching the unit after the value
    #[serde(default)]
    pub unit: Option<String>,
    /// Whether a `VR: <reference>` tail is required
    #[serde(default)]
    pub reference: bool,
}

impl AnalytePattern {
    pub fn new(code: &str, label: &str, unit: Option<&str>, reference: bool) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
            unit: unit.map(str::to_string),
            reference,
        }
    }

    /// Full pattern: label, a leader up to `>` or `:`, the value, the unit,
    /// then the reference. Group 1 is the value, `unit` and `reference` are named.
    pub fn to_regex(&self) -> String {
        let mut pattern = format!(r"(?i){}[^>:\n]*[>:]\s*([0-9][0-9.,]*)", self.label);
        if let Some(unit) = &self.unit {
            pattern.push_str(&format!(r"\s*(?P<unit>{unit})"));
        }
        if self.reference {
            pattern.push_str(r"\s*VR:\s*(?P<reference>[^;\n]+)");
        }
        pattern
    }
}

/// Everything deployment-specific the extractors consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub wards: WardTable,
    pub analytes: Vec<AnalytePattern>,
    /// Unit vocabulary searched when a value has no trailing unit
    pub units: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            wards: WardTable::new(),
            analytes: Self::default_analytes(),
            units: Self::default_units(),
        }
    }
}

impl ExtractionConfig {
    /// Parse a JSON document. Missing sections fall back to the defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.wards.validate()?;
        for analyte in &config.analytes {
            regex::Regex::new(&analyte.to_regex()).map_err(|source| {
                ConfigError::InvalidPattern {
                    name: analyte.code.clone(),
                    source,
                }
            })?;
        }
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add an analyte pattern after the defaults.
    pub fn add_analyte(&mut self, analyte: AnalytePattern) {
        self.analytes.push(analyte);
    }

    /// Hematology and coagulation panels as printed by the HICD lab.
    fn default_analytes() -> Vec<AnalytePattern> {
        vec![
            AnalytePattern::new("HTO", r"Hemat[oó]crito", Some("%"), true),
            AnalytePattern::new("HGB", r"Hemoglobina", Some(r"g/dl"), true),
            AnalytePattern::new("RBC", r"Hem[aá]cia", Some(r"milh/mm3"), true),
            AnalytePattern::new("WBC", r"Leuc[oó]citos", Some(r"/mm3"), true),
            AnalytePattern::new("PLT", r"Plaquetas", Some(r"/mm3"), true),
            AnalytePattern::new("VCM", r"Vol\.\s*Corpusc\.\s*m[eé]dio", Some(r"f[l1]"), true),
            AnalytePattern::new("HCM", r"Hemog\.\s*corp\.\s*m[eé]dia", Some("pg"), true),
            AnalytePattern::new("CHCM", r"Concent\.\s*hemoglob\.", Some("%"), true),
            AnalytePattern::new("RDW", r"RDW", Some("%"), false),
            AnalytePattern::new("TTPA", r"TTPA", Some(r"Seg\."), false),
            AnalytePattern::new("RATIO", r"Ratio", None, false),
            AnalytePattern::new("POOL_NORMAL", r"Pool\s*Normal", Some(r"Seg\."), false),
            AnalytePattern::new("PLASMA_PAC", r"Plasma\s*do\s*Paciente", Some(r"Seg\."), false),
            AnalytePattern::new("ATIVIDADE", r"Atividade", Some("%"), false),
            AnalytePattern::new("RNI", r"RNI", None, false),
            AnalytePattern::new("SEGM_VR", r"Segmentados[^>\n]*\(\s*V\s*R\s*\)", Some("%"), true),
            AnalytePattern::new("LINF_VR", r"Linf[oó]citos[^>\n]*\(\s*V\s*R\s*\)", Some("%"), true),
            AnalytePattern::new("MONO_VR", r"Mon[oó]citos[^>\n]*\(\s*V\s*R\s*\)", Some("%"), true),
            AnalytePattern::new("BAST_VR", r"Bast[oõ]es[^>\n]*\(\s*V\s*R\s*\)", Some("%"), true),
        ]
    }

    fn default_units() -> Vec<String> {
        [
            "mg/dL", "g/dL", "mEq/L", "UI/L", "ng/mL", "pg/mL", "µg/dL", "mmol/L", "x10³/µL",
            "/µL", "%",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
