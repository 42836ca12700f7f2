//! Gazetteer configuration: municipality and department lists plus the
//! via alias table. Loaded once and shared by the parser and planner.

use crate::address::ViaCode;
use crate::error::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerConfig {
    #[serde(default = "default_municipalities")]
    pub municipalities: Vec<String>,
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,
    /// Canonical code -> every alias that may appear in raw text or stored rows.
    /// The canonical code itself is always listed first.
    #[serde(default = "default_via_aliases")]
    pub via_aliases: BTreeMap<ViaCode, Vec<String>>,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            municipalities: default_municipalities(),
            departments: default_departments(),
            via_aliases: default_via_aliases(),
        }
    }
}

fn default_municipalities() -> Vec<String> {
    ["bogotá", "medellín", "cali", "barranquilla", "cartagena"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_departments() -> Vec<String> {
    ["cundinamarca", "antioquia", "valle del cauca", "atlántico", "bolívar"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_via_aliases() -> BTreeMap<ViaCode, Vec<String>> {
    let table: [(ViaCode, &[&str]); 6] = [
        (ViaCode::Cl, &["cl", "calle", "cll", "c"]),
        (ViaCode::Kr, &["kr", "cr", "carrera", "krr", "carr", "k"]),
        (ViaCode::Av, &["av", "avenida", "avd", "ac", "ak"]),
        (ViaCode::Tv, &["tv", "transversal", "trans"]),
        (ViaCode::Dg, &["dg", "diagonal", "diag"]),
        (ViaCode::Ap, &["ap", "autopista"]),
    ];
    table
        .into_iter()
        .map(|(code, aliases)| (code, aliases.iter().map(|a| a.to_string()).collect()))
        .collect()
}

/// Immutable lookup structure built from a [`GazetteerConfig`].
#[derive(Debug, Clone)]
pub struct Gazetteer {
    config: GazetteerConfig,
    alias_index: AHashMap<String, ViaCode>,
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::new(GazetteerConfig::default())
    }
}

impl Gazetteer {
    pub fn new(mut config: GazetteerConfig) -> Self {
        for list in [&mut config.municipalities, &mut config.departments] {
            for entry in list.iter_mut() {
                *entry = entry.trim().to_lowercase();
            }
            list.retain(|e| !e.is_empty());
        }

        let mut alias_index = AHashMap::new();
        for (code, aliases) in config.via_aliases.iter_mut() {
            let canonical = code.as_str().to_string();
            if !aliases.contains(&canonical) {
                aliases.insert(0, canonical);
            }
            for alias in aliases.iter_mut() {
                *alias = alias.trim().to_lowercase();
                alias_index.entry(alias.clone()).or_insert(*code);
            }
        }

        Self { config, alias_index }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: GazetteerConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidConfig(format!("gazetteer {}: {}", path.as_ref().display(), e)))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &GazetteerConfig {
        &self.config
    }

    /// Map a raw via token ("carrera", "K", "ak") to its canonical code.
    pub fn canonical_via(&self, token: &str) -> Option<ViaCode> {
        self.alias_index.get(&token.trim().to_lowercase()).copied()
    }

    /// Every alias a stored row may carry for `code`.
    pub fn via_equivalents(&self, code: ViaCode) -> Vec<String> {
        self.config
            .via_aliases
            .get(&code)
            .cloned()
            .unwrap_or_else(|| vec![code.as_str().to_string()])
    }

    /// First municipality contained in `text`.
    pub fn find_municipality(&self, text: &str) -> Option<&str> {
        self.config
            .municipalities
            .iter()
            .find(|m| text.contains(m.as_str()))
            .map(String::as_str)
    }

    /// First department contained in `text`.
    pub fn find_department(&self, text: &str) -> Option<&str> {
        self.config
            .departments
            .iter()
            .find(|d| text.contains(d.as_str()))
            .map(String::as_str)
    }
}
