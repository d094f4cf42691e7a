//! Indicator catalog and entity directory
//!
//! Maps the labels shown on the parameter picker to World Bank indicator
//! codes, and entity ids to display names. Loaded once at startup (built-in
//! or from a TOML file) and never mutated afterwards.
//!
//! # Resolution
//! 1. Exact label match
//! 2. Fuzzy match: first whitespace-delimited token of the input against the
//!    first token of every catalog label, case-insensitive, substring in either
//!    direction. First match in catalog order wins.
//! 3. Otherwise `CatalogError::ResolutionMiss`

use esg_common::events::{Category, MatchKind, ResolvedIndicatorInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::error::CatalogError;

/// One catalog row: parameter label → indicator code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMapping {
    pub category: Category,
    pub label: String,
    pub code: String,
}

/// A selectable entity (country)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical code (ISO 3166-1 alpha-3 for countries)
    pub id: String,
    pub display_name: String,
}

/// TOML catalog file layout
///
/// Entity rows may carry `lat`/`lon` for the map; they are ignored here.
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "indicator")]
    indicators: Vec<IndicatorMapping>,
    #[serde(default, rename = "entity")]
    entities: Vec<Entity>,
}

/// Static indicator catalog plus entity directory
#[derive(Debug, Clone)]
pub struct IndicatorCatalog {
    mappings: Vec<IndicatorMapping>,
    /// Label → index of its first row
    exact: HashMap<String, usize>,
    /// First token (lowercased) of every row, in catalog order
    first_tokens: Vec<String>,
    entities: Vec<Entity>,
    entity_index: HashMap<String, usize>,
}

const BUILTIN_INDICATORS: &[(Category, &str, &str)] = &[
    (Category::Environmental, "CO2 Emissions per Capita", "EN.ATM.CO2E.PC"),
    (Category::Environmental, "Forest Area (% of land)", "AG.LND.FRST.ZS"),
    (Category::Environmental, "Energy Use per Capita", "EG.USE.PCAP.KG.OE"),
    (Category::Environmental, "Renewable Energy (%)", "EG.FEC.RNEW.ZS"),
    (Category::Social, "Literacy Rate (%)", "SE.ADT.LITR.ZS"),
    (Category::Social, "Life Expectancy", "SP.DYN.LE00.IN"),
    (Category::Social, "Education Index", "SE.SEC.NENR"),
    (Category::Social, "Gender Equality Index", "SG.GEN.PARL.ZS"),
    (Category::Governance, "Control of Corruption", "CC.EST"),
    (Category::Governance, "Government Effectiveness", "GE.EST"),
    (Category::Governance, "Rule of Law", "RL.EST"),
    (Category::Governance, "Voice & Accountability", "VA.EST"),
    // Common variations for fallback matching
    (Category::Social, "Access to Electricity", "EG.ELC.ACCS.ZS"),
    (Category::Social, "Hospital Beds", "SH.MED.BEDS.ZS"),
    (Category::Environmental, "PM2.5 Air Pollution", "EN.ATM.PM25.MC.M3"),
    (Category::Governance, "Political Stability", "PV.EST"),
];

const BUILTIN_ENTITIES: &[(&str, &str)] = &[
    ("USA", "United States"),
    ("CAN", "Canada"),
    ("MEX", "Mexico"),
    ("BRA", "Brazil"),
    ("GBR", "United Kingdom"),
    ("FRA", "France"),
    ("DEU", "Germany"),
    ("NLD", "Netherlands"),
    ("CHE", "Switzerland"),
    ("SWE", "Sweden"),
    ("NOR", "Norway"),
    ("RUS", "Russia"),
    ("CHN", "China"),
    ("JPN", "Japan"),
    ("KOR", "South Korea"),
    ("IND", "India"),
    ("IDN", "Indonesia"),
    ("AUS", "Australia"),
];

fn first_token(label: &str) -> Option<String> {
    label.split_whitespace().next().map(str::to_lowercase)
}

impl IndicatorCatalog {
    /// Build a catalog from rows
    ///
    /// Fails on a label repeated within one category. Rows keep their order,
    /// which is the fuzzy-match tie-break.
    pub fn new(
        mappings: Vec<IndicatorMapping>,
        entities: Vec<Entity>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for mapping in &mappings {
            if !seen.insert((mapping.category, mapping.label.as_str())) {
                return Err(CatalogError::DuplicateLabel {
                    label: mapping.label.clone(),
                    category: mapping.category.to_string(),
                });
            }
        }

        let mut exact = HashMap::with_capacity(mappings.len());
        for (idx, mapping) in mappings.iter().enumerate() {
            exact.entry(mapping.label.clone()).or_insert(idx);
        }

        let first_tokens = mappings
            .iter()
            .map(|m| first_token(&m.label).unwrap_or_default())
            .collect();

        let mut entity_index = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter().enumerate() {
            entity_index.entry(entity.id.clone()).or_insert(idx);
        }

        Ok(Self {
            mappings,
            exact,
            first_tokens,
            entities,
            entity_index,
        })
    }

    /// Built-in World Bank catalog
    pub fn builtin() -> Self {
        let mappings = BUILTIN_INDICATORS
            .iter()
            .map(|&(category, label, code)| IndicatorMapping {
                category,
                label: label.to_string(),
                code: code.to_string(),
            })
            .collect();
        let entities = BUILTIN_ENTITIES
            .iter()
            .map(|&(id, name)| Entity {
                id: id.to_string(),
                display_name: name.to_string(),
            })
            .collect();

        // Built-in rows are unique per category
        Self::new(mappings, entities).unwrap_or_else(|e| unreachable!("builtin catalog: {}", e))
    }

    /// Parse a TOML catalog document
    ///
    /// An empty `[[entity]]` list falls back to the built-in entity directory.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::Load(e.to_string()))?;

        let entities = if file.entities.is_empty() {
            Self::builtin().entities
        } else {
            file.entities
        };

        Self::new(file.indicators, entities)
    }

    /// Load a TOML catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Load(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            indicators = catalog.mappings.len(),
            entities = catalog.entities.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Resolve a parameter label to its indicator
    pub fn resolve(&self, label: &str) -> Result<ResolvedIndicatorInfo, CatalogError> {
        if let Some(&idx) = self.exact.get(label) {
            return Ok(self.resolved(label, idx, MatchKind::Exact));
        }

        let input_token = first_token(label)
            .ok_or_else(|| CatalogError::ResolutionMiss(label.to_string()))?;

        let fuzzy = self.first_tokens.iter().position(|catalog_token| {
            !catalog_token.is_empty()
                && (input_token.contains(catalog_token.as_str())
                    || catalog_token.contains(input_token.as_str()))
        });

        match fuzzy {
            Some(idx) => {
                debug!(
                    label,
                    matched = %self.mappings[idx].label,
                    code = %self.mappings[idx].code,
                    "Fuzzy indicator match"
                );
                Ok(self.resolved(label, idx, MatchKind::Fuzzy))
            }
            None => Err(CatalogError::ResolutionMiss(label.to_string())),
        }
    }

    fn resolved(&self, label: &str, idx: usize, match_kind: MatchKind) -> ResolvedIndicatorInfo {
        let mapping = &self.mappings[idx];
        ResolvedIndicatorInfo {
            label: label.to_string(),
            code: mapping.code.clone(),
            category: mapping.category,
            match_kind,
            matched_label: mapping.label.clone(),
        }
    }

    /// Category of the first row carrying `code`
    pub fn category_of(&self, code: &str) -> Option<Category> {
        self.mappings
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.category)
    }

    pub fn mappings(&self) -> &[IndicatorMapping] {
        &self.mappings
    }

    /// Catalog rows grouped by category, catalog order within each group
    pub fn parameters_by_category(&self) -> BTreeMap<Category, Vec<IndicatorMapping>> {
        let mut grouped: BTreeMap<Category, Vec<IndicatorMapping>> =
            Category::ALL.iter().map(|&c| (c, Vec::new())).collect();
        for mapping in &self.mappings {
            grouped.entry(mapping.category).or_default().push(mapping.clone());
        }
        grouped
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entity_index.get(id).map(|&idx| &self.entities[idx])
    }

    /// Display name of an entity; unknown ids display as themselves
    pub fn display_name(&self, id: &str) -> String {
        self.entity(id)
            .map(|e| e.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl Default for IndicatorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
