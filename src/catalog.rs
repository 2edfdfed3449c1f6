//! Indicator catalog: code → aggregation method, weight reference, unit, description.
//!
//! The catalog is validated once at load time so that every code it enumerates,
//! and every `weight_by` reference, resolves. Lookups afterwards are total for
//! enumerated codes.
//!
//! ### Example
//! ```
//! use wbi_agg::catalog::IndicatorCatalog;
//! use wbi_agg::models::Aggregation;
//!
//! let catalog = IndicatorCatalog::builtin()?;
//! let meta = catalog.lookup("SP.POP.GROW")?;
//! assert_eq!(meta.agg, Aggregation::Weighted { weight_by: "SP.POP.TOTL".into() });
//! let weight = catalog.weight_meta("SP.POP.GROW")?.unwrap();
//! assert_eq!(weight.agg, Aggregation::Sum);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::{Entity, Error, Result};
use crate::models::{Aggregation, IndicatorMeta};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

#[derive(Debug, Deserialize)]
struct RawCatalog {
    indicators: BTreeMap<String, RawIndicator>,
    #[serde(default)]
    categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawIndicator {
    description: String,
    agg: String,
    #[serde(default)]
    weight_by: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

impl RawIndicator {
    fn into_meta(self, code: &str) -> Result<IndicatorMeta> {
        let agg = match (self.agg.trim().to_ascii_lowercase().as_str(), self.weight_by) {
            ("sum", None) => Aggregation::Sum,
            ("mean", None) => Aggregation::Mean,
            ("weighted", Some(w)) if !w.trim().is_empty() => Aggregation::Weighted {
                weight_by: w.trim().to_string(),
            },
            ("weighted", _) => {
                return Err(Error::InvalidCatalog(format!(
                    "{code}: weighted aggregation requires weight_by"
                )));
            }
            ("sum" | "mean", Some(_)) => {
                return Err(Error::InvalidCatalog(format!(
                    "{code}: weight_by is only allowed for weighted aggregation"
                )));
            }
            (other, _) => {
                return Err(Error::InvalidCatalog(format!(
                    "{code}: unknown aggregation rule '{other}'"
                )));
            }
        };
        Ok(IndicatorMeta {
            code: code.to_string(),
            description: self.description,
            source: self.source,
            unit: self.unit,
            agg,
        })
    }
}

/// Read-only registry of indicator metadata.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCatalog {
    indicators: BTreeMap<String, IndicatorMeta>,
    categories: BTreeMap<String, Vec<String>>,
}

impl IndicatorCatalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG).map_err(|e| match e.downcast::<Error>() {
            Ok(domain) => domain,
            Err(other) => Error::InvalidCatalog(other.to_string()),
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load catalog {}", path.display()))
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let raw: RawCatalog = serde_json::from_str(s).context("parse catalog json")?;
        let mut indicators = Vec::with_capacity(raw.indicators.len());
        for (code, entry) in raw.indicators {
            indicators.push(entry.into_meta(code.trim())?);
        }
        Ok(Self::new(indicators, raw.categories)?)
    }

    /// Build a catalog from parsed entries, checking every weight and category reference.
    pub fn new(
        indicators: impl IntoIterator<Item = IndicatorMeta>,
        categories: BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for meta in indicators {
            if meta.code.is_empty() {
                return Err(Error::InvalidCatalog("empty indicator code".into()));
            }
            if let Some(prev) = map.insert(meta.code.clone(), meta) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate indicator code '{}'",
                    prev.code
                )));
            }
        }

        for meta in map.values() {
            if let Some(w) = meta.agg.weight_by() {
                if w == meta.code {
                    return Err(Error::InvalidCatalog(format!(
                        "{}: indicator cannot be weighted by itself",
                        meta.code
                    )));
                }
                if !map.contains_key(w) {
                    return Err(Error::InvalidCatalog(format!(
                        "{}: weight_by references unknown indicator '{}'",
                        meta.code, w
                    )));
                }
            }
        }

        for (name, codes) in &categories {
            if let Some(missing) = codes.iter().find(|c| !map.contains_key(c.as_str())) {
                return Err(Error::InvalidCatalog(format!(
                    "category '{name}' references unknown indicator '{missing}'"
                )));
            }
        }

        Ok(Self {
            indicators: map,
            categories,
        })
    }

    pub fn lookup(&self, code: &str) -> Result<&IndicatorMeta> {
        self.indicators
            .get(code.trim())
            .ok_or_else(|| Error::not_found(Entity::Indicator, code.trim()))
    }

    /// Metadata of the indicator `code` is weighted by; `Ok(None)` for sum/mean indicators.
    pub fn weight_meta(&self, code: &str) -> Result<Option<&IndicatorMeta>> {
        match self.lookup(code)?.agg.weight_by() {
            Some(w) => self
                .indicators
                .get(w)
                .map(Some)
                .ok_or_else(|| Error::not_found(Entity::WeightIndicator, w)),
            None => Ok(None),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorMeta> {
        self.indicators.values()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Indicators of a category in their configured order.
    pub fn category(&self, name: &str) -> Option<Vec<&IndicatorMeta>> {
        let codes = self
            .categories
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name.trim()))
            .map(|(_, v)| v)?;
        Some(
            codes
                .iter()
                .filter_map(|c| self.indicators.get(c))
                .collect(),
        )
    }
}
