use serde::{Deserialize, Serialize};
use std::fmt;

/// How member-country values collapse into one group value per year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "agg", rename_all = "lowercase")]
pub enum Aggregation {
    /// Plain sum over members reporting a value.
    Sum,
    /// Unweighted mean over members reporting a value.
    Mean,
    /// Mean weighted by another indicator, over members reporting both.
    Weighted { weight_by: String },
}

impl Aggregation {
    pub fn weight_by(&self) -> Option<&str> {
        match self {
            Aggregation::Weighted { weight_by } => Some(weight_by),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Weighted { .. } => "weighted",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Weighted { weight_by } => write!(f, "weighted by {}", weight_by),
            other => f.write_str(other.name()),
        }
    }
}

/// Catalog entry for one indicator code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMeta {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(flatten)]
    pub agg: Aggregation,
}

impl IndicatorMeta {
    /// Explicit unit, or the trailing parenthesised part of the description.
    pub fn unit(&self) -> Option<String> {
        match self.unit.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => Some(u.to_string()),
            _ => extract_unit_from_description(&self.description),
        }
    }
}

/// Try to extract a unit from the description, e.g. "GDP (current US$)" -> "current US$".
pub fn extract_unit_from_description(name: &str) -> Option<String> {
    let open = name.rfind('(')?;
    let close = name.rfind(')')?;
    if close > open {
        let inner = name[open + 1..close].trim();
        if !inner.is_empty() {
            Some(inner.to_string())
        } else {
            None
        }
    } else {
        None
    }
}

/// Metadata section of a cached World Bank response (position 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub page: u32,
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    /// Accept both and normalize to `u32`.
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    pub total: u32,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(|_| E::custom("value out of range for u32"))
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeName {
    pub id: String,
    pub value: String,
}

/// Raw record of a cached World Bank response (position 1 array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub indicator: CodeName,
    pub country: CodeName,
    pub countryiso3code: String,
    pub date: String,
    pub value: Option<f64>,
}

impl Entry {
    /// Country code used for membership matching: ISO3 when the record carries
    /// one, otherwise the API's own country id.
    pub fn country_code(&self) -> &str {
        let iso3 = self.countryiso3code.trim();
        if iso3.is_empty() {
            self.country.id.trim()
        } else {
            iso3
        }
    }

    /// `None` when the date is not a plain year (e.g. "2020Q1").
    pub fn into_observation(self) -> Option<Observation> {
        let year = self.date.trim().parse::<i32>().ok()?;
        Some(Observation::new(self.country_code(), year, self.value))
    }
}

/// One (country, year) value of a single indicator. `value == None` means no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country_code: String,
    pub year: i32,
    pub value: Option<f64>,
}

impl Observation {
    /// Non-finite values are stored as absent.
    pub fn new(country_code: impl Into<String>, year: i32, value: Option<f64>) -> Self {
        Self {
            country_code: country_code.into().to_ascii_uppercase(),
            year,
            value: value.filter(|v| v.is_finite()),
        }
    }
}

/// A single computed (year, value) pair of an output series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}
