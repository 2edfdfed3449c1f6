//! Reshape engine output into the payload consumed by the presentation layer.
//!
//! ```json
//! {
//!   "lldcs": { "dates": ["2020", "2021"], "values": [15.0, 12.0] },
//!   "Bolivia": { "dates": ["2020"], "values": [5.0] },
//!   "_countryData": {
//!     "group": "lldcs",
//!     "dates": ["2020", "2021"],
//!     "countries": [ { "name": "Bolivia", "id": "BOL", "values": [5.0, null] } ]
//!   }
//! }
//! ```
//!
//! No numeric work happens here; omitted years stay omitted.

use crate::engine::{CountryDetailSeries, EngineOutput, GroupSeries};
use crate::models::SeriesPoint;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub const COUNTRY_DATA_KEY: &str = "_countryData";

/// One chart series: dates and values aligned by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    fn from_points(points: &[SeriesPoint]) -> Self {
        Self {
            dates: points.iter().map(|p| p.year.to_string()).collect(),
            values: points.iter().map(|p| p.value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Last (date, value) pair.
    pub fn latest(&self) -> Option<(&str, f64)> {
        Some((self.dates.last()?.as_str(), *self.values.last()?))
    }

    pub fn value_at(&self, date: &str) -> Option<f64> {
        self.dates
            .iter()
            .position(|d| d == date)
            .and_then(|i| self.values.get(i).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryColumn {
    pub name: String,
    pub id: String,
    /// `null` for a missing year, keeping columns aligned with `dates`.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryData {
    pub group: String,
    /// Group label for exports; not part of the payload.
    #[serde(skip)]
    pub label: Option<String>,
    pub dates: Vec<String>,
    pub countries: Vec<CountryColumn>,
}

impl From<&CountryDetailSeries> for CountryData {
    fn from(d: &CountryDetailSeries) -> Self {
        Self {
            group: d.group_id.clone(),
            label: Some(d.group_label.clone()),
            dates: d.years.iter().map(i32::to_string).collect(),
            countries: d
                .members
                .iter()
                .map(|m| CountryColumn {
                    name: m.name.clone(),
                    id: m.code.clone(),
                    values: m.values.clone(),
                })
                .collect(),
        }
    }
}

/// Ordered series map plus the optional country block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputPayload {
    pub series: Vec<(String, TimeSeries)>,
    pub country_data: Option<CountryData>,
    /// Key of the focus country's own series, when one was emitted.
    pub focus_key: Option<String>,
}

impl OutputPayload {
    pub fn get(&self, key: &str) -> Option<&TimeSeries> {
        self.series.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(k, _)| k.as_str())
    }

    /// True when every series is empty ("no data available", not an error).
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|(_, s)| s.is_empty())
    }
}

impl Serialize for OutputPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.series.len() + usize::from(self.country_data.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, series) in &self.series {
            map.serialize_entry(key, series)?;
        }
        if let Some(cd) = &self.country_data {
            map.serialize_entry(COUNTRY_DATA_KEY, cd)?;
        }
        map.end()
    }
}

/// Flatten engine output: group series in `group_id_order`, then the focus
/// country's own series under its display name, then `_countryData`.
pub fn assemble<S: AsRef<str>>(output: &EngineOutput, group_id_order: &[S]) -> OutputPayload {
    let mut series: Vec<(String, TimeSeries)> = Vec::with_capacity(group_id_order.len() + 1);
    for id in group_id_order {
        let id = id.as_ref().trim();
        if series.iter().any(|(k, _)| k == id) {
            continue;
        }
        match output.group_series.get(id) {
            Some(GroupSeries { points, .. }) => {
                series.push((id.to_string(), TimeSeries::from_points(points)))
            }
            None => log::debug!("no series for group '{}' in engine output", id),
        }
    }

    let mut focus_key = None;
    let country_data = output.country_detail.as_ref().map(|detail| {
        let key = detail.focus.name.clone();
        if series.iter().any(|(k, _)| *k == key) {
            log::warn!(
                "country series '{}' collides with a group key; keeping the group series",
                key
            );
        } else {
            series.push((key.clone(), TimeSeries::from_points(&detail.focus_points)));
            focus_key = Some(key);
        }
        CountryData::from(detail)
    });

    OutputPayload {
        series,
        country_data,
        focus_key,
    }
}
