//! Group aggregation engine.
//!
//! Collapses per-country, per-year observations of one indicator into a single
//! series per requested group, using the method the catalog assigns to the
//! indicator:
//!
//! - **Sum**: `V(t) = Σ v_i(t)` over members with a value in `t`.
//! - **Mean**: `V(t) = Σ v_i(t) / n(t)`, `n(t)` = members with a value in `t`.
//! - **Weighted**: `V(t) = Σ v_i(t)·w_i(t) / Σ w_i(t)` over members with both a
//!   value and a weight in `t`. A zero weight is a weight, not a gap.
//!
//! Candidate years are the union of the years in which any member reports a
//! value. A year nobody can contribute to is omitted from the output rather
//! than emitted as zero.
//!
//! Each group reads its observations through
//! [`ObservationLookup::group_observations`], so its series does not depend on
//! which other groups share the query. A sum that overflows to infinity is
//! dropped like any other year without a value.
//!
//! ### Example
//! ```
//! use wbi_agg::catalog::IndicatorCatalog;
//! use wbi_agg::engine::{AggregateQuery, Engine};
//! use wbi_agg::membership::{Group, GroupMembership, Member};
//! use wbi_agg::models::Observation;
//! use wbi_agg::observations::ObservationStore;
//!
//! let catalog = IndicatorCatalog::builtin()?;
//! let groups = GroupMembership::from_groups([Group::new(
//!     "duo",
//!     vec![Member::new("AAA", "Alpha"), Member::new("BBB", "Beta")],
//! )])?;
//! let store = ObservationStore::new().with_indicator(
//!     "SP.POP.TOTL",
//!     [
//!         Observation::new("AAA", 2020, Some(10.0)),
//!         Observation::new("AAA", 2021, Some(12.0)),
//!         Observation::new("BBB", 2020, Some(5.0)),
//!     ],
//! );
//!
//! let out = Engine::new(&catalog, &groups)
//!     .aggregate(&AggregateQuery::new("SP.POP.TOTL", ["duo"]), &store)?;
//! let values: Vec<f64> = out.group_series["duo"].points.iter().map(|p| p.value).collect();
//! assert_eq!(values, vec![15.0, 12.0]);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::catalog::IndicatorCatalog;
use crate::error::{Error, Result};
use crate::membership::{Group, GroupMembership, Member};
use crate::models::{Aggregation, SeriesPoint};
use crate::observations::{ObservationLookup, ObservationSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A fully specified request: one indicator, an ordered list of groups and an
/// optional focus country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub indicator_code: String,
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub focus_country: Option<String>,
}

impl AggregateQuery {
    pub fn new<I, S>(indicator_code: impl Into<String>, group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indicator_code: indicator_code.into(),
            group_ids: group_ids.into_iter().map(Into::into).collect(),
            focus_country: None,
        }
    }

    pub fn with_focus(mut self, country_code: impl Into<String>) -> Self {
        self.focus_country = Some(country_code.into());
        self
    }
}

/// Aggregated series of one group, ascending by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeries {
    pub group_id: String,
    pub points: Vec<SeriesPoint>,
}

impl GroupSeries {
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.iter().map(|p| p.year)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Raw values of one member, positionally aligned to [`CountryDetailSeries::years`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSeries {
    pub code: String,
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Per-member breakdown of the first requested group containing the focus country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDetailSeries {
    /// Group id as given in the query.
    pub group_id: String,
    /// Display label of the group (acronym, else id).
    pub group_label: String,
    pub focus: Member,
    /// Year axis of the group's aggregated series.
    pub years: Vec<i32>,
    /// Every member in membership order, the focus country included.
    pub members: Vec<MemberSeries>,
    /// The focus country's own present observations.
    pub focus_points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub indicator_code: String,
    pub aggregation: Aggregation,
    /// Keyed by group id as given in the query.
    pub group_series: BTreeMap<String, GroupSeries>,
    pub country_detail: Option<CountryDetailSeries>,
}

impl EngineOutput {
    /// True when no group produced a single point.
    pub fn is_empty(&self) -> bool {
        self.group_series.values().all(GroupSeries::is_empty)
    }
}

/// Aggregation method with its weight observations resolved.
enum Method<'a> {
    Sum,
    Mean,
    Weighted(&'a ObservationSet),
}

/// Stateless engine over a catalog and a membership registry.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    catalog: &'a IndicatorCatalog,
    membership: &'a GroupMembership,
}

impl<'a> Engine<'a> {
    pub fn new(catalog: &'a IndicatorCatalog, membership: &'a GroupMembership) -> Self {
        Self {
            catalog,
            membership,
        }
    }

    /// Compute one series per requested group, plus the focus-country detail.
    ///
    /// ### Errors
    /// - `NotFound` for an unknown indicator, group or weight indicator
    /// - `EmptyQuery` when no group id is given
    ///
    /// Missing observations are never an error: they yield empty series.
    pub fn aggregate<L>(&self, query: &AggregateQuery, observations: &L) -> Result<EngineOutput>
    where
        L: ObservationLookup + ?Sized,
    {
        let meta = self.catalog.lookup(&query.indicator_code)?;
        let weight_meta = self.catalog.weight_meta(&meta.code)?;

        // Resolve every group before computing anything.
        let mut seen = BTreeSet::new();
        let mut groups: Vec<(&str, &Group)> = Vec::with_capacity(query.group_ids.len());
        for id in &query.group_ids {
            let group = self.membership.group(id)?;
            if seen.insert(group.id.as_str()) {
                groups.push((id.trim(), group));
            } else {
                log::debug!("group '{}' requested more than once, keeping first", id);
            }
        }
        if groups.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let weight_code = match (&meta.agg, weight_meta) {
            (Aggregation::Weighted { .. }, Some(w)) => Some(w.code.as_str()),
            (Aggregation::Weighted { weight_by }, None) => {
                return Err(Error::not_found(
                    crate::error::Entity::WeightIndicator,
                    weight_by.as_str(),
                ));
            }
            _ => None,
        };

        // Each group is aggregated from its own observations only.
        let empty = ObservationSet::new();
        let resolve = |code: &str, group: &Group| {
            observations
                .group_observations(code, &group.id)
                .unwrap_or(&empty)
        };

        let mut group_series = BTreeMap::new();
        let mut group_values = Vec::with_capacity(groups.len());
        for (id, group) in &groups {
            let values = resolve(&meta.code, group);
            let method = match (&meta.agg, weight_code) {
                (Aggregation::Weighted { .. }, Some(w)) => Method::Weighted(resolve(w, group)),
                (Aggregation::Mean, _) => Method::Mean,
                _ => Method::Sum,
            };
            let points = aggregate_members(&method, &group.members, values);
            log::debug!(
                "{} [{}] group '{}': {} members, {} years",
                meta.code,
                meta.agg.name(),
                id,
                group.members.len(),
                points.len()
            );
            group_series.insert(
                id.to_string(),
                GroupSeries {
                    group_id: id.to_string(),
                    points,
                },
            );
            group_values.push(values);
        }

        let country_detail = query
            .focus_country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .and_then(|focus| {
                let i = groups.iter().position(|(_, g)| g.contains(focus))?;
                let (id, group) = groups[i];
                let series = group_series.get(id)?;
                Some(country_detail(id, group, focus, series, group_values[i]))
            });
        if country_detail.is_none() {
            if let Some(focus) = &query.focus_country {
                log::debug!("focus country '{}' is not in any requested group", focus);
            }
        }

        Ok(EngineOutput {
            indicator_code: meta.code.clone(),
            aggregation: meta.agg.clone(),
            group_series,
            country_detail,
        })
    }
}

/// Convenience wrapper around [`Engine::aggregate`].
pub fn aggregate<L>(
    catalog: &IndicatorCatalog,
    membership: &GroupMembership,
    query: &AggregateQuery,
    observations: &L,
) -> Result<EngineOutput>
where
    L: ObservationLookup + ?Sized,
{
    Engine::new(catalog, membership).aggregate(query, observations)
}

fn aggregate_members(method: &Method<'_>, members: &[Member], values: &ObservationSet) -> Vec<SeriesPoint> {
    let years: BTreeSet<i32> = members
        .iter()
        .flat_map(|m| values.present_years(&m.code))
        .collect();

    years
        .into_iter()
        .filter_map(|year| {
            let present = members.iter().filter_map(|m| {
                values.value(&m.code, year).map(|v| (m.code.as_str(), v))
            });
            let value = match method {
                Method::Sum => {
                    let (n, sum) = present.fold((0usize, 0.0), |(n, s), (_, v)| (n + 1, s + v));
                    (n > 0).then_some(sum)
                }
                Method::Mean => {
                    let (n, sum) = present.fold((0usize, 0.0), |(n, s), (_, v)| (n + 1, s + v));
                    (n > 0).then(|| sum / n as f64)
                }
                Method::Weighted(weights) => {
                    let (num, den) = present
                        .filter_map(|(code, v)| weights.value(code, year).map(|w| (v, w)))
                        .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));
                    (den != 0.0).then(|| num / den)
                }
            };
            match value {
                Some(value) if value.is_finite() => Some(SeriesPoint { year, value }),
                Some(value) => {
                    log::warn!("year {} omitted: aggregate is not finite ({})", year, value);
                    None
                }
                None => {
                    log::trace!("year {} omitted: no contributing members", year);
                    None
                }
            }
        })
        .collect()
}

fn country_detail(
    group_id: &str,
    group: &Group,
    focus: &str,
    series: &GroupSeries,
    values: &ObservationSet,
) -> CountryDetailSeries {
    let years: Vec<i32> = series.years().collect();
    let members = group
        .members
        .iter()
        .map(|m| MemberSeries {
            code: m.code.clone(),
            name: m.name.clone(),
            values: years.iter().map(|&y| values.value(&m.code, y)).collect(),
        })
        .collect();
    let focus = group
        .members
        .iter()
        .find(|m| m.code.eq_ignore_ascii_case(focus))
        .cloned()
        .unwrap_or_else(|| Member::new(focus, focus));
    let focus_points = values
        .present_points(&focus.code)
        .map(|(year, value)| SeriesPoint { year, value })
        .collect();
    CountryDetailSeries {
        group_id: group_id.to_string(),
        group_label: group.label().to_string(),
        focus,
        years,
        members,
        focus_points,
    }
}
