//! In-memory observation sets handed to the engine.
//!
//! The engine never performs I/O: callers resolve raw observations first (see
//! [`crate::cache`]) and pass them in through [`ObservationLookup`].

use crate::models::Observation;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// All (country, year) values of one indicator.
///
/// A year stored with `None` is an explicit "no data" record; it never
/// contributes to any aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    by_country: BTreeMap<String, BTreeMap<i32, Option<f64>>>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one observation. A repeated (country, year) pair replaces the
    /// earlier value, except that an absent value never overwrites a present one.
    ///
    /// Country codes are upper-cased and non-finite values stored as absent,
    /// however the observation was built.
    pub fn insert(&mut self, obs: Observation) {
        let obs = Observation::new(obs.country_code.trim(), obs.year, obs.value);
        let years = self.by_country.entry(obs.country_code.clone()).or_default();
        match years.get(&obs.year).copied() {
            Some(Some(prev)) if obs.value.is_none() => {
                log::debug!(
                    "ignoring empty duplicate for {} {} (kept {})",
                    obs.country_code,
                    obs.year,
                    prev
                );
            }
            // Overlapping groups repeat the same rows.
            Some(Some(prev)) if obs.value == Some(prev) => {}
            Some(Some(prev)) => {
                log::warn!(
                    "duplicate observation for {} {}: {} replaced by {:?}",
                    obs.country_code,
                    obs.year,
                    prev,
                    obs.value
                );
                years.insert(obs.year, obs.value);
            }
            _ => {
                years.insert(obs.year, obs.value);
            }
        }
    }

    /// Present value for a country/year; `None` when absent or unrecorded.
    pub fn value(&self, country_code: &str, year: i32) -> Option<f64> {
        self.by_country
            .get(country_code)
            .and_then(|years| years.get(&year).copied().flatten())
    }

    /// Years with a present value for a country, ascending.
    pub fn present_years<'a>(&'a self, country_code: &str) -> impl Iterator<Item = i32> + 'a {
        self.by_country
            .get(country_code)
            .into_iter()
            .flat_map(|years| years.iter().filter(|(_, v)| v.is_some()).map(|(y, _)| *y))
    }

    /// Present (year, value) pairs for a country, ascending by year.
    pub fn present_points<'a>(
        &'a self,
        country_code: &str,
    ) -> impl Iterator<Item = (i32, f64)> + 'a {
        self.by_country
            .get(country_code)
            .into_iter()
            .flat_map(|years| years.iter().filter_map(|(y, v)| v.map(|v| (*y, v))))
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.by_country.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_country.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Observation> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut set = ObservationSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Observation> for ObservationSet {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        for obs in iter {
            self.insert(obs);
        }
    }
}

/// Per-indicator access to pre-resolved observations.
pub trait ObservationLookup {
    /// `None` when nothing is known about the indicator; treated as "no data".
    fn observations(&self, indicator_code: &str) -> Option<&ObservationSet>;

    /// Observations of an indicator as reported for one group. The engine
    /// aggregates each group from this view only.
    ///
    /// Sources without per-group data fall back to the indicator-wide set.
    fn group_observations(&self, indicator_code: &str, _group_id: &str) -> Option<&ObservationSet> {
        self.observations(indicator_code)
    }
}

/// Immutable snapshot of observations for several indicators.
///
/// Observations added with [`ObservationStore::extend_group`] are also kept per
/// (indicator, group), so that a group never sees values read for another group.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    sets: AHashMap<String, ObservationSet>,
    by_group: AHashMap<String, AHashMap<String, ObservationSet>>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add observations for an indicator, merging with anything already stored.
    pub fn extend_indicator(
        &mut self,
        indicator_code: &str,
        observations: impl IntoIterator<Item = Observation>,
    ) {
        self.sets
            .entry(indicator_code.trim().to_string())
            .or_default()
            .extend(observations);
    }

    pub fn with_indicator(
        mut self,
        indicator_code: &str,
        observations: impl IntoIterator<Item = Observation>,
    ) -> Self {
        self.extend_indicator(indicator_code, observations);
        self
    }

    /// Add observations for an indicator as reported for one group. Registers
    /// the (indicator, group) pair even when `observations` is empty.
    pub fn extend_group(
        &mut self,
        indicator_code: &str,
        group_id: &str,
        observations: impl IntoIterator<Item = Observation>,
    ) {
        let code = indicator_code.trim();
        let rows: Vec<Observation> = observations.into_iter().collect();
        self.by_group
            .entry(code.to_string())
            .or_default()
            .entry(group_id.trim().to_ascii_lowercase())
            .or_default()
            .extend(rows.iter().cloned());
        self.extend_indicator(code, rows);
    }
}

impl ObservationLookup for ObservationStore {
    fn observations(&self, indicator_code: &str) -> Option<&ObservationSet> {
        self.sets.get(indicator_code.trim())
    }

    fn group_observations(&self, indicator_code: &str, group_id: &str) -> Option<&ObservationSet> {
        let code = indicator_code.trim();
        match self.by_group.get(code) {
            Some(groups) => groups.get(&group_id.trim().to_ascii_lowercase()),
            None => self.sets.get(code),
        }
    }
}
