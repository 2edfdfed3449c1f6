//! Metric-card statistics over an assembled payload.
//!
//! Everything here is a read of already-aggregated series; no group values are
//! recomputed.

use crate::assemble::{OutputPayload, TimeSeries};
use crate::models::Aggregation;
use serde::{Deserialize, Serialize};

/// Summary statistics for one payload series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub key: String,
    pub count: usize,
    pub first_date: Option<String>,
    pub first: Option<f64>,
    pub latest_date: Option<String>,
    pub latest: Option<f64>,
    /// Percent change first → latest; `None` when the first value is zero.
    pub change_pct: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Summarize one series.
pub fn summarize_series(key: &str, series: &TimeSeries) -> Summary {
    let first = series.dates.first().zip(series.values.first());
    let latest = series.dates.last().zip(series.values.last());
    let change_pct = match (first, latest) {
        (Some((_, &f)), Some((_, &l))) if f != 0.0 => Some((l - f) / f.abs() * 100.0),
        _ => None,
    };

    let mut vals = series.values.clone();
    vals.sort_by(|a, b| a.total_cmp(b));
    let count = vals.len();
    let min = vals.first().cloned();
    let max = vals.last().cloned();
    let mean = if count > 0 {
        Some(vals.iter().copied().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };

    Summary {
        key: key.to_string(),
        count,
        first_date: first.map(|(d, _)| d.clone()),
        first: first.map(|(_, v)| *v),
        latest_date: latest.map(|(d, _)| d.clone()),
        latest: latest.map(|(_, v)| *v),
        change_pct,
        min,
        max,
        mean,
        median,
    }
}

/// One summary per payload series, in payload order. Empty series are skipped.
pub fn summarize(payload: &OutputPayload) -> Vec<Summary> {
    payload
        .series
        .iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(k, s)| summarize_series(k, s))
        .collect()
}

/// A country's share of its group's total in one year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Share {
    pub date: String,
    pub country_value: f64,
    pub group_total: f64,
    pub percent: f64,
}

/// Share of `group` contributed by `country`, for the latest year present in both.
///
/// Years are matched exactly: a country value from 2021 is never divided by a
/// group total from 2022. `None` when the series share no year or the total is zero.
pub fn share_of_group_total(country: &TimeSeries, group: &TimeSeries) -> Option<Share> {
    country
        .dates
        .iter()
        .zip(&country.values)
        .rev()
        .find_map(|(date, &value)| {
            let total = group.value_at(date)?;
            (total != 0.0).then(|| Share {
                date: date.clone(),
                country_value: value,
                group_total: total,
                percent: value / total * 100.0,
            })
        })
}

/// "% of group total" for the focus country of a payload. Only meaningful for
/// sum-aggregated indicators; `None` otherwise.
pub fn focus_share(payload: &OutputPayload, aggregation: &Aggregation) -> Option<Share> {
    if *aggregation != Aggregation::Sum {
        return None;
    }
    let country_key = payload.focus_key.as_deref()?;
    let group_key = payload.country_data.as_ref()?.group.as_str();
    share_of_group_total(payload.get(country_key)?, payload.get(group_key)?)
}
