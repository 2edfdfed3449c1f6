//! Observation source backed by cached **World Bank Indicators API (v2)** responses.
//!
//! Responses are expected on disk, one file per indicator and group:
//! `<indicators_dir>/<CODE>_<group>.json`, each holding the raw API payload
//! `[Meta, [Entry, ...]]`. Downloading and refreshing these files is the job of
//! whatever populated the cache; this module only reads them.
//!
//! ### Notes
//! - A missing file means "no data" for that indicator and group, not an error.
//! - A payload whose second element is `null` (the API's empty answer) yields no rows.
//! - An API error payload (`[{"message": ...}]`) is surfaced as an error.
//!
//! Typical usage:
//! ```no_run
//! # use wbi_agg::{cache, AggregateQuery, IndicatorCatalog};
//! let catalog = IndicatorCatalog::builtin()?;
//! let query = AggregateQuery::new("SP.POP.GROW", ["lldcs"]);
//! let store = cache::load_store("cache/indicators", &catalog, &query)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::catalog::IndicatorCatalog;
use crate::engine::AggregateQuery;
use crate::models::{Entry, Meta, Observation};
use crate::observations::ObservationStore;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Cache file path for an indicator/group pair.
pub fn cache_path<P: AsRef<Path>>(indicators_dir: P, indicator_code: &str, group_id: &str) -> PathBuf {
    indicators_dir.as_ref().join(format!(
        "{}_{}.json",
        indicator_code.trim(),
        group_id.trim().to_ascii_lowercase()
    ))
}

/// Parse one cached API payload into observations.
///
/// Rows whose date is not a plain year are skipped.
pub fn parse_response(text: &str) -> Result<Vec<Observation>> {
    let v: Value = serde_json::from_str(text).context("decode json")?;

    // The API returns an array: [Meta, [Entry, ...]] or a "message" object in position 0 on error.
    let arr = v
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("unexpected response shape: not a top-level array"))?;
    if arr.is_empty() {
        bail!("unexpected response: empty array");
    }
    if arr[0].get("message").is_some() {
        bail!("world bank api error: {}", arr[0]);
    }

    let meta: Meta = serde_json::from_value(arr[0].clone()).context("parse meta")?;
    let entries: Vec<Entry> = match arr.get(1) {
        Some(Value::Null) | None => vec![],
        Some(rows) => serde_json::from_value(rows.clone()).context("parse entries")?,
    };
    if entries.len() < meta.total as usize && meta.pages > 1 {
        log::warn!(
            "cached response holds {} of {} rows ({} pages); later pages were not cached",
            entries.len(),
            meta.total,
            meta.pages
        );
    }

    let rows = entries.len();
    let out: Vec<Observation> = entries
        .into_iter()
        .filter_map(Entry::into_observation)
        .collect();
    if out.len() < rows {
        log::debug!("skipped {} rows without a plain year", rows - out.len());
    }
    Ok(out)
}

/// Read one cache file. `Ok(None)` when the file does not exist.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Option<Vec<Observation>>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_response(&text)
        .with_context(|| format!("parse {}", path.display()))
        .map(Some)
}

/// Resolve every observation a query needs: the indicator itself and, for
/// weighted indicators, its weight indicator, for each requested group.
///
/// Rows are kept per group: a country listed in two groups takes its values
/// from each group's own file.
///
/// Unknown indicator codes are reported by the catalog; unknown groups are left
/// for the engine to report.
pub fn load_store<P: AsRef<Path>>(
    indicators_dir: P,
    catalog: &IndicatorCatalog,
    query: &AggregateQuery,
) -> Result<ObservationStore> {
    let dir = indicators_dir.as_ref();
    let meta = catalog.lookup(&query.indicator_code)?;
    let mut codes = vec![meta.code.as_str()];
    if let Some(w) = catalog.weight_meta(&meta.code)? {
        codes.push(w.code.as_str());
    }

    let groups: BTreeSet<String> = query
        .group_ids
        .iter()
        .map(|g| g.trim().to_ascii_lowercase())
        .collect();

    let mut store = ObservationStore::new();
    for code in codes {
        for group in &groups {
            let path = cache_path(dir, code, group);
            // A missing file still registers the pair as "no data".
            let rows = match load_file(&path)? {
                Some(rows) => {
                    log::debug!("{}: {} rows", path.display(), rows.len());
                    rows
                }
                None => {
                    log::warn!("no cached data for {} in group '{}'", code, group);
                    Vec::new()
                }
            };
            store.extend_group(code, group, rows);
        }
    }
    Ok(store)
}
