//! wbi_agg
//!
//! Aggregate country-level development indicators (World Bank style series)
//! into one time series per country group, and compare a single country
//! against its group. Pairs with the `wbi-agg` CLI.
//!
//! ### Features
//! - Indicator catalog with per-indicator aggregation rule (sum, mean, weighted mean)
//! - Group registry loaded from per-group JSON files
//! - Pure, stateless aggregation engine with explicit missing-data handling
//! - Chart-ready payload with an optional per-country breakdown (`_countryData`)
//! - CSV export of the breakdown, metric-card statistics, methodology text
//!
//! ### Example
//! ```no_run
//! use wbi_agg::{AggregateQuery, DataLayout};
//!
//! let layout = DataLayout::new("cache");
//! let catalog = layout.load_catalog()?;
//! let groups = layout.load_membership()?;
//! let query = AggregateQuery::new("NY.GDP.MKTP.CD", ["lldcs", "ldcs"]).with_focus("BOL");
//! let store = wbi_agg::cache::load_store(layout.indicators_dir(), &catalog, &query)?;
//! let payload = wbi_agg::run_query(&catalog, &groups, &query, &store)?;
//! println!("{}", serde_json::to_string_pretty(&payload)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod assemble;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod membership;
pub mod methodology;
pub mod models;
pub mod observations;
pub mod stats;
pub mod storage;

pub use assemble::{OutputPayload, TimeSeries, assemble};
pub use catalog::IndicatorCatalog;
pub use config::DataLayout;
pub use engine::{AggregateQuery, Engine, EngineOutput};
pub use error::{Error, Result};
pub use membership::GroupMembership;
pub use models::{Aggregation, IndicatorMeta, Observation};
pub use observations::{ObservationLookup, ObservationSet, ObservationStore};

/// Aggregate and assemble in one step, keeping the query's group order.
pub fn run_query<L>(
    catalog: &IndicatorCatalog,
    membership: &GroupMembership,
    query: &AggregateQuery,
    observations: &L,
) -> Result<OutputPayload>
where
    L: ObservationLookup + ?Sized,
{
    let output = Engine::new(catalog, membership).aggregate(query, observations)?;
    Ok(assemble(&output, &query.group_ids))
}
