//! Plain-text explanation of how an indicator is aggregated.

use crate::catalog::IndicatorCatalog;
use crate::error::Result;
use crate::models::{Aggregation, IndicatorMeta};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Methodology {
    pub code: String,
    pub description: String,
    pub source: Option<String>,
    pub unit: Option<String>,
    pub method: &'static str,
    pub summary: &'static str,
    pub formula: &'static str,
    pub missing_data: &'static str,
    /// (code, description) of the weight indicator for weighted aggregation.
    pub weight: Option<(String, String)>,
}

/// Describe the aggregation of `code`, resolving its weight indicator if any.
pub fn describe(code: &str, catalog: &IndicatorCatalog) -> Result<Methodology> {
    let meta = catalog.lookup(code)?;
    let weight = catalog
        .weight_meta(code)?
        .map(|w| (w.code.clone(), w.description.clone()));
    Ok(build(meta, weight))
}

fn build(meta: &IndicatorMeta, weight: Option<(String, String)>) -> Methodology {
    let (method, summary, formula, missing_data) = match meta.agg {
        Aggregation::Sum => (
            "Sum",
            "Arithmetic sum of all member-country values for each year.",
            "V(t) = sum_i v_i(t)",
            "Countries without a value in a year are left out of that year's sum. \
             Years in which no member reports are omitted, never shown as zero.",
        ),
        Aggregation::Mean => (
            "Simple average (unweighted mean)",
            "Arithmetic mean across member countries with data for each year; \
             every country counts equally.",
            "V(t) = sum_i v_i(t) / n(t)",
            "n(t) counts only the members reporting in year t, so the denominator \
             varies by year. Years in which no member reports are omitted.",
        ),
        Aggregation::Weighted { .. } => (
            "Weighted average",
            "Mean of member values, each weighted by the member's weight indicator value.",
            "V(t) = sum_i (v_i(t) * w_i(t)) / sum_i w_i(t)",
            "A country-year counts only when both the value and the weight are \
             available; a zero weight counts with zero influence. Years whose total \
             weight is zero are omitted.",
        ),
    };
    Methodology {
        code: meta.code.clone(),
        description: meta.description.clone(),
        source: meta.source.clone(),
        unit: meta.unit(),
        method,
        summary,
        formula,
        missing_data,
        weight,
    }
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.description, self.code)?;
        if let Some(source) = &self.source {
            writeln!(f, "Source:       {}", source)?;
        }
        if let Some(unit) = &self.unit {
            writeln!(f, "Unit:         {}", unit)?;
        }
        writeln!(f, "Aggregation:  {} - {}", self.method, self.summary)?;
        writeln!(f, "Formula:      {}", self.formula)?;
        if let Some((code, desc)) = &self.weight {
            writeln!(f, "Weight:       {} [{}]", desc, code)?;
        }
        write!(f, "Missing data: {}", self.missing_data)
    }
}
