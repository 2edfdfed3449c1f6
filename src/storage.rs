use crate::assemble::OutputPayload;
use anyhow::{Result, bail};
use csv::WriterBuilder;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix text cells that a spreadsheet would evaluate as a formula.
fn sanitize_cell(s: &str) -> Cow<'_, str> {
    match s.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => Cow::Owned(format!("'{}", s)),
        _ => Cow::Borrowed(s),
    }
}

fn fmt_value(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Write the `_countryData` block as CSV: one row per date, one column per
/// member, and a trailing group-total column taken from the group's series.
/// The total column is headed by the group label, falling back to the id.
///
/// Missing member values and years absent from the group series are empty cells.
pub fn write_country_csv<W: Write>(payload: &OutputPayload, writer: W) -> Result<()> {
    let Some(data) = payload.country_data.as_ref() else {
        bail!("payload has no country data");
    };
    let totals = payload.get(&data.group);

    let mut wtr = WriterBuilder::new().from_writer(writer);
    let mut header: Vec<Cow<'_, str>> = Vec::with_capacity(data.countries.len() + 2);
    header.push(Cow::Borrowed("Date"));
    header.extend(data.countries.iter().map(|c| sanitize_cell(&c.name)));
    let label = data.label.as_deref().unwrap_or(&data.group);
    header.push(Cow::Owned(format!("{} (Total)", sanitize_cell(label))));
    wtr.write_record(header.iter().map(|h| h.as_bytes()))?;

    for (i, date) in data.dates.iter().enumerate() {
        let mut row = Vec::with_capacity(data.countries.len() + 2);
        row.push(date.clone());
        row.extend(
            data.countries
                .iter()
                .map(|c| fmt_value(c.values.get(i).copied().flatten())),
        );
        row.push(fmt_value(totals.and_then(|t| t.value_at(date))));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the `_countryData` block as a CSV file.
pub fn save_country_csv<P: AsRef<Path>>(payload: &OutputPayload, path: P) -> Result<()> {
    let f = File::create(path)?;
    write_country_csv(payload, f)
}

/// Save the payload as pretty JSON.
pub fn save_payload_json<P: AsRef<Path>>(payload: &OutputPayload, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(payload)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
