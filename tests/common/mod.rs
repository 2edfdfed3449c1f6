//! Fixture data directory shared by the integration tests.

use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_group(dir: &Path, gid: &str, name: &str, members: &[(&str, &str)]) {
    let countries: Vec<_> = members
        .iter()
        .map(|(iso3, name)| json!({ "name": name, "ISO": &iso3[..2], "ISO3": iso3 }))
        .collect();
    let body = json!({
        "gid": gid,
        "acronym": gid.to_uppercase(),
        "classifier": "Development status",
        "name": name,
        "countries": countries,
    });
    fs::write(dir.join(format!("{gid}.json")), body.to_string()).unwrap();
}

/// Cached API payload: `[Meta, [Entry, ...]]`.
pub fn write_indicator(dir: &Path, code: &str, group: &str, rows: &[(&str, i32, Option<f64>)]) {
    let entries: Vec<_> = rows
        .iter()
        .map(|(iso3, year, value)| {
            json!({
                "indicator": { "id": code, "value": code },
                "country": { "id": &iso3[..2], "value": iso3 },
                "countryiso3code": iso3,
                "date": year.to_string(),
                "value": value,
            })
        })
        .collect();
    let meta = json!({ "page": 1, "pages": 1, "per_page": "1000", "total": entries.len() });
    fs::write(
        dir.join(format!("{code}_{group}.json")),
        json!([meta, entries]).to_string(),
    )
    .unwrap();
}

/// Two groups sharing BOL:
/// - `lldcs`: BOL, PRY
/// - `ldcs`: BOL, NPL, HTI
///
/// Cached data for GDP (sum), population (sum) and life expectancy
/// (weighted by population). BOL's 2021 GDP is 12 in the `lldcs` file but
/// missing in the `ldcs` one.
pub fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let groups = dir.path().join("groups");
    let indicators = dir.path().join("indicators");
    fs::create_dir_all(&groups).unwrap();
    fs::create_dir_all(&indicators).unwrap();

    write_group(
        &groups,
        "lldcs",
        "Landlocked Developing Countries",
        &[("BOL", "Bolivia"), ("PRY", "Paraguay")],
    );
    write_group(
        &groups,
        "ldcs",
        "Least Developed Countries",
        &[("BOL", "Bolivia"), ("NPL", "Nepal"), ("HTI", "Haiti")],
    );

    let gdp = "NY.GDP.MKTP.CD";
    write_indicator(
        &indicators,
        gdp,
        "lldcs",
        &[
            ("BOL", 2020, Some(10.0)),
            ("PRY", 2020, Some(5.0)),
            ("BOL", 2021, Some(12.0)),
            ("PRY", 2021, None),
        ],
    );
    write_indicator(
        &indicators,
        gdp,
        "ldcs",
        &[
            ("BOL", 2020, Some(10.0)),
            ("NPL", 2020, Some(3.0)),
            ("HTI", 2020, None),
            ("BOL", 2021, None),
        ],
    );

    let pop = "SP.POP.TOTL";
    write_indicator(
        &indicators,
        pop,
        "lldcs",
        &[("BOL", 2020, Some(100.0)), ("PRY", 2020, Some(300.0))],
    );
    let le = "SP.DYN.LE00.IN";
    write_indicator(
        &indicators,
        le,
        "lldcs",
        &[("BOL", 2020, Some(60.0)), ("PRY", 2020, Some(80.0))],
    );
    dir
}
