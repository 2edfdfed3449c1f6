mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn wbi_agg(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("wbi-agg").unwrap();
    cmd.env_remove("WBI_AGG_CATALOG")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("wbi-agg").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("aggregate"))
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn aggregate_prints_payload_with_country_data() {
    let dir = common::data_dir();
    let out = wbi_agg(dir.path())
        .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", "lldcs,ldcs", "-c", "bol"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["lldcs"]["dates"], serde_json::json!(["2020", "2021"]));
    assert_eq!(v["lldcs"]["values"], serde_json::json!([15.0, 12.0]));
    assert_eq!(v["ldcs"]["dates"], serde_json::json!(["2020"]));
    assert_eq!(v["ldcs"]["values"], serde_json::json!([13.0]));
    assert_eq!(v["Bolivia"]["values"], serde_json::json!([10.0, 12.0]));
    assert_eq!(v["_countryData"]["group"], "lldcs");
    assert_eq!(
        v["_countryData"]["countries"][1]["values"],
        serde_json::json!([5.0, null])
    );

    // Keys keep the requested order, country and breakdown last.
    let text = String::from_utf8(out.stdout).unwrap();
    let pos: Vec<usize> = ["\"lldcs\":", "\"ldcs\":", "\"Bolivia\":", "\"_countryData\":"]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
    assert!(pos.windows(2).all(|w| w[0] < w[1]), "{text}");
}

#[test]
fn group_series_does_not_depend_on_other_groups() {
    let dir = common::data_dir();
    let run = |groups: &str| -> serde_json::Value {
        let out = wbi_agg(dir.path())
            .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", groups])
            .output()
            .unwrap();
        assert!(out.status.success());
        serde_json::from_slice(&out.stdout).unwrap()
    };
    let alone = run("ldcs");
    let together = run("lldcs,ldcs");
    assert_eq!(alone["ldcs"], together["ldcs"]);
    assert_eq!(alone["ldcs"]["values"], serde_json::json!([13.0]));
    assert_eq!(together["lldcs"]["values"], serde_json::json!([15.0, 12.0]));
}

#[test]
fn aggregate_weighted_mean() {
    let dir = common::data_dir();
    let out = wbi_agg(dir.path())
        .args(["aggregate", "-i", "SP.DYN.LE00.IN", "-g", "lldcs"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["lldcs"]["values"], serde_json::json!([75.0]));
    assert!(v.get("_countryData").is_none());
}

#[test]
fn aggregate_writes_csv_and_json_files() {
    let dir = common::data_dir();
    let csv = dir.path().join("bol.csv");
    let json = dir.path().join("bol.json");
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", "lldcs", "-c", "BOL"])
        .arg("--csv")
        .arg(&csv)
        .arg("--out")
        .arg(&json)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        ["Date,Bolivia,Paraguay,LLDCS (Total)", "2020,10,5,15", "2021,12,,12"]
    );
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert!(v.get("Bolivia").is_some());
}

#[test]
fn csv_without_country_fails() {
    let dir = common::data_dir();
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", "lldcs", "--csv"])
        .arg(dir.path().join("x.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--csv needs --country"));
}

#[test]
fn stats_report_share_of_group_total() {
    let dir = common::data_dir();
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", "lldcs", "-c", "PRY", "--stats"])
        .assert()
        .success()
        .stderr(predicate::str::contains("lldcs (2021)"))
        .stderr(predicate::str::contains("Paraguay: 33.33% of group total (2020)"));
}

#[test]
fn unknown_indicator_and_group_fail() {
    let dir = common::data_dir();
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "NOT.A.CODE", "-g", "lldcs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown indicator 'NOT.A.CODE'"));
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "NY.GDP.MKTP.CD", "-g", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown group 'nowhere'"));
}

#[test]
fn missing_cache_reports_no_data() {
    let dir = common::data_dir();
    wbi_agg(dir.path())
        .args(["aggregate", "-i", "SP.POP.GROW", "-g", "ldcs"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No data available for SP.POP.GROW"));
}

#[test]
fn describe_and_listings() {
    let dir = common::data_dir();
    wbi_agg(dir.path())
        .args(["describe", "SP.DYN.LE00.IN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Weighted average"))
        .stdout(predicate::str::contains("SP.POP.TOTL"));
    wbi_agg(dir.path())
        .args(["indicators", "--category", "economy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NY.GDP.MKTP.CD"));
    wbi_agg(dir.path())
        .arg("groups")
        .assert()
        .success()
        .stdout(predicate::str::contains("Least Developed Countries"))
        .stdout(predicate::str::contains("lldcs"));
}

#[test]
fn catalog_file_in_data_dir_overrides_builtin() {
    let dir = common::data_dir();
    fs::write(
        dir.path().join("catalog.json"),
        r#"{"indicators":{"X.AVG":{"description":"Average thing","agg":"mean"}}}"#,
    )
    .unwrap();
    common::write_indicator(
        &dir.path().join("indicators"),
        "X.AVG",
        "ldcs",
        &[("BOL", 2019, Some(1.0)), ("NPL", 2019, Some(4.0)), ("HTI", 2019, None)],
    );
    let out = wbi_agg(dir.path())
        .args(["aggregate", "-i", "X.AVG", "-g", "LDCS"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["LDCS"]["values"], serde_json::json!([2.5]));
}
