//! Aggregation properties checked against independently computed expectations.

use std::collections::{BTreeMap, BTreeSet};
use wbi_agg::membership::{Group, Member};
use wbi_agg::{
    AggregateQuery, Aggregation, Engine, GroupMembership, IndicatorCatalog, IndicatorMeta,
    Observation, ObservationLookup, ObservationStore,
};

const MEMBERS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

fn meta(code: &str, agg: Aggregation) -> IndicatorMeta {
    IndicatorMeta {
        code: code.into(),
        description: code.into(),
        source: None,
        unit: None,
        agg,
    }
}

fn catalog() -> IndicatorCatalog {
    IndicatorCatalog::new(
        [
            meta("TOTAL", Aggregation::Sum),
            meta("AVG", Aggregation::Mean),
            meta("RATE", Aggregation::Weighted { weight_by: "W".into() }),
            meta("W", Aggregation::Sum),
        ],
        BTreeMap::new(),
    )
    .unwrap()
}

fn membership() -> GroupMembership {
    GroupMembership::from_groups([Group::new(
        "bloc",
        MEMBERS.iter().map(|c| Member::new(*c, *c)).collect(),
    )])
    .unwrap()
}

/// Small deterministic generator so the data set has irregular gaps.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Present roughly two times out of three, zero now and then.
    fn maybe(&mut self) -> Option<f64> {
        match self.next() % 9 {
            0..=2 => None,
            3 => Some(0.0),
            n => Some((n * 7 + self.next() % 100) as f64 / 4.0),
        }
    }
}

fn rows(seed: u64) -> Vec<Observation> {
    let mut rng = Lcg(seed);
    let mut out = Vec::new();
    for year in 2000..2015 {
        for c in MEMBERS {
            out.push(Observation::new(c, year, rng.maybe()));
        }
    }
    out
}

fn store() -> ObservationStore {
    let mut store = ObservationStore::new();
    for (code, seed) in [("TOTAL", 1), ("AVG", 1), ("RATE", 2), ("W", 3)] {
        store.extend_indicator(code, rows(seed));
    }
    // Drop a whole year for every member.
    store.extend_indicator("TOTAL", MEMBERS.map(|c| Observation::new(c, 2015, None)));
    store
}

fn run(code: &str, store: &ObservationStore) -> BTreeMap<i32, f64> {
    let c = catalog();
    let m = membership();
    let out = Engine::new(&c, &m)
        .aggregate(&AggregateQuery::new(code, ["bloc"]), store)
        .unwrap();
    let series = &out.group_series["bloc"];
    let years: Vec<i32> = series.years().collect();
    let mut sorted = years.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(years, sorted, "years must be strictly ascending");
    series.points.iter().map(|p| (p.year, p.value)).collect()
}

fn present(store: &ObservationStore, code: &str, year: i32) -> Vec<(&'static str, f64)> {
    let set = store.observations(code).unwrap();
    MEMBERS
        .iter()
        .filter_map(|c| set.value(c, year).map(|v| (*c, v)))
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn sum_matches_present_members_and_skips_empty_years() {
    let store = store();
    let got = run("TOTAL", &store);
    assert!(!got.contains_key(&2015));
    for year in 2000..=2015 {
        let vals = present(&store, "TOTAL", year);
        match got.get(&year) {
            Some(v) => assert!(close(*v, vals.iter().map(|(_, v)| v).sum()), "{year}"),
            None => assert!(vals.is_empty(), "year {year} has data but was omitted"),
        }
    }
}

#[test]
fn mean_times_count_equals_sum() {
    let store = store();
    let got = run("AVG", &store);
    for (year, v) in &got {
        let vals = present(&store, "AVG", *year);
        let n = vals.len() as f64;
        assert!(n > 0.0);
        assert!(close(v * n, vals.iter().map(|(_, v)| v).sum()), "{year}");
    }
}

#[test]
fn weighted_uses_joint_availability_only() {
    let store = store();
    let got = run("RATE", &store);
    let candidate: BTreeSet<i32> = (2000..2015)
        .filter(|y| !present(&store, "RATE", *y).is_empty())
        .collect();
    for year in candidate {
        let weights: BTreeMap<_, _> = present(&store, "W", year).into_iter().collect();
        let pairs: Vec<(f64, f64)> = present(&store, "RATE", year)
            .into_iter()
            .filter_map(|(c, v)| weights.get(c).map(|w| (v, *w)))
            .collect();
        let den: f64 = pairs.iter().map(|(_, w)| w).sum();
        match got.get(&year) {
            Some(v) => {
                let num: f64 = pairs.iter().map(|(v, w)| v * w).sum();
                assert!(den != 0.0);
                assert!(close(*v, num / den), "{year}");
            }
            None => assert!(den == 0.0, "year {year} has weight but was omitted"),
        }
    }
}

#[test]
fn aggregate_is_idempotent() {
    let c = catalog();
    let m = membership();
    let store = store();
    let engine = Engine::new(&c, &m);
    for code in ["TOTAL", "AVG", "RATE"] {
        let q = AggregateQuery::new(code, ["bloc"]).with_focus("CCC");
        let a = engine.aggregate(&q, &store).unwrap();
        let b = engine.aggregate(&q, &store).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn concurrent_queries_agree_with_sequential_ones() {
    let c = catalog();
    let m = membership();
    let store = store();
    let engine = Engine::new(&c, &m);
    let codes = ["TOTAL", "AVG", "RATE"];
    let sequential: Vec<_> = codes
        .iter()
        .map(|code| engine.aggregate(&AggregateQuery::new(*code, ["bloc"]), &store).unwrap())
        .collect();
    let parallel: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = codes
            .iter()
            .map(|code| {
                let (engine, store) = (&engine, &store);
                s.spawn(move || {
                    engine
                        .aggregate(&AggregateQuery::new(*code, ["bloc"]), store)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, parallel);
}

#[test]
fn detail_columns_align_with_group_axis() {
    let c = catalog();
    let m = membership();
    let store = store();
    let q = AggregateQuery::new("RATE", ["bloc"]).with_focus("ddd");
    let out = Engine::new(&c, &m).aggregate(&q, &store).unwrap();
    let detail = out.country_detail.unwrap();
    let axis: Vec<i32> = out.group_series["bloc"].years().collect();
    assert_eq!(detail.years, axis);
    assert_eq!(detail.members.len(), MEMBERS.len());
    let set = store.observations("RATE").unwrap();
    for member in &detail.members {
        assert_eq!(member.values.len(), axis.len());
        for (i, y) in axis.iter().enumerate() {
            assert_eq!(member.values[i], set.value(&member.code, *y));
        }
    }
}
