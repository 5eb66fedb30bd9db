mod common;

use common::dump;
use proptest::prelude::*;
use serde_json::{json, Value};
use shard_finder::config::ScanConfig;
use shard_finder::distances::DistanceTable;
use shard_finder::engine::scan_bodies;
use shard_finder::filter::FilterCriteria;
use shard_finder::models::{Body, CategoryKey};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct Gen {
    system_id: i64,
    body_id: i64,
    planet: bool,
    sub_type: &'static str,
    landable: bool,
    arrival: f64,
    volcanism: &'static str,
    temperature: f64,
    material: Option<&'static str>,
    parent: Option<i64>,
}

fn gen_body() -> impl Strategy<Value = Gen> {
    (
        0i64..4,
        0i64..6,
        any::<bool>(),
        prop::sample::select(vec!["Class I gas giant", "Gas giant with ammonia-based life", "Icy body", "Rocky body"]),
        any::<bool>(),
        prop::sample::select(vec![5_000.0, 12_000.0, 18_000.0]),
        prop::sample::select(vec!["", "No volcanism", "Water magma"]),
        prop::sample::select(vec![150.0, 220.0, 300.0]),
        prop::option::of(prop::sample::select(vec!["Polonium", "Iron", "Yttrium"])),
        prop::option::of(0i64..6),
    )
        .prop_map(|(system_id, body_id, planet, sub_type, landable, arrival, volcanism, temperature, material, parent)| Gen {
            system_id, body_id, planet, sub_type, landable, arrival, volcanism, temperature, material, parent,
        })
}

fn to_json(id: usize, g: &Gen) -> Value {
    let mut parents = Vec::new();
    if let Some(p) = g.parent {
        parents.push(json!({ "Planet": p }));
    }
    parents.push(json!({ "Star": 0 }));
    let mut materials = serde_json::Map::new();
    if let Some(m) = g.material {
        materials.insert(m.to_string(), json!(1.0));
    }
    json!({
        "id": id,
        "bodyId": g.body_id,
        "type": if g.planet { "Planet" } else { "Star" },
        "subType": g.sub_type,
        "parents": parents,
        "isLandable": g.landable,
        "distanceToArrival": g.arrival,
        "volcanismType": g.volcanism,
        "surfaceTemperature": g.temperature,
        "materials": materials,
        "systemId": g.system_id,
    })
}

/// Straight sequential evaluation of the same selection.
fn expected_ids(records: &[Value], table: &DistanceTable, criteria: &FilterCriteria) -> Vec<i64> {
    let compiled = criteria.compile().unwrap();
    let bodies: Vec<Body> = records.iter().map(|r| serde_json::from_value(r.clone()).unwrap()).collect();
    let members: HashSet<CategoryKey> = bodies
        .iter()
        .filter(|b| table.get(b.system_id).is_some() && compiled.is_category_member(b))
        .map(CategoryKey::of)
        .collect();
    let mut ids: Vec<i64> = bodies
        .iter()
        .filter(|b| table.get(b.system_id).is_some() && compiled.is_candidate(b))
        .filter(|b| b.parent_id("Planet").is_some_and(|p| members.contains(&CategoryKey::new(b.system_id, p))))
        .map(|b| b.id)
        .collect();
    ids.sort_unstable();
    ids
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn result_set_does_not_depend_on_worker_count(gens in prop::collection::vec(gen_body(), 0..60)) {
        let records: Vec<Value> = gens.iter().enumerate().map(|(i, g)| to_json(i, g)).collect();
        let table: DistanceTable = [(0, 12.5), (1, 3.0), (2, 3.0)].into_iter().collect();
        let criteria = FilterCriteria::default();
        let want = expected_ids(&records, &table, &criteria);

        for workers in [1, 8] {
            let cfg = ScanConfig { workers, queue_capacity: 3, result_capacity: 2, ..ScanConfig::default() };
            let out = scan_bodies(dump(&records), &table, &criteria, &cfg, |_| {}, None).unwrap();
            let mut got: Vec<i64> = out.candidates.iter().map(|c| c.body.id).collect();
            got.sort_unstable();
            prop_assert_eq!(&got, &want);
            for pair in out.candidates.windows(2) {
                prop_assert!(shard_finder::filter::compare_candidates(&pair[0], &pair[1]).is_le());
            }
        }
    }
}
