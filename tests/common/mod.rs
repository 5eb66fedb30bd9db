#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use shard_finder::source::{gz_reader, GzReader};
use std::io::{Cursor, Write};

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

/// Gzipped JSON array of the given records, one per line like the EDSM dumps.
pub fn dump(records: &[Value]) -> GzReader<Cursor<Vec<u8>>> {
    let lines: Vec<String> = records.iter().map(|r| r.to_string()).collect();
    raw_dump(&format!("[\n{}\n]\n", lines.join(",\n")))
}

pub fn raw_dump(text: &str) -> GzReader<Cursor<Vec<u8>>> {
    gz_reader(Cursor::new(gzip(text.as_bytes())))
}

pub fn gas_giant(system_id: i64, body_id: i64) -> Value {
    json!({
        "id": system_id * 100 + body_id,
        "bodyId": body_id,
        "name": format!("Sys{} {}", system_id, body_id),
        "type": "Planet",
        "subType": "Gas Giant",
        "parents": [{"Star": 0}],
        "isLandable": false,
        "systemId": system_id,
    })
}

pub fn shard_site(system_id: i64, body_id: i64, parent: i64) -> Value {
    json!({
        "id": system_id * 100 + body_id,
        "bodyId": body_id,
        "name": format!("Sys{} {} a", system_id, body_id),
        "type": "Planet",
        "subType": "Icy body",
        "parents": [{"Planet": parent}, {"Star": 0}],
        "isLandable": true,
        "distanceToArrival": 15000,
        "volcanismType": "Water magma",
        "surfaceTemperature": 150,
        "gravity": 0.08,
        "materials": {"Tellurium": 0.1},
        "systemId": system_id,
        "systemName": format!("Sys{}", system_id),
    })
}
