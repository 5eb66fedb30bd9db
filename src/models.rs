use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// EDSM dumps use `null` for attributes that don't apply to a body type.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// One entry of the bodies dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub id64: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub body_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub body_type: String,
    #[serde(alias = "subtype", deserialize_with = "null_as_default")]
    pub sub_type: String,
    /// What the body orbits, innermost first: `[{"Planet": 3}, {"Star": 0}]`.
    #[serde(deserialize_with = "null_as_default")]
    pub parents: Vec<BTreeMap<String, i64>>,
    #[serde(deserialize_with = "null_as_default")]
    pub distance_to_arrival: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_landable: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub gravity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub earth_masses: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub radius: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub surface_temperature: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub surface_pressure: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub volcanism_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub atmosphere_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub atmosphere_composition: BTreeMap<String, f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub solid_composition: BTreeMap<String, f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub terraforming_state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub orbital_period: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub semi_major_axis: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub orbital_eccentricity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub orbital_inclination: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub arg_of_periapsis: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rotational_period: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rotational_period_tidally_locked: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub axial_tilt: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub materials: BTreeMap<String, f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub update_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub system_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub system_id64: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub system_name: String,
}

impl Body {
    /// Body id of the nearest parent carrying `label`, if any.
    pub fn parent_id(&self, label: &str) -> Option<i64> {
        self.parents.iter().find_map(|p| p.get(label).copied())
    }

    pub fn has_any_material<S: AsRef<str>>(&self, wanted: &[S]) -> bool {
        wanted.iter().any(|m| self.materials.contains_key(m.as_ref()))
    }
}

/// A body that passed the primary predicates, annotated with its system's distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub body: Body,
    pub distance: f64,
}

impl Candidate {
    pub fn new(body: Body, distance: f64) -> Self {
        Self { body, distance }
    }
}

/// Identity of a body inside its system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryKey {
    pub system_id: i64,
    pub body_id: i64,
}

impl CategoryKey {
    pub fn new(system_id: i64, body_id: i64) -> Self {
        Self { system_id, body_id }
    }

    pub fn of(body: &Body) -> Self {
        Self::new(body.system_id, body.body_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coords {
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One entry of the systems-with-coordinates dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarSystem {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub id64: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub coords: Coords,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_edsm_shape_with_nulls() {
        let raw = r#"{"id":7,"bodyId":4,"name":"Col 285 Sector A 1 a","type":"Planet","subType":"Icy body",
            "parents":[{"Planet":2},{"Star":0}],"distanceToArrival":15000.5,"isLandable":true,
            "volcanismType":null,"materials":{"Tellurium":1.2},"systemId":11,"systemName":"Col 285 Sector A"}"#;
        let b: Body = serde_json::from_str(raw).unwrap();
        assert_eq!(b.body_id, 4);
        assert_eq!(b.body_type, "Planet");
        assert_eq!(b.sub_type, "Icy body");
        assert_eq!(b.volcanism_type, "");
        assert_eq!(b.parent_id("Planet"), Some(2));
        assert_eq!(b.parent_id("Null"), None);
        assert!(b.has_any_material(&["Polonium", "Tellurium"]));
        assert!(!b.has_any_material(&["Polonium"]));
    }

    #[test]
    fn candidate_serializes_flat() {
        let c = Candidate::new(Body { name: "X".into(), ..Default::default() }, 42.0);
        let v: serde_json::Value = serde_json::to_value(&c).unwrap();
        assert_eq!(v["name"], "X");
        assert_eq!(v["distance"], 42.0);
        let back: Candidate = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn coords_norm() {
        let c = Coords { x: 3.0, y: 4.0, z: 12.0 };
        assert!((c.norm() - 13.0).abs() < 1e-9);
    }
}
