//! Output rounding for report JSON. In-memory values are never rounded.

use serde::ser::SerializeMap;
use serde::Serializer;
use std::collections::BTreeMap;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round2<S>(val: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_f64(round_to(*val, 2))
}

pub fn round3<S>(val: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_f64(round_to(*val, 3))
}

pub fn round3_opt<S>(val: &Option<f64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match val {
        Some(v) => s.serialize_some(&round_to(*v, 3)),
        None => s.serialize_none(),
    }
}

/// Round every value of a bookmaker-keyed map to 2 places.
pub fn round2_map<S>(map: &BTreeMap<String, f64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut state = s.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        state.serialize_entry(key, &round_to(*value, 2))?;
    }
    state.end()
}
