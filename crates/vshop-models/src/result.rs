//! Timestamp-indexed product lists for one video.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::product::Product;

/// File name of the persisted job result inside a job's results directory.
pub const RESULTS_FILE_NAME: &str = "detection_results.json";

/// Map key wrapper giving `f64` timestamps a total order.
#[derive(Debug, Clone, Copy)]
struct TimestampKey(f64);

impl PartialEq for TimestampKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimestampKey {}

impl PartialOrd for TimestampKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimestampKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Render a timestamp as a result-file key: shortest round-trip decimal,
/// always with a fractional part (`5.0`, `12.5`).
pub fn format_timestamp_key(timestamp: f64) -> String {
    format!("{:?}", timestamp)
}

/// Product lists keyed by frame timestamp in seconds.
///
/// Only frames that produced at least one product are present. Each list is
/// expected to be sorted by descending confidence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobResult {
    entries: BTreeMap<TimestampKey, Vec<Product>>,
}

impl JobResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the product list for a timestamp, replacing any previous list.
    pub fn put(&mut self, timestamp: f64, products: Vec<Product>) {
        self.entries.insert(TimestampKey(timestamp), products);
    }

    /// Exact-key lookup.
    pub fn get(&self, timestamp: f64) -> Option<&[Product]> {
        self.entries
            .get(&TimestampKey(timestamp))
            .map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored timestamps in ascending order.
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.keys().map(|k| k.0)
    }

    /// Iterate `(timestamp, products)` in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[Product])> + '_ {
        self.entries.iter().map(|(k, v)| (k.0, v.as_slice()))
    }

    /// Tolerant lookup for a playback position.
    ///
    /// The query is snapped to the sampling grid (`interval`, ties to even),
    /// then the closest stored timestamp is chosen (the earlier one on ties).
    /// Nothing is returned if that timestamp is more than two intervals away
    /// from the snapped query.
    pub fn nearest(&self, query_time: f64, interval: f64) -> Option<(f64, &[Product])> {
        let rounded = if interval > 0.0 {
            (query_time / interval).round_ties_even() * interval
        } else {
            query_time
        };

        let mut closest: Option<(f64, &Vec<Product>)> = None;
        for (key, products) in &self.entries {
            let distance = (key.0 - rounded).abs();
            match closest {
                Some((best, _)) if distance >= (best - rounded).abs() => {}
                _ => closest = Some((key.0, products)),
            }
        }

        let (timestamp, products) = closest?;
        if (timestamp - rounded).abs() > 2.0 * interval {
            return None;
        }
        Some((timestamp, products.as_slice()))
    }
}

impl Serialize for JobResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, products) in &self.entries {
            map.serialize_entry(&format_timestamp_key(key.0), products)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JobResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct JobResultVisitor;

        impl<'de> Visitor<'de> for JobResultVisitor {
            type Value = JobResult;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of timestamp strings to product lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<JobResult, A::Error> {
                let mut result = JobResult::new();
                while let Some((key, products)) = access.next_entry::<String, Vec<Product>>()? {
                    let timestamp: f64 = key.trim().parse().map_err(|_| {
                        de::Error::custom(format!("invalid timestamp key: {key}"))
                    })?;
                    result.put(timestamp, products);
                }
                Ok(result)
            }
        }

        deserializer.deserialize_map(JobResultVisitor)
    }
}
