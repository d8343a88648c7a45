//! Vector encoding and distance functions backed by sqlite-vec.
//!
//! Embeddings are stored as packed `f32` BLOBs in ordinary tables and
//! compared with sqlite-vec's scalar distance functions, so queries can
//! filter by video with a plain `WHERE` clause.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use zerocopy::IntoBytes;

use crate::error::{Result, StoreError};

static VECTOR_EXTENSION: Once = Once::new();

/// Register sqlite-vec for every connection opened afterwards.
///
/// `sqlite3_auto_extension` is process-global, so registration runs once.
pub fn init_vector_extension() {
    use rusqlite::ffi::sqlite3_auto_extension;
    use sqlite_vec::sqlite3_vec_init;

    VECTOR_EXTENSION.call_once(|| unsafe {
        #[allow(clippy::missing_transmute_annotations)]
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Check if sqlite-vec extension is loaded.
pub fn check_vector_extension(conn: &Connection) -> Result<String> {
    let version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    Ok(version)
}

/// Borrow a vector as the BLOB layout sqlite-vec reads.
pub fn encode(vector: &[f32]) -> &[u8] {
    vector.as_bytes()
}

/// Decode a BLOB written by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidData(format!(
            "Embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Distance used to rank nearest neighbours (lower is closer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine similarity`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// sqlite-vec scalar function computing this metric.
    pub fn sql_function(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "vec_distance_cosine",
            DistanceMetric::L2 => "vec_distance_l2",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::L2 => write!(f, "l2"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(StoreError::InvalidData(format!(
                "Unknown distance metric '{other}'. Valid: cosine, l2"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let vector = vec![0.5f32, -1.25, 3.0];
        let bytes = encode(&vector);
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode(bytes).unwrap(), vector);
    }

    #[test]
    fn test_decode_rejects_ragged_blob() {
        assert!(matches!(decode(&[0, 1, 2]), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_extension_loads() {
        init_vector_extension();
        init_vector_extension();
        let conn = Connection::open_in_memory().unwrap();
        let version = check_vector_extension(&conn).unwrap();
        assert!(version.starts_with('v'));
    }

    #[test]
    fn test_distance_functions() {
        init_vector_extension();
        let conn = Connection::open_in_memory().unwrap();
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];

        let cosine: f64 = conn
            .query_row(
                "SELECT vec_distance_cosine(?1, ?2)",
                rusqlite::params![encode(&a), encode(&b)],
                |row| row.get(0),
            )
            .unwrap();
        assert!((cosine - 1.0).abs() < 1e-6);

        let l2: f64 = conn
            .query_row(
                "SELECT vec_distance_l2(?1, ?2)",
                rusqlite::params![encode(&a), encode(&b)],
                |row| row.get(0),
            )
            .unwrap();
        assert!((l2 - 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::default().to_string(), "cosine");
        assert_eq!(DistanceMetric::L2.sql_function(), "vec_distance_l2");
    }
}
