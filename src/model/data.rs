//! Data structures for pots, plants and sensor readings.
//!
//! Field names on the wire follow the pot server's JSON (`uuid`,
//! `assignedPlant`, `sensorData`, `defaultSoil`, ...). The locally persisted
//! form of a [`Pot`] uses the Rust field names.

use crate::error::{PotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque pot identifier assigned at pairing time (the QR token).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PotId(String);

impl PotId {
    /// Parse a scanned token. Surrounding whitespace is ignored.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PotError::invalid_input("pot token is empty"));
        }
        if token.contains('/') {
            return Err(PotError::invalid_input(format!(
                "pot token contains '/': {}",
                token
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PotId {
    type Err = PotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Trim a user-supplied pot name, rejecting blank names.
pub fn normalize_pot_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PotError::invalid_input("please enter a valid pot name"));
    }
    Ok(name.to_string())
}

/// Inclusive acceptable range for one sensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct AcceptableRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Deserialize)]
struct RawRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawRange> for AcceptableRange {
    type Error = PotError;

    fn try_from(raw: RawRange) -> Result<Self> {
        AcceptableRange::new(raw.min, raw.max)
    }
}

impl AcceptableRange {
    /// Create a range, rejecting `min > max` and non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(PotError::invalid_range(format!(
                "bounds must be finite, got [{}, {}]",
                min, max
            )));
        }
        if min > max {
            return Err(PotError::invalid_range(format!(
                "min {} is greater than max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// `min <= reading <= max`
    pub fn contains(&self, reading: f64) -> bool {
        self.min <= reading && reading <= self.max
    }
}

impl fmt::Display for AcceptableRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

/// Server-supplied plant species record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantCatalogEntry {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo: String,
    #[serde(rename = "defaultSoil", default, deserialize_with = "lenient_range")]
    pub soil_moisture: Option<AcceptableRange>,
    #[serde(rename = "defaultTemp", default, deserialize_with = "lenient_range")]
    pub temperature: Option<AcceptableRange>,
    #[serde(rename = "defaultLight", default, deserialize_with = "lenient_range")]
    pub light: Option<AcceptableRange>,
}

impl PlantCatalogEntry {
    /// True when all three ranges are known, so status can be computed locally.
    pub fn has_ranges(&self) -> bool {
        self.soil_moisture.is_some() && self.temperature.is_some() && self.light.is_some()
    }
}

/// Some server records carry a single target value instead of a
/// `{min, max}` object. A scalar carries no range and maps to `None`.
fn lenient_range<'de, D>(deserializer: D) -> std::result::Result<Option<AcceptableRange>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireRange {
        Bounds(AcceptableRange),
        Scalar(f64),
    }

    Ok(match Option::<WireRange>::deserialize(deserializer)? {
        Some(WireRange::Bounds(range)) => Some(range),
        Some(WireRange::Scalar(_)) | None => None,
    })
}

/// Raw sensor values. A missing value means the pot did not report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    #[serde(default)]
    pub moisture: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub light: Option<f64>,
}

/// Human-readable status per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabels {
    #[serde(default)]
    pub moisture: String,
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub light: String,
}

/// The most recent reading set for a pot. Each poll replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub readings: SensorReadings,
    pub status: StatusLabels,
    /// When the request that produced this snapshot was issued
    pub fetched_at: DateTime<Utc>,
}

/// Device record as returned by `GET /device/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub uuid: PotId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "assignedPlant", default)]
    pub assigned_plant: Option<PlantCatalogEntry>,
    #[serde(rename = "sensorData", default)]
    pub sensor_data: Option<SensorReadings>,
    #[serde(default)]
    pub status: Option<StatusLabels>,
}

impl DeviceRecord {
    /// Build the snapshot part of this record, stamped with the request time.
    pub fn snapshot(&self, fetched_at: DateTime<Utc>) -> SensorSnapshot {
        SensorSnapshot {
            readings: self.sensor_data.unwrap_or_default(),
            status: self.status.clone().unwrap_or_default(),
            fetched_at,
        }
    }
}

/// A paired pot as held in the local collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    pub id: PotId,
    pub name: String,
    #[serde(default)]
    pub assigned_plant: Option<PlantCatalogEntry>,
    #[serde(default)]
    pub snapshot: Option<SensorSnapshot>,
}

impl Pot {
    /// Create a pot with no plant and no readings yet.
    pub fn new(id: PotId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            assigned_plant: None,
            snapshot: None,
        }
    }

    /// Create a pot from a freshly resolved device record.
    pub fn from_device(record: DeviceRecord, fetched_at: DateTime<Utc>) -> Self {
        let snapshot = record
            .sensor_data
            .is_some()
            .then(|| record.snapshot(fetched_at));
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| record.uuid.to_string());

        Self {
            id: record.uuid,
            name,
            assigned_plant: record.assigned_plant,
            snapshot,
        }
    }

    /// One-line status text, e.g. `"Too dry • Too cold"`.
    pub fn summary(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => super::classify::status_summary(&snapshot.status),
            None => "No data yet".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pot_id_parse() {
        assert_eq!(PotId::parse("  abc-123 \n").unwrap().as_str(), "abc-123");
        assert!(PotId::parse("   ").is_err());
        assert!(PotId::parse("a/b").is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(AcceptableRange::new(10.0, 5.0).is_err());
        assert!(AcceptableRange::new(f64::NAN, 5.0).is_err());
        assert!(AcceptableRange::new(5.0, 5.0).is_ok());

        let parsed: std::result::Result<AcceptableRange, _> =
            serde_json::from_str(r#"{"min": 9, "max": 1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_catalog_entry_wire_format() {
        let json = r#"{
            "_id": "p1",
            "name": "Basil",
            "description": "Kitchen herb",
            "photo": "https://example.com/basil.jpg",
            "defaultSoil": {"min": 40, "max": 70},
            "defaultTemp": {"min": 18, "max": 28},
            "defaultLight": 500
        }"#;
        let entry: PlantCatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "p1");
        assert_eq!(entry.soil_moisture, Some(AcceptableRange { min: 40.0, max: 70.0 }));
        assert_eq!(entry.light, None);
        assert!(!entry.has_ranges());
    }

    #[test]
    fn test_pot_from_device_without_name() {
        let record: DeviceRecord = serde_json::from_str(r#"{"uuid": "pot-7"}"#).unwrap();
        let pot = Pot::from_device(record, Utc::now());
        assert_eq!(pot.name, "pot-7");
        assert!(pot.snapshot.is_none());
        assert_eq!(pot.summary(), "No data yet");
    }
}
