//! Alerts raised when a pot's condition leaves its acceptable range.

use crate::model::classify::{is_ok_label, Classification, Dimension, ThresholdConfig};
use crate::model::{Pot, PotId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// A user-facing notification about one pot dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub pot_id: PotId,
    pub pot_name: String,
    pub dimension: Dimension,
    pub title: String,
    pub description: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    fn new(pot: &Pot, dimension: Dimension, class: Option<Classification>, label: &str) -> Self {
        let title = match dimension {
            Dimension::Moisture => "Watering Alert",
            Dimension::Temperature => "Temperature Alert",
            Dimension::Light => "Sunlight Alert",
        };

        let name = &pot.name;
        let description = match (dimension, class) {
            (Dimension::Moisture, Some(Classification::Below)) => format!("Water your ({}).", name),
            (Dimension::Moisture, Some(Classification::Above)) => {
                format!("Let the soil of ({}) dry out.", name)
            }
            (Dimension::Temperature, Some(Classification::Below)) => {
                format!("Move your ({}) somewhere warmer.", name)
            }
            (Dimension::Temperature, Some(Classification::Above)) => {
                format!("Move your ({}) somewhere cooler.", name)
            }
            (Dimension::Light, Some(Classification::Below)) => {
                format!("Move your ({}) to a sunnier spot.", name)
            }
            (Dimension::Light, Some(Classification::Above)) => {
                format!("Move your ({}) out of direct sun.", name)
            }
            _ => format!("{} ({}).", label, name),
        };

        Self {
            id: Uuid::new_v4(),
            pot_id: pot.id.clone(),
            pot_name: pot.name.clone(),
            dimension,
            title: title.to_string(),
            description,
            raised_at: Utc::now(),
        }
    }
}

/// Remembers the last non-OK label per pot and dimension, so an alert is
/// raised once per transition rather than on every poll.
#[derive(Debug, Default)]
pub struct AlertTracker {
    active: HashMap<(PotId, Dimension), String>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the pot's current status with what was seen before.
    pub fn observe(&mut self, pot: &Pot) -> Vec<Alert> {
        let Some(snapshot) = &pot.snapshot else {
            return Vec::new();
        };
        let evaluation = pot
            .assigned_plant
            .as_ref()
            .and_then(ThresholdConfig::from_plant)
            .map(|config| config.evaluate(&snapshot.readings));

        let mut alerts = Vec::new();
        for dimension in Dimension::ALL {
            let label = dimension.label(&snapshot.status);
            let class = evaluation.as_ref().map(|e| e.get(dimension).class);
            let key = (pot.id.clone(), dimension);

            let needs_attention = match class {
                Some(class) => matches!(class, Classification::Below | Classification::Above),
                None => !is_ok_label(dimension, label) && label != "No data",
            };

            if !needs_attention {
                self.active.remove(&key);
                continue;
            }

            if self.active.get(&key).map(String::as_str) != Some(label) {
                self.active.insert(key, label.to_string());
                alerts.push(Alert::new(pot, dimension, class, label));
            }
        }
        alerts
    }

    /// Drop state for a pot that is no longer tracked.
    pub fn forget(&mut self, id: &PotId) {
        self.active.retain(|(pot_id, _), _| pot_id != id);
    }
}

/// Destination for raised alerts.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert);
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &Alert) {
        warn!(pot = %alert.pot_id, "{}: {}", alert.title, alert.description);
    }
}

/// Keeps alerts in memory, newest last.
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl AlertSink for CollectingAlertSink {
    fn deliver(&self, alert: &Alert) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcceptableRange, PlantCatalogEntry, SensorReadings, SensorSnapshot, StatusLabels};

    fn pot_with(light: f64) -> Pot {
        let range = |min, max| Some(AcceptableRange::new(min, max).unwrap());
        let mut pot = Pot::new(PotId::parse("p1").unwrap(), "My Smart Pot");
        pot.assigned_plant = Some(PlantCatalogEntry {
            id: "fern".into(),
            name: "Fern".into(),
            description: String::new(),
            photo: String::new(),
            soil_moisture: range(30.0, 60.0),
            temperature: range(15.0, 25.0),
            light: range(300.0, 900.0),
        });
        pot.snapshot = Some(SensorSnapshot {
            readings: SensorReadings {
                moisture: Some(45.0),
                temperature: Some(20.0),
                light: Some(light),
            },
            status: StatusLabels::default(),
            fetched_at: Utc::now(),
        });
        pot
    }

    #[test]
    fn test_alert_raised_once_per_transition() {
        let mut tracker = AlertTracker::new();

        let alerts = tracker.observe(&pot_with(50.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Sunlight Alert");
        assert_eq!(alerts[0].description, "Move your (My Smart Pot) to a sunnier spot.");

        assert!(tracker.observe(&pot_with(40.0)).is_empty());
        assert!(tracker.observe(&pot_with(500.0)).is_empty());
        assert_eq!(tracker.observe(&pot_with(50.0)).len(), 1);
    }

    #[test]
    fn test_server_labels_without_plant() {
        let mut tracker = AlertTracker::new();
        let mut pot = Pot::new(PotId::parse("p2").unwrap(), "Desk");
        pot.snapshot = Some(SensorSnapshot {
            readings: SensorReadings::default(),
            status: StatusLabels {
                moisture: "Moisture Low".into(),
                temperature: "Temperature OK".into(),
                light: "No data".into(),
            },
            fetched_at: Utc::now(),
        });

        let alerts = tracker.observe(&pot);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].description, "Moisture Low (Desk).");
    }
}
