//! Threshold classification of sensor readings.
//!
//! A reading is compared against the assigned plant's acceptable range and
//! mapped to one of four classes, each with a label per dimension. This is
//! the only place status text is derived on the client.

use crate::model::data::{AcceptableRange, PlantCatalogEntry, SensorReadings, StatusLabels};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown when every dimension is within range.
pub const ALL_GOOD: &str = "All Conditions Good";

/// Separator between non-OK labels in a summary.
pub const SUMMARY_SEPARATOR: &str = " • ";

/// Where a reading falls relative to its acceptable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Below,
    Within,
    Above,
    NoData,
}

/// Classify a reading against an inclusive range.
///
/// `NoData` for an absent or NaN reading, `Below` iff `r < min`,
/// `Above` iff `r > max`, `Within` otherwise.
pub fn classify(reading: Option<f64>, range: &AcceptableRange) -> Classification {
    match reading {
        None => Classification::NoData,
        Some(r) if r.is_nan() => Classification::NoData,
        Some(r) if r < range.min => Classification::Below,
        Some(r) if r > range.max => Classification::Above,
        Some(_) => Classification::Within,
    }
}

/// Sensor dimension of a pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Moisture,
    Temperature,
    Light,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Moisture, Dimension::Temperature, Dimension::Light];

    /// Unit suffix used when printing ranges.
    pub fn unit(&self) -> &'static str {
        match self {
            Dimension::Moisture => "%",
            Dimension::Temperature => "°C",
            Dimension::Light => "lux",
        }
    }

    /// Read this dimension out of a reading set.
    pub fn reading(&self, readings: &SensorReadings) -> Option<f64> {
        match self {
            Dimension::Moisture => readings.moisture,
            Dimension::Temperature => readings.temperature,
            Dimension::Light => readings.light,
        }
    }

    /// Read this dimension out of a label set.
    pub fn label<'a>(&self, labels: &'a StatusLabels) -> &'a str {
        match self {
            Dimension::Moisture => &labels.moisture,
            Dimension::Temperature => &labels.temperature,
            Dimension::Light => &labels.light,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Moisture => f.write_str("Moisture"),
            Dimension::Temperature => f.write_str("Temperature"),
            Dimension::Light => f.write_str("Light"),
        }
    }
}

/// Labels for one dimension, one per classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionLabels {
    pub below: String,
    pub within: String,
    pub above: String,
    pub no_data: String,
}

impl DimensionLabels {
    pub fn select(&self, class: Classification) -> &str {
        match class {
            Classification::Below => &self.below,
            Classification::Within => &self.within,
            Classification::Above => &self.above,
            Classification::NoData => &self.no_data,
        }
    }

    /// Default labels for a dimension. The "within" labels match the
    /// server's own OK strings so locally and remotely derived labels agree.
    pub fn for_dimension(dimension: Dimension) -> Self {
        let (below, within, above) = match dimension {
            Dimension::Moisture => ("Soil too dry", "Moisture OK", "Soil too wet"),
            Dimension::Temperature => ("Too cold", "Temperature OK", "Too hot"),
            Dimension::Light => ("Not enough light", "Light OK", "Too much light"),
        };
        Self {
            below: below.to_string(),
            within: within.to_string(),
            above: above.to_string(),
            no_data: "No data".to_string(),
        }
    }
}

/// True when a label means the dimension needs no attention.
pub fn is_ok_label(dimension: Dimension, label: &str) -> bool {
    label.is_empty() || label == DimensionLabels::for_dimension(dimension).within
}

/// Range and labels for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionThreshold {
    pub range: AcceptableRange,
    pub labels: DimensionLabels,
}

impl DimensionThreshold {
    pub fn new(dimension: Dimension, range: AcceptableRange) -> Self {
        Self {
            range,
            labels: DimensionLabels::for_dimension(dimension),
        }
    }
}

/// Explicit classifier configuration for the three dimensions of a pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub moisture: DimensionThreshold,
    pub temperature: DimensionThreshold,
    pub light: DimensionThreshold,
}

impl ThresholdConfig {
    pub fn new(moisture: AcceptableRange, temperature: AcceptableRange, light: AcceptableRange) -> Self {
        Self {
            moisture: DimensionThreshold::new(Dimension::Moisture, moisture),
            temperature: DimensionThreshold::new(Dimension::Temperature, temperature),
            light: DimensionThreshold::new(Dimension::Light, light),
        }
    }

    /// Build from a catalog entry. `None` unless all three ranges are known.
    pub fn from_plant(plant: &PlantCatalogEntry) -> Option<Self> {
        Some(Self::new(plant.soil_moisture?, plant.temperature?, plant.light?))
    }

    pub fn threshold(&self, dimension: Dimension) -> &DimensionThreshold {
        match dimension {
            Dimension::Moisture => &self.moisture,
            Dimension::Temperature => &self.temperature,
            Dimension::Light => &self.light,
        }
    }

    /// Classify every dimension of a reading set.
    pub fn evaluate(&self, readings: &SensorReadings) -> Evaluation {
        let judge = |dimension: Dimension| {
            let threshold = self.threshold(dimension);
            let class = classify(dimension.reading(readings), &threshold.range);
            DimensionStatus {
                class,
                label: threshold.labels.select(class).to_string(),
            }
        };

        Evaluation {
            moisture: judge(Dimension::Moisture),
            temperature: judge(Dimension::Temperature),
            light: judge(Dimension::Light),
        }
    }
}

/// Classification and selected label for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionStatus {
    pub class: Classification,
    pub label: String,
}

/// Result of evaluating a reading set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub moisture: DimensionStatus,
    pub temperature: DimensionStatus,
    pub light: DimensionStatus,
}

impl Evaluation {
    pub fn get(&self, dimension: Dimension) -> &DimensionStatus {
        match dimension {
            Dimension::Moisture => &self.moisture,
            Dimension::Temperature => &self.temperature,
            Dimension::Light => &self.light,
        }
    }

    pub fn all_within(&self) -> bool {
        Dimension::ALL
            .iter()
            .all(|d| self.get(*d).class == Classification::Within)
    }

    pub fn labels(&self) -> StatusLabels {
        StatusLabels {
            moisture: self.moisture.label.clone(),
            temperature: self.temperature.label.clone(),
            light: self.light.label.clone(),
        }
    }
}

/// Join the labels that need attention, or [`ALL_GOOD`].
pub fn status_summary(labels: &StatusLabels) -> String {
    let attention: Vec<&str> = Dimension::ALL
        .iter()
        .map(|d| (*d, d.label(labels)))
        .filter(|(d, label)| !is_ok_label(*d, label))
        .map(|(_, label)| label)
        .collect();

    if attention.is_empty() {
        ALL_GOOD.to_string()
    } else {
        attention.join(SUMMARY_SEPARATOR)
    }
}
