//! Per-room threshold configuration.
//!
//! A [`ThresholdSet`] is always replaced as a whole. Updates arrive as a
//! complete set (serde rejects a body with a missing field) and are checked
//! by [`ThresholdSet::validate`] before anything is applied.

use serde::{Deserialize, Serialize};

use crate::error::ThresholdError;
use crate::models::Metric;

// ---

/// Boundaries for every classified metric of one room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThresholdSet {
    // ---
    /// TVOC cut points, ppb: good | normal | high | too high.
    pub tvoc_good: f64,
    pub tvoc_normal: f64,
    pub tvoc_high: f64,

    /// Comfort range, °C.
    pub temp_min: f64,
    pub temp_max: f64,

    /// Comfort range, %.
    pub humidity_min: f64,
    pub humidity_max: f64,

    /// eCO2 cut points, ppm.
    pub eco2_min: f64,
    pub eco2_normal: f64,
    pub eco2_high: f64,
}

/// How a metric's boundaries are interpreted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    /// Two-sided comfort range; outside on either side is a breach.
    Range { min: f64, max: f64 },

    /// Ascending cut points; only the upper two tiers are breaches.
    Tiered { low: f64, mid: f64, high: f64 },
}

impl Default for ThresholdSet {
    fn default() -> Self {
        // ---
        ThresholdSet {
            tvoc_good: 65.0,
            tvoc_normal: 220.0,
            tvoc_high: 660.0,
            temp_min: 18.0,
            temp_max: 35.0,
            humidity_min: 30.0,
            humidity_max: 70.0,
            eco2_min: 400.0,
            eco2_normal: 1000.0,
            eco2_high: 2000.0,
        }
    }
}

impl ThresholdSet {
    pub fn bounds(&self, metric: Metric) -> Bounds {
        match metric {
            Metric::Tvoc => Bounds::Tiered {
                low: self.tvoc_good,
                mid: self.tvoc_normal,
                high: self.tvoc_high,
            },
            Metric::Temperature => Bounds::Range {
                min: self.temp_min,
                max: self.temp_max,
            },
            Metric::Humidity => Bounds::Range {
                min: self.humidity_min,
                max: self.humidity_max,
            },
            Metric::Eco2 => Bounds::Tiered {
                low: self.eco2_min,
                mid: self.eco2_normal,
                high: self.eco2_high,
            },
        }
    }

    fn named_fields(&self) -> [(&'static str, f64); 10] {
        [
            ("tvoc_good", self.tvoc_good),
            ("tvoc_normal", self.tvoc_normal),
            ("tvoc_high", self.tvoc_high),
            ("temp_min", self.temp_min),
            ("temp_max", self.temp_max),
            ("humidity_min", self.humidity_min),
            ("humidity_max", self.humidity_max),
            ("eco2_min", self.eco2_min),
            ("eco2_normal", self.eco2_normal),
            ("eco2_high", self.eco2_high),
        ]
    }

    /// Check every pairing. The first violation found is reported.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        // ---
        if let Some((field, _)) = self.named_fields().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ThresholdError::NotFinite { field });
        }

        let ordered = [
            ("temp_min", self.temp_min, "temp_max", self.temp_max),
            ("humidity_min", self.humidity_min, "humidity_max", self.humidity_max),
            ("tvoc_good", self.tvoc_good, "tvoc_normal", self.tvoc_normal),
            ("tvoc_normal", self.tvoc_normal, "tvoc_high", self.tvoc_high),
            ("eco2_min", self.eco2_min, "eco2_normal", self.eco2_normal),
            ("eco2_normal", self.eco2_normal, "eco2_high", self.eco2_high),
        ];

        for (lower, lower_value, upper, upper_value) in ordered {
            if lower_value > upper_value {
                return Err(ThresholdError::OutOfOrder {
                    lower,
                    lower_value,
                    upper,
                    upper_value,
                });
            }
        }

        Ok(())
    }
}
