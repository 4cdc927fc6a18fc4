use crate::models::{Metric, Severity, Tier};
use crate::thresholds::{Bounds, ThresholdSet};

// ---

/// Result of classifying one metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    pub severity: Severity,
    /// Present only for tiers that warrant an alert.
    pub breach: Option<Breach>,
}

/// The boundary that was crossed and the operator-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub bound: f64,
    pub message: String,
}

/// Map a metric value onto its tier.
///
/// All comparisons are strict: a value sitting exactly on a boundary stays in
/// the less severe tier, so a sensor parked on a cut point does not flap.
pub fn classify(metric: Metric, value: f64, thresholds: &ThresholdSet) -> Classification {
    // ---
    match thresholds.bounds(metric) {
        Bounds::Range { min, max } => {
            if value < min {
                breached(Tier::Low, Severity::Warning, min, || {
                    let (label, unit) = (metric.label(), metric.unit());
                    format!("{label} too low: {value:.2}{unit}, below Minimum {label} ({min}{unit})")
                })
            } else if value > max {
                breached(Tier::High, Severity::Warning, max, || {
                    let (label, unit) = (metric.label(), metric.unit());
                    format!("{label} too high: {value:.2}{unit}, above Maximum {label} ({max}{unit})")
                })
            } else {
                quiet(Tier::Normal, Severity::Success)
            }
        }
        Bounds::Tiered { low, mid, high } => {
            if value > high {
                breached(Tier::TooHigh, Severity::Danger, high, || {
                    let (label, unit) = (metric.label(), metric.unit());
                    format!("{label} too high: {value:.2}{unit}, above Critical Level ({high}{unit})")
                })
            } else if value > mid {
                breached(Tier::High, Severity::Warning, mid, || {
                    let (label, unit) = (metric.label(), metric.unit());
                    format!("{label} high: {value:.2}{unit}, above Normal Level ({mid}{unit})")
                })
            } else if value > low {
                quiet(Tier::Normal, Severity::Info)
            } else {
                quiet(Tier::Good, Severity::Success)
            }
        }
    }
}

fn breached(tier: Tier, severity: Severity, bound: f64, message: impl FnOnce() -> String) -> Classification {
    Classification {
        tier,
        severity,
        breach: Some(Breach {
            bound,
            message: message(),
        }),
    }
}

fn quiet(tier: Tier, severity: Severity) -> Classification {
    Classification {
        tier,
        severity,
        breach: None,
    }
}
