//! Read-only reports derived from a session's profile and latest prediction

use crate::data::{CustomerProfile, Feature};
use crate::error::EngineError;
use crate::pipeline::RiskBand;
use crate::session::{PredictionResult, SessionState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Reference accuracy quoted for the model
pub const MODEL_ACCURACY: f64 = 0.93;

/// Cohort spread in percentage points: the complement of the accuracy figure
pub const COHORT_STD_DEV: f64 = 7.0;
pub const COHORT_SIZE: usize = 100;
pub const COHORT_SEED: u64 = 42;
pub const COHORT_BINS: usize = 30;

/// Radar axis labels, in plotting order
pub const TOPOLOGY_AXES: [&str; 6] = [
    "Age Context",
    "Support Escalations",
    "Financial Delays",
    "Commitment",
    "LTV Spend",
    "Account Ghosting",
];

/// Ideal retention profile drawn under the customer's radar
pub const IDEAL_RETENTION_PROFILE: [f64; 6] = [0.3, 0.1, 0.1, 0.2, 0.2, 0.1];

/// Upper bound per radar axis, and whether a low raw value means high risk
const TOPOLOGY_BOUNDS: [(Feature, f64, bool); 6] = [
    (Feature::Age, 80.0, false),
    (Feature::SupportCalls, 15.0, false),
    (Feature::PaymentDelay, 30.0, false),
    (Feature::ContractLength, 24.0, true),
    (Feature::TotalSpend, 10000.0, true),
    (Feature::LastInteraction, 90.0, false),
];

/// Illustrative importances presented with the model explanation
pub const FEATURE_IMPORTANCES: [(Feature, f64); 8] = [
    (Feature::LastInteraction, 0.35),
    (Feature::SupportCalls, 0.20),
    (Feature::PaymentDelay, 0.15),
    (Feature::ContractLength, 0.10),
    (Feature::TotalSpend, 0.08),
    (Feature::SubscriptionType, 0.05),
    (Feature::Age, 0.04),
    (Feature::Gender, 0.03),
];

/// Latest result, or the error every report shows before the first run
pub fn require_result(session: &SessionState) -> Result<&PredictionResult, EngineError> {
    session.result.as_ref().ok_or(EngineError::NoPrediction)
}

/// Six risk axes scaled to [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct RiskTopology {
    pub values: [f64; 6],
    pub ideal: [f64; 6],
}

impl RiskTopology {
    pub fn from_profile(profile: &CustomerProfile) -> Self {
        let values = TOPOLOGY_BOUNDS.map(|(feature, bound, inverted)| {
            let scaled = (profile.numeric(feature).unwrap_or_default() / bound).min(1.0);
            if inverted {
                1.0 - scaled
            } else {
                scaled
            }
        });

        Self {
            values,
            ideal: IDEAL_RETENTION_PROFILE,
        }
    }

    /// Axes where the customer sits above the ideal profile, largest gap first
    pub fn exposures(&self) -> Vec<(&'static str, f64)> {
        let mut gaps: Vec<(&'static str, f64)> = TOPOLOGY_AXES
            .iter()
            .zip(self.values.iter().zip(self.ideal.iter()))
            .map(|(axis, (value, ideal))| (*axis, value - ideal))
            .filter(|(_, gap)| *gap > 0.0)
            .collect();
        gaps.sort_by(|a, b| b.1.total_cmp(&a.1));
        gaps
    }
}

/// Gauge colouring zones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeZone {
    Secure,
    Elevated,
    Critical,
}

impl GaugeZone {
    pub fn for_risk(risk_pct: f64) -> Self {
        if risk_pct >= 50.0 {
            GaugeZone::Critical
        } else if risk_pct >= 25.0 {
            GaugeZone::Elevated
        } else {
            GaugeZone::Secure
        }
    }

    /// Zone boundaries on the 0-100 scale
    pub fn range(self) -> (f64, f64) {
        match self {
            GaugeZone::Secure => (0.0, 25.0),
            GaugeZone::Elevated => (25.0, 50.0),
            GaugeZone::Critical => (50.0, 100.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GaugeZone::Secure => "secure",
            GaugeZone::Elevated => "elevated",
            GaugeZone::Critical => "critical",
        }
    }
}

/// Annual revenue split by churn risk
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueProjection {
    pub monthly_revenue: f64,
    pub annual_revenue: f64,
    pub revenue_at_risk: f64,
    pub revenue_secured: f64,
}

impl RevenueProjection {
    /// Monthly revenue is spend spread over the contract months plus one
    pub fn compute(profile: &CustomerProfile, risk_pct: f64) -> Self {
        let risk = risk_pct / 100.0;
        let monthly_revenue = profile.total_spend / (profile.contract_length + 1.0);
        let annual_revenue = monthly_revenue * 12.0;

        Self {
            monthly_revenue,
            annual_revenue,
            revenue_at_risk: annual_revenue * risk,
            revenue_secured: annual_revenue * (1.0 - risk),
        }
    }
}

/// Synthetic cohort of look-alike customers under the model's error
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSimulation {
    pub base_risk: f64,
    pub samples: Vec<f64>,
}

impl CohortSimulation {
    /// Seeded, so identical base risk always yields the identical cohort
    pub fn run(base_risk: f64) -> crate::Result<Self> {
        Self::run_with(base_risk, COHORT_SIZE, COHORT_SEED)
    }

    pub fn run_with(base_risk: f64, size: usize, seed: u64) -> crate::Result<Self> {
        let normal = Normal::new(base_risk, COHORT_STD_DEV)
            .map_err(|e| anyhow::anyhow!("Invalid cohort distribution: {}", e))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let samples = (0..size)
            .map(|_| normal.sample(&mut rng).clamp(0.0, 100.0))
            .collect();

        Ok(Self { base_risk, samples })
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }

    pub fn min(&self) -> f64 {
        self.samples.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Share of the cohort classified high risk
    pub fn high_risk_share(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let high = self
            .samples
            .iter()
            .filter(|&&x| RiskBand::classify(x) == RiskBand::High)
            .count();
        high as f64 / self.samples.len() as f64
    }

    /// Equal-width bins over [0, 100]; 100 itself lands in the last bin
    pub fn histogram(&self, bins: usize) -> Vec<usize> {
        let mut counts = vec![0; bins];
        if bins == 0 {
            return counts;
        }
        let width = 100.0 / bins as f64;
        for &sample in &self.samples {
            let bin = ((sample / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }
        counts
    }
}

/// Static explanation of how the churn regressor reaches its score
pub fn model_explanation() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Regression output",
            "The model is a decision tree regressor rather than a classifier. Each leaf holds \
             the mean churn value of its training bucket, which becomes a continuous risk score \
             instead of a yes/no label.",
        ),
        (
            "Non-linear event triggering",
            "Trees learn hard thresholds, e.g. a long payment delay combined with many support \
             calls, rather than smooth boundaries.",
        ),
        (
            "Anti-overfitting constraints",
            "Depth and minimum-leaf-size limits force the tree to generalize instead of \
             memorizing individual customers.",
        ),
        (
            "Encoded categoricals",
            "Gender and subscription tier are label-encoded to integers so the splitter can \
             route on them.",
        ),
    ]
}
