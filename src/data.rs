//! Customer feature record: the eight bounded inputs that feed the churn model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of features the predictor consumes
pub const FEATURE_COUNT: usize = 8;

/// Features in the canonical order expected by the predictor
pub const FEATURE_ORDER: [Feature; FEATURE_COUNT] = [
    Feature::Age,
    Feature::Gender,
    Feature::SupportCalls,
    Feature::PaymentDelay,
    Feature::SubscriptionType,
    Feature::ContractLength,
    Feature::TotalSpend,
    Feature::LastInteraction,
];

/// One of the eight customer attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Age,
    Gender,
    SupportCalls,
    PaymentDelay,
    SubscriptionType,
    ContractLength,
    TotalSpend,
    LastInteraction,
}

impl Feature {
    /// Column name used in artifacts and exports
    pub fn name(self) -> &'static str {
        match self {
            Feature::Age => "Age",
            Feature::Gender => "Gender",
            Feature::SupportCalls => "Support Calls",
            Feature::PaymentDelay => "Payment Delay",
            Feature::SubscriptionType => "Subscription Type",
            Feature::ContractLength => "Contract Length",
            Feature::TotalSpend => "Total Spend",
            Feature::LastInteraction => "Last Interaction",
        }
    }

    /// Bounds for numeric features, `None` for categorical ones
    pub fn numeric_spec(self) -> Option<&'static NumericSpec> {
        NUMERIC_SPECS.iter().find(|spec| spec.feature == self)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, Feature::Gender | Feature::SubscriptionType)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = anyhow::Error;

    /// Accepts the column name in any case, with spaces, dashes or underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        let feature = match key.as_str() {
            "age" => Feature::Age,
            "gender" => Feature::Gender,
            "supportcalls" | "calls" => Feature::SupportCalls,
            "paymentdelay" | "delay" => Feature::PaymentDelay,
            "subscriptiontype" | "subscription" | "tier" => Feature::SubscriptionType,
            "contractlength" | "contract" => Feature::ContractLength,
            "totalspend" | "spend" => Feature::TotalSpend,
            "lastinteraction" | "lastseen" => Feature::LastInteraction,
            _ => anyhow::bail!("Unknown feature: {}", s.trim()),
        };
        Ok(feature)
    }
}

/// Input bounds and reference value of a numeric feature
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSpec {
    pub feature: Feature,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Global reference value used for display deltas
    pub baseline: f64,
    pub unit: &'static str,
    /// An increase over the baseline is unfavorable
    pub inverse_delta: bool,
}

impl NumericSpec {
    /// Clamp into `[min, max]` and snap to the nearest step
    pub fn sanitize(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.baseline;
        }
        let clamped = value.clamp(self.min, self.max);
        let snapped = self.min + ((clamped - self.min) / self.step).round() * self.step;
        snapped.clamp(self.min, self.max)
    }

    /// Percentage difference from the baseline
    pub fn delta_pct(&self, value: f64) -> f64 {
        if self.baseline > 0.0 {
            (value - self.baseline) / self.baseline * 100.0
        } else {
            0.0
        }
    }
}

/// Numeric feature table, in canonical order
pub static NUMERIC_SPECS: [NumericSpec; 6] = [
    NumericSpec {
        feature: Feature::Age,
        min: 18.0,
        max: 90.0,
        step: 1.0,
        baseline: 35.0,
        unit: "Yrs",
        inverse_delta: false,
    },
    NumericSpec {
        feature: Feature::SupportCalls,
        min: 0.0,
        max: 30.0,
        step: 1.0,
        baseline: 2.0,
        unit: "Calls",
        inverse_delta: true,
    },
    NumericSpec {
        feature: Feature::PaymentDelay,
        min: 0.0,
        max: 60.0,
        step: 1.0,
        baseline: 5.0,
        unit: "Days",
        inverse_delta: true,
    },
    NumericSpec {
        feature: Feature::ContractLength,
        min: 1.0,
        max: 36.0,
        step: 1.0,
        baseline: 12.0,
        unit: "Months",
        inverse_delta: false,
    },
    NumericSpec {
        feature: Feature::TotalSpend,
        min: 0.0,
        max: 20000.0,
        step: 100.0,
        baseline: 1500.0,
        unit: "USD",
        inverse_delta: false,
    },
    NumericSpec {
        feature: Feature::LastInteraction,
        min: 0.0,
        max: 180.0,
        step: 1.0,
        baseline: 14.0,
        unit: "Days Ago",
        inverse_delta: false,
    },
];

/// Self-reported gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    Female,
    Male,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Female, Gender::Male, Gender::Other];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Other => "Other",
        }
    }
}

/// Billing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubscriptionTier {
    Basic,
    #[default]
    Standard,
    Premium,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Basic,
        SubscriptionTier::Standard,
        SubscriptionTier::Premium,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "Basic",
            SubscriptionTier::Standard => "Standard",
            SubscriptionTier::Premium => "Premium",
        }
    }
}

macro_rules! label_enum_impls {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let options: Vec<&str> = <$ty>::ALL.iter().map(|v| v.label()).collect();
                        anyhow::anyhow!(
                            "Invalid {} '{}', expected one of: {}",
                            $what,
                            wanted,
                            options.join(", ")
                        )
                    })
            }
        }
    };
}

label_enum_impls!(Gender, "gender");
label_enum_impls!(SubscriptionTier, "subscription type");

/// The customer feature record edited during a session
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    pub age: f64,
    pub gender: Gender,
    pub support_calls: f64,
    pub payment_delay: f64,
    pub subscription: SubscriptionTier,
    pub contract_length: f64,
    pub total_spend: f64,
    pub last_interaction: f64,
}

impl Default for CustomerProfile {
    /// Every numeric field starts at its baseline value
    fn default() -> Self {
        let baseline = |feature: Feature| {
            feature
                .numeric_spec()
                .map(|spec| spec.baseline)
                .unwrap_or_default()
        };

        Self {
            age: baseline(Feature::Age),
            gender: Gender::default(),
            support_calls: baseline(Feature::SupportCalls),
            payment_delay: baseline(Feature::PaymentDelay),
            subscription: SubscriptionTier::default(),
            contract_length: baseline(Feature::ContractLength),
            total_spend: baseline(Feature::TotalSpend),
            last_interaction: baseline(Feature::LastInteraction),
        }
    }
}

impl CustomerProfile {
    /// Current value of a numeric feature
    pub fn numeric(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Age => Some(self.age),
            Feature::SupportCalls => Some(self.support_calls),
            Feature::PaymentDelay => Some(self.payment_delay),
            Feature::ContractLength => Some(self.contract_length),
            Feature::TotalSpend => Some(self.total_spend),
            Feature::LastInteraction => Some(self.last_interaction),
            Feature::Gender | Feature::SubscriptionType => None,
        }
    }

    /// Write a numeric feature, clamped and snapped to its spec.
    /// Returns the value actually stored.
    pub fn set_numeric(&mut self, feature: Feature, value: f64) -> crate::Result<f64> {
        let spec = feature
            .numeric_spec()
            .ok_or_else(|| anyhow::anyhow!("{} is not a numeric feature", feature))?;
        let value = spec.sanitize(value);

        let slot = match feature {
            Feature::Age => &mut self.age,
            Feature::SupportCalls => &mut self.support_calls,
            Feature::PaymentDelay => &mut self.payment_delay,
            Feature::ContractLength => &mut self.contract_length,
            Feature::TotalSpend => &mut self.total_spend,
            Feature::LastInteraction => &mut self.last_interaction,
            Feature::Gender | Feature::SubscriptionType => {
                anyhow::bail!("{} is not a numeric feature", feature)
            }
        };
        *slot = value;
        Ok(value)
    }

    /// Parse and write any feature from its textual form.
    /// State is left untouched when the value is rejected.
    pub fn set_from_str(&mut self, feature: Feature, raw: &str) -> crate::Result<()> {
        match feature {
            Feature::Gender => self.gender = raw.parse()?,
            Feature::SubscriptionType => self.subscription = raw.parse()?,
            _ => {
                let value: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", feature, raw.trim()))?;
                if !value.is_finite() {
                    anyhow::bail!("Invalid {} value: {}", feature, raw.trim());
                }
                self.set_numeric(feature, value)?;
            }
        }
        Ok(())
    }

    /// Human readable value of a feature
    pub fn display_value(&self, feature: Feature) -> String {
        match feature {
            Feature::Gender => self.gender.to_string(),
            Feature::SubscriptionType => self.subscription.to_string(),
            Feature::TotalSpend => format!("${:.0}", self.total_spend),
            other => format!("{:.0}", self.numeric(other).unwrap_or_default()),
        }
    }

    /// Parse a full profile from "age,gender,support,delay,tier,contract,spend,last"
    pub fn parse_csv_line(line: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Profile must have {} comma-separated values in the order: {}",
                FEATURE_COUNT,
                FEATURE_ORDER.map(Feature::name).join(", ")
            );
        }

        let mut profile = Self::default();
        for (feature, raw) in FEATURE_ORDER.iter().zip(parts) {
            profile.set_from_str(*feature, raw)?;
        }
        Ok(profile)
    }
}
