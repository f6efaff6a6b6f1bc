//! Command-line interface definitions and argument parsing

use crate::data::{CustomerProfile, Feature, Gender, SubscriptionTier};
use clap::Parser;
use std::path::PathBuf;

/// Customer churn risk console driven by a pre-trained regression model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the predictor artifact (JSON) [env: CHURNFORGE_MODEL, default: model.json]
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Path to the categorical encoder artifact (JSON) [env: CHURNFORGE_ENCODER, default: encoder.json]
    #[arg(short, long)]
    pub encoder: Option<PathBuf>,

    /// Directory for dossiers and charts [env: CHURNFORGE_OUTPUT_DIR, default: reports]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Full profile as comma-separated values in canonical order
    /// Example: --profile "44,Male,9,21,Basic,3,700,60" for
    /// Age, Gender, Support Calls, Payment Delay, Subscription Type,
    /// Contract Length, Total Spend, Last Interaction
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Age of the account holder (18-90)
    #[arg(long)]
    pub age: Option<f64>,

    /// Gender: Female, Male or Other
    #[arg(long)]
    pub gender: Option<Gender>,

    /// Inbound support escalations (0-30)
    #[arg(long)]
    pub support_calls: Option<f64>,

    /// Average invoice settlement delay in days (0-60)
    #[arg(long)]
    pub payment_delay: Option<f64>,

    /// Subscription tier: Basic, Standard or Premium
    #[arg(long)]
    pub subscription: Option<SubscriptionTier>,

    /// Contract length in months (1-36)
    #[arg(long)]
    pub contract_length: Option<f64>,

    /// Lifetime spend to date (0-20000)
    #[arg(long)]
    pub total_spend: Option<f64>,

    /// Days since the last interaction (0-180)
    #[arg(long)]
    pub last_interaction: Option<f64>,

    /// Write the JSON and CSV dossier after scoring
    #[arg(long)]
    pub export: bool,

    /// Render PNG charts after scoring
    #[arg(long)]
    pub charts: bool,

    /// Start an interactive session on stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Cosmetic delay before inference in milliseconds [env: CHURNFORGE_DELAY_MS]
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the starting profile: defaults, then `--profile`, then single-field flags
    pub fn build_profile(&self) -> crate::Result<CustomerProfile> {
        let mut profile = match &self.profile {
            Some(line) => CustomerProfile::parse_csv_line(line)?,
            None => CustomerProfile::default(),
        };

        if let Some(gender) = self.gender {
            profile.gender = gender;
        }
        if let Some(tier) = self.subscription {
            profile.subscription = tier;
        }

        let numeric_flags = [
            (Feature::Age, self.age),
            (Feature::SupportCalls, self.support_calls),
            (Feature::PaymentDelay, self.payment_delay),
            (Feature::ContractLength, self.contract_length),
            (Feature::TotalSpend, self.total_spend),
            (Feature::LastInteraction, self.last_interaction),
        ];
        for (feature, value) in numeric_flags {
            if let Some(value) = value {
                if !value.is_finite() {
                    anyhow::bail!("Invalid {} value: {}", feature, value);
                }
                profile.set_numeric(feature, value)?;
            }
        }

        Ok(profile)
    }
}
