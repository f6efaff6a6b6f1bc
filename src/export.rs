//! Retention dossier: the latest record and prediction as JSON and CSV

use crate::data::CustomerProfile;
use crate::report::MODEL_ACCURACY;
use crate::session::{PredictionResult, SessionState};
use polars::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Status threshold used by the dossier (inclusive)
pub const DOSSIER_HIGH_RISK_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dossier {
    pub metadata: DossierMetadata,
    pub churn_prediction: ChurnPrediction,
    pub customer_telemetry: CustomerTelemetry,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DossierMetadata {
    pub transaction_id: String,
    pub timestamp: String,
    pub model_architecture: String,
    pub validation_accuracy: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChurnPrediction {
    pub risk_score_percentage: f64,
    pub status: String,
}

/// The eight inputs, serialized under their column names in canonical order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerTelemetry {
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Support Calls")]
    pub support_calls: f64,
    #[serde(rename = "Payment Delay")]
    pub payment_delay: f64,
    #[serde(rename = "Subscription Type")]
    pub subscription_type: String,
    #[serde(rename = "Contract Length")]
    pub contract_length: f64,
    #[serde(rename = "Total Spend")]
    pub total_spend: f64,
    #[serde(rename = "Last Interaction")]
    pub last_interaction: f64,
}

impl From<&CustomerProfile> for CustomerTelemetry {
    fn from(profile: &CustomerProfile) -> Self {
        Self {
            age: profile.age,
            gender: profile.gender.to_string(),
            support_calls: profile.support_calls,
            payment_delay: profile.payment_delay,
            subscription_type: profile.subscription.to_string(),
            contract_length: profile.contract_length,
            total_spend: profile.total_spend,
            last_interaction: profile.last_interaction,
        }
    }
}

/// Paths of a written dossier
#[derive(Debug, Clone)]
pub struct DossierFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl Dossier {
    pub fn new(session: &SessionState, result: &PredictionResult, model_architecture: &str) -> Self {
        let status = if result.risk_pct >= DOSSIER_HIGH_RISK_THRESHOLD {
            "High Risk"
        } else {
            "Secure"
        };

        Self {
            metadata: DossierMetadata {
                transaction_id: session.session_id.clone(),
                timestamp: result.timestamp_label(),
                model_architecture: model_architecture.to_string(),
                validation_accuracy: MODEL_ACCURACY,
            },
            churn_prediction: ChurnPrediction {
                risk_score_percentage: result.risk_pct,
                status: status.to_string(),
            },
            customer_telemetry: CustomerTelemetry::from(&session.profile),
        }
    }

    /// Nested layout, four-space indented
    pub fn to_json(&self) -> crate::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Flat layout: the eight inputs followed by risk and timestamp
    pub fn to_dataframe(&self) -> crate::Result<DataFrame> {
        let t = &self.customer_telemetry;
        let df = df!(
            "Age" => [t.age],
            "Gender" => [t.gender.as_str()],
            "Support Calls" => [t.support_calls],
            "Payment Delay" => [t.payment_delay],
            "Subscription Type" => [t.subscription_type.as_str()],
            "Contract Length" => [t.contract_length],
            "Total Spend" => [t.total_spend],
            "Last Interaction" => [t.last_interaction],
            "Churn_Risk_Pct" => [self.churn_prediction.risk_score_percentage],
            "Timestamp" => [self.metadata.timestamp.as_str()]
        )?;
        Ok(df)
    }

    pub fn to_csv(&self) -> crate::Result<String> {
        let mut df = self.to_dataframe()?;
        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write both layouts into `dir`, named after the session id
    pub fn write_to_dir(&self, dir: &Path) -> crate::Result<DossierFiles> {
        fs::create_dir_all(dir)?;
        let id = &self.metadata.transaction_id;

        let json = dir.join(format!("Customer_Payload_{}.json", id));
        fs::write(&json, self.to_json()?)?;

        let csv = dir.join(format!("Customer_Retention_Dossier_{}.csv", id));
        fs::write(&csv, self.to_csv()?)?;

        log::info!("Dossier written: {} and {}", json.display(), csv.display());
        Ok(DossierFiles { json, csv })
    }
}
