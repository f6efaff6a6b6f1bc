//! ChurnForge: a command-line console for customer churn risk
//!
//! Collects eight customer attributes, scores them with a pre-trained regression
//! model loaded from JSON artifacts, and reports the resulting churn risk as a
//! risk topology, gauge, revenue simulation, cohort spread and exportable dossier.

pub mod cli;
pub mod config;
pub mod console;
pub mod data;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::Config;
pub use console::{Command, Console, ReportKind};
pub use data::{CustomerProfile, Feature, Gender, SubscriptionTier, FEATURE_ORDER};
pub use error::EngineError;
pub use export::Dossier;
pub use model::{CategoricalEncoder, ModelArtifacts, Predictor};
pub use pipeline::{normalize_risk, run_prediction, PipelineOptions, RiskBand};
pub use report::{CohortSimulation, RevenueProjection, RiskTopology};
pub use session::{PredictionResult, SessionState};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
