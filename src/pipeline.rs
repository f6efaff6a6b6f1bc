//! Prediction pipeline: encode -> assemble -> infer -> normalize -> record

use crate::data::{CustomerProfile, Feature, Gender, SubscriptionTier, FEATURE_COUNT};
use crate::error::EngineError;
use crate::model::{CategoricalEncoder, ModelArtifacts};
use crate::session::{PredictionResult, SessionState};
use chrono::Utc;
use ndarray::Array1;
use std::fmt;
use std::time::{Duration, Instant};

/// Raw outputs above this are read as already being a percentage
pub const PERCENT_SCALE_THRESHOLD: f64 = 2.0;

/// Risk above this is classified high
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;

/// Risk above this (and up to the high threshold) is classified moderate
pub const MODERATE_RISK_THRESHOLD: f64 = 30.0;

/// Where a categorical code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSource {
    Encoder,
    Fallback,
}

/// Integer codes for the two categorical fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedCategoricals {
    pub gender: u32,
    pub subscription: u32,
    pub source: CodeSource,
}

/// Alphabetical label-encoder codes used when the encoder cannot answer
pub fn fallback_gender_code(gender: Gender) -> u32 {
    match gender {
        Gender::Female => 0,
        Gender::Male => 1,
        Gender::Other => 2,
    }
}

pub fn fallback_subscription_code(tier: SubscriptionTier) -> u32 {
    match tier {
        SubscriptionTier::Basic => 0,
        SubscriptionTier::Premium => 1,
        SubscriptionTier::Standard => 2,
    }
}

/// Map both categorical fields to codes. Never fails.
///
/// The encoder is only trusted when it knows both labels; otherwise both codes
/// come from the fallback table so the pair is always from one scheme.
pub fn encode_categoricals(
    profile: &CustomerProfile,
    encoder: &CategoricalEncoder,
) -> EncodedCategoricals {
    let from_encoder = encoder
        .lookup(Feature::Gender, profile.gender.label())
        .zip(encoder.lookup(Feature::SubscriptionType, profile.subscription.label()));

    match from_encoder {
        Some((gender, subscription)) => EncodedCategoricals {
            gender,
            subscription,
            source: CodeSource::Encoder,
        },
        None => {
            if !encoder.is_absent() {
                log::debug!("Encoder lookup failed, using fallback codes");
            }
            EncodedCategoricals {
                gender: fallback_gender_code(profile.gender),
                subscription: fallback_subscription_code(profile.subscription),
                source: CodeSource::Fallback,
            }
        }
    }
}

/// Build the predictor input in canonical feature order
pub fn assemble_features(profile: &CustomerProfile, codes: &EncodedCategoricals) -> Array1<f64> {
    let features = [
        profile.age,
        f64::from(codes.gender),
        profile.support_calls,
        profile.payment_delay,
        f64::from(codes.subscription),
        profile.contract_length,
        profile.total_spend,
        profile.last_interaction,
    ];
    debug_assert_eq!(features.len(), FEATURE_COUNT);
    Array1::from(features.to_vec())
}

/// Scale a raw regressor output to a percentage in [0, 100].
///
/// Outputs up to 2.0 are read as probabilities and clamped to [0, 1] before
/// scaling; larger outputs are read as percentages and capped at 100. The
/// cutoff is a heuristic that tolerates models trained on either scale.
pub fn normalize_risk(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    if raw > PERCENT_SCALE_THRESHOLD {
        raw.min(100.0)
    } else {
        raw.clamp(0.0, 1.0) * 100.0
    }
}

/// Risk classification shown next to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    High,
    Moderate,
    Secure,
}

impl RiskBand {
    pub fn classify(risk_pct: f64) -> Self {
        if risk_pct > HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if risk_pct > MODERATE_RISK_THRESHOLD {
            RiskBand::Moderate
        } else {
            RiskBand::Secure
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            RiskBand::High => "HIGH CHURN PROBABILITY DETECTED",
            RiskBand::Moderate => "MODERATE ATTRITION RISK",
            RiskBand::Secure => "CUSTOMER RETENTION SECURE",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskBand::High => "high",
            RiskBand::Moderate => "moderate",
            RiskBand::Secure => "secure",
        };
        f.write_str(name)
    }
}

/// Run-time knobs for the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Cosmetic pause before inference, counted in the reported latency
    pub delay: Duration,
}

/// Score the session's current profile and record the result.
///
/// Refused with [`EngineError::ModelUnavailable`] when no predictor is loaded;
/// the session is not touched in that case.
pub fn run_prediction<'s>(
    session: &'s mut SessionState,
    artifacts: &ModelArtifacts,
    options: &PipelineOptions,
) -> crate::Result<&'s PredictionResult> {
    let predictor = artifacts.predictor.as_ref().ok_or_else(|| {
        EngineError::ModelUnavailable(artifacts.model_path.display().to_string())
    })?;

    let start_time = Instant::now();
    if !options.delay.is_zero() {
        std::thread::sleep(options.delay);
    }

    let codes = encode_categoricals(&session.profile, &artifacts.encoder);
    let features = assemble_features(&session.profile, &codes);
    log::debug!("Feature vector ({:?} codes): {}", codes.source, features);

    let raw = predictor.predict(features.view())?;
    let risk_pct = normalize_risk(raw);
    let elapsed = start_time.elapsed();

    log::info!(
        "Session {} scored: raw={:.4} risk={:.1}% ({})",
        session.session_id,
        raw,
        risk_pct,
        RiskBand::classify(risk_pct)
    );

    session.record(PredictionResult::new(risk_pct, Utc::now(), elapsed));
    session
        .result
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Prediction result was not recorded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LabelEncoder, LinearModel, Predictor};
    use std::collections::BTreeMap;

    fn constant_model(raw: f64) -> Predictor {
        Predictor::Linear(LinearModel {
            intercept: raw,
            coefficients: vec![0.0; FEATURE_COUNT],
        })
    }

    #[test]
    fn test_normalize_risk_branches() {
        assert!((normalize_risk(0.42) - 42.0).abs() < 1e-9);
        assert_eq!(normalize_risk(75.0), 75.0);
        assert_eq!(normalize_risk(1.5), 100.0);
        assert_eq!(normalize_risk(2.0), 100.0);
        assert_eq!(normalize_risk(2.5), 2.5);
        assert_eq!(normalize_risk(250.0), 100.0);
        assert_eq!(normalize_risk(-3.0), 0.0);
        assert_eq!(normalize_risk(f64::NAN), 0.0);
        assert_eq!(normalize_risk(f64::INFINITY), 100.0);
        assert_eq!(normalize_risk(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_normalize_risk_is_bounded() {
        let mut raw = -50.0;
        while raw < 500.0 {
            let risk = normalize_risk(raw);
            assert!((0.0..=100.0).contains(&risk), "raw {} gave {}", raw, risk);
            raw += 0.37;
        }
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(RiskBand::classify(60.0), RiskBand::Moderate);
        assert_eq!(RiskBand::classify(60.1), RiskBand::High);
        assert_eq!(RiskBand::classify(30.0), RiskBand::Secure);
        assert_eq!(RiskBand::classify(30.1), RiskBand::Moderate);
        assert_eq!(RiskBand::classify(0.0), RiskBand::Secure);
        assert_eq!(RiskBand::classify(100.0), RiskBand::High);
    }

    #[test]
    fn test_encoding_prefers_encoder() {
        let mut columns = BTreeMap::new();
        columns.insert("Gender".to_string(), LabelEncoder::new(["Other", "Male", "Female"]));
        columns.insert(
            "Subscription Type".to_string(),
            LabelEncoder::new(["Premium", "Standard", "Basic"]),
        );
        let encoder = CategoricalEncoder::PerColumn(columns);

        let profile = CustomerProfile::default();
        let codes = encode_categoricals(&profile, &encoder);
        assert_eq!(codes.source, CodeSource::Encoder);
        assert_eq!(codes.gender, 2);
        assert_eq!(codes.subscription, 1);
    }

    #[test]
    fn test_encoding_falls_back_for_every_label() {
        let partial = CategoricalEncoder::Shared(LabelEncoder::new(["Female", "Male"]));

        for gender in Gender::ALL {
            for tier in SubscriptionTier::ALL {
                let profile = CustomerProfile {
                    gender,
                    subscription: tier,
                    ..CustomerProfile::default()
                };
                for encoder in [&CategoricalEncoder::Absent, &partial] {
                    let codes = encode_categoricals(&profile, encoder);
                    assert_eq!(codes.source, CodeSource::Fallback);
                    assert_eq!(codes.gender, fallback_gender_code(gender));
                    assert_eq!(codes.subscription, fallback_subscription_code(tier));
                }
            }
        }
    }

    #[test]
    fn test_feature_vector_order() {
        let profile = CustomerProfile::parse_csv_line("44,Male,9,21,Premium,3,700,60").unwrap();
        let codes = encode_categoricals(&profile, &CategoricalEncoder::Absent);
        let features = assemble_features(&profile, &codes);

        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(
            features.to_vec(),
            vec![44.0, 1.0, 9.0, 21.0, 1.0, 3.0, 700.0, 60.0]
        );
    }

    #[test]
    fn test_run_prediction_records_result() {
        let artifacts = ModelArtifacts::new(Some(constant_model(0.42)), CategoricalEncoder::Absent);
        let mut session = SessionState::new();

        let result = run_prediction(&mut session, &artifacts, &PipelineOptions::default())
            .unwrap()
            .clone();
        assert!((result.risk_pct - 42.0).abs() < 1e-9);
        assert!(result.latency_secs >= 0.0);
        assert_eq!(session.result, Some(result));
    }

    #[test]
    fn test_run_prediction_refused_without_model() {
        let artifacts = ModelArtifacts::new(None, CategoricalEncoder::Absent);
        let mut session = SessionState::new();

        let err = run_prediction(&mut session, &artifacts, &PipelineOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::ModelUnavailable(_))
        ));
        assert!(session.result.is_none());
    }

    #[test]
    fn test_refusal_keeps_previous_result() {
        let loaded = ModelArtifacts::new(Some(constant_model(80.0)), CategoricalEncoder::Absent);
        let offline = ModelArtifacts::new(None, CategoricalEncoder::Absent);
        let mut session = SessionState::new();

        run_prediction(&mut session, &loaded, &PipelineOptions::default()).unwrap();
        let before = session.result.clone();
        assert!(run_prediction(&mut session, &offline, &PipelineOptions::default()).is_err());
        assert_eq!(session.result, before);
    }
}
