//! Integration tests for ChurnForge

use churnforge::{
    normalize_risk, run_prediction, CohortSimulation, Dossier, EngineError, ModelArtifacts,
    PipelineOptions, RevenueProjection, RiskBand, RiskTopology, SessionState,
};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

/// Decision tree exported from the training job:
/// Payment Delay <= 14 -> (Last Interaction <= 30 -> 0.12 | 0.48), else
/// Support Calls <= 5 -> 0.55 | 0.91
fn create_model_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "kind": "decision_tree",
            "nodes": [
                {{"feature": 3, "threshold": 14.0, "left": 1, "right": 4}},
                {{"feature": 7, "threshold": 30.0, "left": 2, "right": 3}},
                {{"value": 0.12}},
                {{"value": 0.48}},
                {{"feature": 2, "threshold": 5.0, "left": 5, "right": 6}},
                {{"value": 0.55}},
                {{"value": 0.91}}
            ]
        }}"#
    )
    .unwrap();
    file
}

fn create_encoder_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"Gender": ["Female", "Male", "Other"], "Subscription Type": ["Basic", "Premium", "Standard"]}}"#
    )
    .unwrap();
    file
}

fn load_test_artifacts() -> (ModelArtifacts, NamedTempFile, NamedTempFile) {
    let model = create_model_file();
    let encoder = create_encoder_file();
    let artifacts = ModelArtifacts::load(model.path(), encoder.path());
    (artifacts, model, encoder)
}

#[test]
fn test_end_to_end_pipeline() {
    let (artifacts, _model, _encoder) = load_test_artifacts();
    assert!(artifacts.is_model_loaded());
    assert!(!artifacts.encoder.is_absent());

    // Default profile: payment delay 5, last interaction 14
    let mut session = SessionState::new();
    let result = run_prediction(&mut session, &artifacts, &PipelineOptions::default())
        .unwrap()
        .clone();
    assert!((result.risk_pct - 12.0).abs() < 1e-9);
    assert_eq!(RiskBand::classify(result.risk_pct), RiskBand::Secure);

    // Late payer with many escalations
    session.profile.set_from_str("Payment Delay".parse().unwrap(), "30").unwrap();
    session.profile.set_from_str("Support Calls".parse().unwrap(), "9").unwrap();
    let result = run_prediction(&mut session, &artifacts, &PipelineOptions::default())
        .unwrap()
        .clone();
    assert!((result.risk_pct - 91.0).abs() < 1e-9);
    assert_eq!(RiskBand::classify(result.risk_pct), RiskBand::High);

    // Only the latest result is kept
    assert_eq!(session.result.as_ref().unwrap().risk_pct, result.risk_pct);
}

#[test]
fn test_missing_model_refuses_prediction() {
    let encoder = create_encoder_file();
    let artifacts = ModelArtifacts::load(Path::new("/nonexistent/model.json"), encoder.path());
    assert!(!artifacts.is_model_loaded());

    let mut session = SessionState::new();
    let err = run_prediction(&mut session, &artifacts, &PipelineOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::ModelUnavailable(path)) if path.contains("model.json")
    ));
    assert!(session.result.is_none());
}

#[test]
fn test_corrupt_encoder_falls_back() {
    let model = create_model_file();
    let mut corrupt = NamedTempFile::new().unwrap();
    write!(corrupt, "\u{0}\u{1}binary garbage").unwrap();

    let artifacts = ModelArtifacts::load(model.path(), corrupt.path());
    assert!(artifacts.is_model_loaded());
    assert!(artifacts.encoder.is_absent());

    let mut session = SessionState::new();
    assert!(run_prediction(&mut session, &artifacts, &PipelineOptions::default()).is_ok());
}

#[test]
fn test_reports_from_session() {
    let (artifacts, _model, _encoder) = load_test_artifacts();
    let mut session = SessionState::new();
    session.profile.set_from_str("spend".parse().unwrap(), "1200").unwrap();
    session.profile.set_from_str("contract".parse().unwrap(), "11").unwrap();
    session.profile.set_from_str("last interaction".parse().unwrap(), "60").unwrap();

    let risk = run_prediction(&mut session, &artifacts, &PipelineOptions::default())
        .unwrap()
        .risk_pct;
    assert!((risk - 48.0).abs() < 1e-9);

    let revenue = RevenueProjection::compute(&session.profile, risk);
    assert!((revenue.annual_revenue - 1200.0).abs() < 1e-9);
    assert!((revenue.revenue_at_risk + revenue.revenue_secured - revenue.annual_revenue).abs() < 1e-9);

    let topology = RiskTopology::from_profile(&session.profile);
    assert!(topology.values.iter().all(|v| (0.0..=1.0).contains(v)));

    let first = CohortSimulation::run(risk).unwrap();
    let second = CohortSimulation::run(risk).unwrap();
    assert_eq!(first.samples, second.samples);
}

#[test]
fn test_dossier_export_round_trip() {
    let (artifacts, _model, _encoder) = load_test_artifacts();
    let mut session = SessionState::new();
    run_prediction(&mut session, &artifacts, &PipelineOptions::default()).unwrap();

    let result = session.result.clone().unwrap();
    let dossier = Dossier::new(&session, &result, "DecisionTreeRegressor");
    let dir = tempdir().unwrap();
    let files = dossier.write_to_dir(dir.path()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
    assert_eq!(json["metadata"]["transaction_id"], session.session_id.as_str());
    assert_eq!(json["metadata"]["model_architecture"], "DecisionTreeRegressor");
    assert_eq!(json["churn_prediction"]["status"], "Secure");
    assert_eq!(json["customer_telemetry"]["Gender"], "Female");

    let csv = std::fs::read_to_string(&files.csv).unwrap();
    let row: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
    let csv_risk: f64 = row[8].parse().unwrap();
    let json_risk = json["churn_prediction"]["risk_score_percentage"].as_f64().unwrap();
    assert!((csv_risk - json_risk).abs() < 1e-9);
}

#[test]
fn test_normalization_examples() {
    assert!((normalize_risk(0.42) - 42.0).abs() < 1e-9);
    assert_eq!(normalize_risk(75.0), 75.0);
    assert_eq!(normalize_risk(1.5), 100.0);
}
