//! Session state: the current customer record and the latest prediction

use crate::data::CustomerProfile;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Outcome of the last successful prediction run
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Churn risk in percent, always within [0, 100]
    pub risk_pct: f64,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time of the run in seconds, millisecond resolution
    pub latency_secs: f64,
}

impl PredictionResult {
    pub fn new(risk_pct: f64, timestamp: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            risk_pct,
            timestamp,
            latency_secs: (latency.as_secs_f64() * 1000.0).round() / 1000.0,
        }
    }

    pub fn risk_fraction(&self) -> f64 {
        self.risk_pct / 100.0
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

/// Per-session context passed explicitly to the pipeline and every report
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub profile: CustomerProfile,
    /// `None` until the first successful prediction
    pub result: Option<PredictionResult>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Fresh session with default inputs and no prediction
    pub fn new() -> Self {
        Self::with_profile(CustomerProfile::default())
    }

    pub fn with_profile(profile: CustomerProfile) -> Self {
        Self {
            session_id: new_session_id(),
            profile,
            result: None,
        }
    }

    /// Restore default inputs and drop the prediction, keeping the session id
    pub fn reset(&mut self) {
        self.profile = CustomerProfile::default();
        self.result = None;
    }

    pub fn record(&mut self, result: PredictionResult) {
        self.result = Some(result);
    }

    /// Sidebar status: anything above 50% is flagged critical
    pub fn status_line(&self) -> String {
        match &self.result {
            None => "AWAITING TELEMETRY".to_string(),
            Some(result) => {
                let status = if result.risk_pct > 50.0 {
                    "CRITICAL RISK DETECTED"
                } else {
                    "RETENTION SECURE"
                };
                format!("{} | Compute Latency: {}s", status, result.latency_secs)
            }
        }
    }
}

fn new_session_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("CRM-IDX-{}", uuid[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = SessionState::new();
        assert!(session.result.is_none());
        assert_eq!(session.profile, CustomerProfile::default());
        assert_eq!(session.status_line(), "AWAITING TELEMETRY");

        assert!(session.session_id.starts_with("CRM-IDX-"));
        let suffix = &session.session_id["CRM-IDX-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_record_overwrites_and_reset_clears() {
        let mut session = SessionState::new();
        let id = session.session_id.clone();

        session.record(PredictionResult::new(20.0, Utc::now(), Duration::from_millis(5)));
        session.record(PredictionResult::new(75.0, Utc::now(), Duration::from_millis(7)));
        assert_eq!(session.result.as_ref().unwrap().risk_pct, 75.0);
        assert!(session.status_line().starts_with("CRITICAL RISK DETECTED"));

        session.profile.age = 60.0;
        session.reset();
        assert!(session.result.is_none());
        assert_eq!(session.profile.age, 35.0);
        assert_eq!(session.session_id, id);
    }

    #[test]
    fn test_latency_rounded_to_millis() {
        let result = PredictionResult::new(10.0, Utc::now(), Duration::from_micros(1_234_567));
        assert_eq!(result.latency_secs, 1.235);
        assert!(result.timestamp_label().ends_with(" UTC"));
    }
}
