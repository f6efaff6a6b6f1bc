//! Text console: renders reports and drives the interactive session

use crate::config::Config;
use crate::data::{Feature, FEATURE_ORDER};
use crate::error::EngineError;
use crate::export::Dossier;
use crate::model::ModelArtifacts;
use crate::pipeline::{run_prediction, PipelineOptions, RiskBand};
use crate::report::{
    model_explanation, require_result, CohortSimulation, GaugeZone, RevenueProjection,
    RiskTopology, COHORT_BINS, COHORT_SIZE, COHORT_STD_DEV, FEATURE_IMPORTANCES, MODEL_ACCURACY,
    TOPOLOGY_AXES,
};
use crate::session::SessionState;
use crate::viz;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Which report to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Topology,
    Gauge,
    Explain,
    Revenue,
    Cohort,
    Dossier,
    All,
}

impl FromStr for ReportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "topology" | "radar" => ReportKind::Topology,
            "gauge" => ReportKind::Gauge,
            "explain" | "model" => ReportKind::Explain,
            "revenue" => ReportKind::Revenue,
            "cohort" | "variance" => ReportKind::Cohort,
            "dossier" => ReportKind::Dossier,
            "" | "all" => ReportKind::All,
            other => anyhow::bail!(
                "Unknown report '{}'. Try: topology, gauge, explain, revenue, cohort, dossier, all",
                other
            ),
        };
        Ok(kind)
    }
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(Feature, String),
    Show,
    Predict,
    Report(ReportKind),
    Export,
    Charts,
    Reset,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, rest.trim()))
            .unwrap_or((line, ""));

        let command = match verb.to_ascii_lowercase().as_str() {
            "set" => {
                // the value is the last token, the field name may contain spaces
                let (field, value) = rest
                    .rsplit_once(|c: char| c.is_whitespace() || c == '=')
                    .ok_or_else(|| anyhow::anyhow!("Usage: set <field> <value>"))?;
                Command::Set(field.trim().parse()?, value.trim().to_string())
            }
            "show" | "inputs" => Command::Show,
            "predict" | "run" => Command::Predict,
            "report" => Command::Report(rest.parse()?),
            "export" => Command::Export,
            "charts" => Command::Charts,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => anyhow::bail!("Unknown command '{}'. Type 'help' for a list.", other),
        };
        Ok(command)
    }
}

/// Whether the session loop keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
Commands:
  set <field> <value>   edit an input (e.g. set support calls 7, set gender Male)
  show                  list the current inputs
  predict               run the churn engine on the current inputs
  report [kind]         topology | gauge | explain | revenue | cohort | dossier | all
  export                write the JSON and CSV dossier
  charts                render PNG charts
  reset                 restore default inputs and clear the prediction
  quit                  leave the session";

/// A console session bound to the loaded artifacts
pub struct Console<'a> {
    pub session: SessionState,
    artifacts: &'a ModelArtifacts,
    config: &'a Config,
}

impl<'a> Console<'a> {
    pub fn new(session: SessionState, artifacts: &'a ModelArtifacts, config: &'a Config) -> Self {
        Self {
            session,
            artifacts,
            config,
        }
    }

    /// Read commands until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> crate::Result<()> {
        writeln!(out, "Session {} | {}", self.session.session_id, self.artifacts.status_line())?;
        writeln!(out, "Type 'help' for commands.")?;

        let mut lines = input.lines();
        loop {
            write!(out, "churnforge> ")?;
            out.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    if self.execute(command, out)? == Flow::Quit {
                        break;
                    }
                }
                Err(e) => writeln!(out, "! {}", e)?,
            }
        }
        Ok(())
    }

    /// Run one command. User mistakes are printed; I/O failures propagate.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> crate::Result<Flow> {
        match command {
            Command::Set(feature, value) => {
                match self.session.profile.set_from_str(feature, &value) {
                    Ok(()) => writeln!(
                        out,
                        "{} = {}",
                        feature,
                        self.session.profile.display_value(feature)
                    )?,
                    Err(e) => writeln!(out, "! {}", e)?,
                }
            }
            Command::Show => self.print_inputs(out)?,
            Command::Predict => self.predict(out)?,
            Command::Report(kind) => self.print_report(kind, out)?,
            Command::Export => self.export(out)?,
            Command::Charts => self.charts(out)?,
            Command::Reset => {
                self.session.reset();
                writeln!(out, "Inputs restored to defaults, prediction cleared.")?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Score the current inputs and print the headline
    pub fn predict<W: Write>(&mut self, out: &mut W) -> crate::Result<()> {
        let options = PipelineOptions {
            delay: self.config.inference_delay,
        };

        match run_prediction(&mut self.session, self.artifacts, &options) {
            Ok(result) => {
                let band = RiskBand::classify(result.risk_pct);
                writeln!(out, "{}", band.headline())?;
                writeln!(out, "  Churn risk: {:.1}%", result.risk_pct)?;
                writeln!(
                    out,
                    "  Algorithmic Assessment Complete | {:.0}% Global Accuracy Validation",
                    MODEL_ACCURACY * 100.0
                )?;
                writeln!(out, "  {}", self.session.status_line())?;
                Ok(())
            }
            Err(e) => match e.downcast_ref::<EngineError>() {
                Some(engine_error) => {
                    writeln!(out, "! {}", engine_error)?;
                    Ok(())
                }
                None => Err(e),
            },
        }
    }

    pub fn print_inputs<W: Write>(&self, out: &mut W) -> crate::Result<()> {
        let profile = &self.session.profile;
        writeln!(out, "Customer inputs (session {}):", self.session.session_id)?;

        for feature in FEATURE_ORDER {
            let value = profile.display_value(feature);
            match (feature.numeric_spec(), profile.numeric(feature)) {
                (Some(spec), Some(current)) => {
                    let delta = spec.delta_pct(current);
                    let marker = match (delta > 0.0, delta < 0.0, spec.inverse_delta) {
                        (true, _, true) | (_, true, false) => " (unfavorable)",
                        _ => "",
                    };
                    writeln!(
                        out,
                        "  {:<18} {:>8} {:<9} {:+.1}% vs avg user{}   [{}..{}]",
                        feature.name(),
                        value,
                        spec.unit,
                        delta,
                        marker,
                        spec.min,
                        spec.max
                    )?;
                }
                _ => writeln!(out, "  {:<18} {:>8}", feature.name(), value)?,
            }
        }
        Ok(())
    }

    pub fn print_report<W: Write>(&self, kind: ReportKind, out: &mut W) -> crate::Result<()> {
        // the explanation is static and available before any prediction
        if kind == ReportKind::Explain {
            return self.print_explanation(out);
        }

        let result = match require_result(&self.session) {
            Ok(result) => result,
            Err(e) => {
                writeln!(out, "! {}", e)?;
                return Ok(());
            }
        };
        let profile = &self.session.profile;

        match kind {
            ReportKind::Topology => {
                let topology = RiskTopology::from_profile(profile);
                writeln!(out, "Risk topology (0 = safe, 1 = worst case):")?;
                for ((axis, value), ideal) in TOPOLOGY_AXES
                    .iter()
                    .zip(topology.values.iter())
                    .zip(topology.ideal.iter())
                {
                    writeln!(out, "  {:<20} {:>5.2}   ideal {:>4.2}", axis, value, ideal)?;
                }
                let exposures = topology.exposures();
                if let Some((axis, gap)) = exposures.first() {
                    writeln!(out, "  Largest exposure: {} (+{:.2} over ideal)", axis, gap)?;
                }
            }
            ReportKind::Gauge => {
                let zone = GaugeZone::for_risk(result.risk_pct);
                let (low, high) = zone.range();
                writeln!(
                    out,
                    "Risk gauge: {:.1}% in the {} zone [{:.0}-{:.0}]",
                    result.risk_pct,
                    zone.label(),
                    low,
                    high
                )?;
            }
            ReportKind::Revenue => {
                let revenue = RevenueProjection::compute(profile, result.risk_pct);
                writeln!(out, "Revenue impact simulation:")?;
                writeln!(out, "  Monthly revenue   ${:>12.2}", revenue.monthly_revenue)?;
                writeln!(out, "  Annual value      ${:>12.2}", revenue.annual_revenue)?;
                writeln!(out, "  Revenue secured   ${:>12.2}", revenue.revenue_secured)?;
                writeln!(out, "  Capital at risk   ${:>12.2}", revenue.revenue_at_risk)?;
            }
            ReportKind::Cohort => {
                let cohort = CohortSimulation::run(result.risk_pct)?;
                writeln!(
                    out,
                    "Cohort variance: {} look-alike customers, sigma {:.0} points",
                    COHORT_SIZE, COHORT_STD_DEV
                )?;
                writeln!(
                    out,
                    "  mean {:.1}%  std {:.1}  min {:.1}%  max {:.1}%  high-risk share {:.0}%",
                    cohort.mean(),
                    cohort.std_dev(),
                    cohort.min(),
                    cohort.max(),
                    cohort.high_risk_share() * 100.0
                )?;
                let width = 100.0 / COHORT_BINS as f64;
                for (bin, count) in cohort.histogram(COHORT_BINS).iter().enumerate() {
                    if *count > 0 {
                        let low = bin as f64 * width;
                        writeln!(
                            out,
                            "  {:>5.1}-{:<5.1} {}",
                            low,
                            low + width,
                            "#".repeat(*count)
                        )?;
                    }
                }
            }
            ReportKind::Dossier => {
                writeln!(out, "{}", self.dossier()?.to_json()?)?;
            }
            ReportKind::All => {
                for kind in [
                    ReportKind::Topology,
                    ReportKind::Gauge,
                    ReportKind::Explain,
                    ReportKind::Revenue,
                    ReportKind::Cohort,
                ] {
                    self.print_report(kind, out)?;
                    writeln!(out)?;
                }
            }
            ReportKind::Explain => {}
        }
        Ok(())
    }

    fn print_explanation<W: Write>(&self, out: &mut W) -> crate::Result<()> {
        writeln!(out, "Model architecture:")?;
        for (title, text) in model_explanation() {
            writeln!(out, "  * {}: {}", title, text)?;
        }
        writeln!(out, "Feature importance (illustrative):")?;
        for (feature, weight) in FEATURE_IMPORTANCES {
            let bar = "#".repeat((weight * 100.0).round() as usize / 2);
            writeln!(out, "  {:<18} {:>4.0}% {}", feature.name(), weight * 100.0, bar)?;
        }
        Ok(())
    }

    fn dossier(&self) -> crate::Result<Dossier> {
        let result = require_result(&self.session)?;
        let architecture = self
            .artifacts
            .predictor
            .as_ref()
            .map(|p| p.architecture())
            .unwrap_or("unknown");
        Ok(Dossier::new(&self.session, result, architecture))
    }

    pub fn export<W: Write>(&self, out: &mut W) -> crate::Result<()> {
        if self.session.result.is_none() {
            writeln!(out, "! {}", EngineError::NoPrediction)?;
            return Ok(());
        }
        let files = self.dossier()?.write_to_dir(&self.config.output_dir)?;
        writeln!(out, "Dossier saved to: {}", files.json.display())?;
        writeln!(out, "Ledger saved to: {}", files.csv.display())?;
        Ok(())
    }

    pub fn charts<W: Write>(&self, out: &mut W) -> crate::Result<()> {
        let result = match require_result(&self.session) {
            Ok(result) => result,
            Err(e) => {
                writeln!(out, "! {}", e)?;
                return Ok(());
            }
        };
        let profile = &self.session.profile;

        let written = viz::generate_chart_report(
            &RiskTopology::from_profile(profile),
            result,
            &RevenueProjection::compute(profile, result.risk_pct),
            &CohortSimulation::run(result.risk_pct)?,
            &self.config.output_dir,
        )?;
        for path in written {
            writeln!(out, "Chart saved to: {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Gender, FEATURE_COUNT};
    use crate::model::{CategoricalEncoder, LinearModel, Predictor};
    use std::io::Cursor;

    fn artifacts(raw: Option<f64>) -> ModelArtifacts {
        let predictor = raw.map(|intercept| {
            Predictor::Linear(LinearModel {
                intercept,
                coefficients: vec![0.0; FEATURE_COUNT],
            })
        });
        ModelArtifacts::new(predictor, CategoricalEncoder::Absent)
    }

    fn run_script(artifacts: &ModelArtifacts, script: &str) -> (SessionState, String) {
        let config = Config::default();
        let mut console = Console::new(SessionState::new(), artifacts, &config);
        let mut out = Vec::new();
        console.run(Cursor::new(script), &mut out).unwrap();
        (console.session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "set support calls 7".parse::<Command>().unwrap(),
            Command::Set(Feature::SupportCalls, "7".to_string())
        );
        assert_eq!(
            "set gender=Male".parse::<Command>().unwrap(),
            Command::Set(Feature::Gender, "Male".to_string())
        );
        assert_eq!(
            "report cohort".parse::<Command>().unwrap(),
            Command::Report(ReportKind::Cohort)
        );
        assert_eq!("report".parse::<Command>().unwrap(), Command::Report(ReportKind::All));
        assert_eq!("  PREDICT ".parse::<Command>().unwrap(), Command::Predict);
        assert!("set".parse::<Command>().is_err());
        assert!("set height 3".parse::<Command>().is_err());
        assert!("fly".parse::<Command>().is_err());
    }

    #[test]
    fn test_session_edits_and_predicts() {
        let artifacts = artifacts(Some(0.42));
        let (session, output) = run_script(
            &artifacts,
            "set age 150\nset gender male\nset gender robot\npredict\nreport gauge\nquit\nset age 20\n",
        );

        assert_eq!(session.profile.age, 90.0);
        assert_eq!(session.profile.gender, Gender::Male);
        assert!(output.contains("Invalid gender 'robot'"));
        assert!(output.contains("MODERATE ATTRITION RISK"));
        assert!(output.contains("Churn risk: 42.0%"));
        assert!(output.contains("elevated zone"));
        assert!((session.result.unwrap().risk_pct - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_refused_without_model() {
        let artifacts = artifacts(None);
        let (session, output) = run_script(&artifacts, "predict\nreport revenue\n");

        assert!(session.result.is_none());
        assert!(output.contains("SYSTEM HALT"));
        assert!(output.contains("Execute the churn engine first"));
    }

    #[test]
    fn test_reports_after_prediction() {
        let artifacts = artifacts(Some(25.0));
        let (_, output) = run_script(
            &artifacts,
            "set total spend 1200\nset contract length 11\npredict\nreport revenue\nreport cohort\nreport dossier\n",
        );

        assert!(output.contains("CUSTOMER RETENTION SECURE"));
        assert!(output.contains("Revenue secured   $      900.00"));
        assert!(output.contains("Capital at risk   $      300.00"));
        assert!(output.contains("Cohort variance: 100 look-alike customers"));
        assert!(output.contains("\"risk_score_percentage\": 25.0"));
    }

    #[test]
    fn test_explain_available_before_prediction() {
        let artifacts = artifacts(None);
        let (_, output) = run_script(&artifacts, "report explain\n");
        assert!(output.contains("decision tree regressor"));
        assert!(output.contains("Last Interaction"));
    }

    #[test]
    fn test_reset_clears_prediction() {
        let artifacts = artifacts(Some(0.9));
        let (session, output) = run_script(&artifacts, "set age 60\npredict\nreset\nshow\n");
        assert!(output.contains("HIGH CHURN PROBABILITY DETECTED"));
        assert!(session.result.is_none());
        assert_eq!(session.profile.age, 35.0);
    }

    #[test]
    fn test_export_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let artifacts = artifacts(Some(0.7));
        let mut console = Console::new(SessionState::new(), &artifacts, &config);
        let mut out = Vec::new();

        console.export(&mut out).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("Execute the churn engine first"));

        console.predict(&mut out).unwrap();
        console.export(&mut out).unwrap();
        let id = console.session.session_id.clone();
        assert!(dir.path().join(format!("Customer_Payload_{}.json", id)).exists());
        assert!(dir
            .path()
            .join(format!("Customer_Retention_Dossier_{}.csv", id))
            .exists());
    }
}
