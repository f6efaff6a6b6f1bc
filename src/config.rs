//! Runtime configuration: CLI flags over environment over defaults

use crate::cli::Args;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Pause shown in interactive sessions while the engine "computes"
pub const INTERACTIVE_DELAY_MS: u64 = 1200;

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Predictor artifact
    pub model_path: PathBuf,

    /// Categorical encoder artifact
    pub encoder_path: PathBuf,

    /// Where dossiers and charts are written
    pub output_dir: PathBuf,

    /// Cosmetic delay before inference
    pub inference_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            encoder_path: PathBuf::from("encoder.json"),
            output_dir: PathBuf::from("reports"),
            inference_delay: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            model_path: lookup("CHURNFORGE_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            encoder_path: lookup("CHURNFORGE_ENCODER")
                .map(PathBuf::from)
                .unwrap_or(defaults.encoder_path),

            output_dir: lookup("CHURNFORGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            inference_delay: lookup("CHURNFORGE_DELAY_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.inference_delay),
        }
    }

    /// Environment first, then any flag given on the command line.
    /// Interactive sessions get the cosmetic delay unless one was configured.
    pub fn resolve(args: &Args) -> Self {
        let mut config = Self::from_env();
        let delay_from_env = env::var("CHURNFORGE_DELAY_MS").is_ok();
        config.apply_args(args, delay_from_env);
        config
    }

    fn apply_args(&mut self, args: &Args, delay_configured: bool) {
        if let Some(path) = &args.model {
            self.model_path = path.clone();
        }
        if let Some(path) = &args.encoder {
            self.encoder_path = path.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }

        match args.delay_ms {
            Some(ms) => self.inference_delay = Duration::from_millis(ms),
            None if args.interactive && !delay_configured => {
                self.inference_delay = Duration::from_millis(INTERACTIVE_DELAY_MS)
            }
            None => {}
        }
    }
}
