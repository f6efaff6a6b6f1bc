//! Pre-trained model artifacts: the churn regressor and the categorical encoder
//!
//! Both artifacts are produced by an external training job and stored as JSON.
//! Loading never fails: a missing or corrupt artifact is logged and treated as
//! absent so the console stays usable in a degraded mode.

use crate::data::{Feature, FEATURE_COUNT};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Regression model mapping the 8-feature vector to a raw churn score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predictor {
    DecisionTree(RegressionTree),
    Linear(LinearModel),
}

impl Predictor {
    /// Evaluate the model on one feature vector
    pub fn predict(&self, features: ArrayView1<f64>) -> crate::Result<f64> {
        if features.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Feature vector must have exactly {} dimensions, got {}",
                FEATURE_COUNT,
                features.len()
            );
        }

        let raw = match self {
            Predictor::DecisionTree(tree) => tree.predict(features),
            Predictor::Linear(linear) => linear.predict(features),
        };
        Ok(raw)
    }

    /// Architecture name reported in dossiers
    pub fn architecture(&self) -> &'static str {
        match self {
            Predictor::DecisionTree(_) => "DecisionTreeRegressor",
            Predictor::Linear(_) => "LinearRegression",
        }
    }

    fn validate(&self) -> crate::Result<()> {
        match self {
            Predictor::DecisionTree(tree) => tree.validate(),
            Predictor::Linear(linear) => linear.validate(),
        }
    }
}

/// Regression tree stored as a flat node array, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

/// A split routes to `left` when `x[feature] <= threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl RegressionTree {
    fn predict(&self, features: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Children must point forward and stay in bounds, which also rules out cycles
    fn validate(&self) -> crate::Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("Decision tree has no nodes");
        }

        let n_nodes = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= FEATURE_COUNT {
                    anyhow::bail!("Node {} splits on unknown feature {}", index, feature);
                }
                if !threshold.is_finite() {
                    anyhow::bail!("Node {} has a non-finite threshold", index);
                }
                for child in [*left, *right] {
                    if child <= index || child >= n_nodes {
                        anyhow::bail!("Node {} has invalid child index {}", index, child);
                    }
                }
            }
        }
        Ok(())
    }
}

/// `intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    fn predict(&self, features: ArrayView1<f64>) -> f64 {
        self.intercept + ArrayView1::from(&self.coefficients[..]).dot(&features)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.coefficients.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Linear model needs {} coefficients, got {}",
                FEATURE_COUNT,
                self.coefficients.len()
            );
        }
        Ok(())
    }
}

/// Label encoder: a label's code is its position in `classes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn transform(&self, label: &str) -> Option<u32> {
        self.classes
            .iter()
            .position(|class| class == label)
            .map(|code| code as u32)
    }
}

/// Categorical encoder as loaded from disk
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CategoricalEncoder {
    #[default]
    Absent,
    /// One encoder applied to every categorical column
    Shared(LabelEncoder),
    /// Column name to encoder
    PerColumn(BTreeMap<String, LabelEncoder>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EncoderFile {
    Shared(LabelEncoder),
    PerColumn(BTreeMap<String, LabelEncoder>),
}

impl From<EncoderFile> for CategoricalEncoder {
    fn from(file: EncoderFile) -> Self {
        match file {
            EncoderFile::Shared(encoder) => CategoricalEncoder::Shared(encoder),
            EncoderFile::PerColumn(columns) => CategoricalEncoder::PerColumn(columns),
        }
    }
}

impl CategoricalEncoder {
    /// Code for `label` in the column of `feature`, if the encoder knows it
    pub fn lookup(&self, feature: Feature, label: &str) -> Option<u32> {
        match self {
            CategoricalEncoder::Absent => None,
            CategoricalEncoder::Shared(encoder) => encoder.transform(label),
            CategoricalEncoder::PerColumn(columns) => columns
                .get(feature.name())
                .and_then(|encoder| encoder.transform(label)),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CategoricalEncoder::Absent)
    }

    fn describe(&self) -> String {
        match self {
            CategoricalEncoder::Absent => "absent (fallback table)".to_string(),
            CategoricalEncoder::Shared(encoder) => {
                format!("shared ({} classes)", encoder.classes.len())
            }
            CategoricalEncoder::PerColumn(columns) => {
                let names: Vec<&str> = columns.keys().map(String::as_str).collect();
                format!("per column [{}]", names.join(", "))
            }
        }
    }
}

/// Artifacts loaded once per process and shared read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct ModelArtifacts {
    pub predictor: Option<Predictor>,
    pub encoder: CategoricalEncoder,
    /// Where the predictor was expected, for error messages
    pub model_path: PathBuf,
}

impl ModelArtifacts {
    pub fn new(predictor: Option<Predictor>, encoder: CategoricalEncoder) -> Self {
        Self {
            predictor,
            encoder,
            model_path: PathBuf::from("model.json"),
        }
    }

    /// Load both artifacts. Failures leave the artifact absent.
    pub fn load(model_path: &Path, encoder_path: &Path) -> Self {
        let predictor = match read_predictor(model_path) {
            Ok(predictor) => {
                log::info!(
                    "Loaded {} from {}",
                    predictor.architecture(),
                    model_path.display()
                );
                Some(predictor)
            }
            Err(e) => {
                log::warn!("Predictor unavailable ({}): {:#}", model_path.display(), e);
                None
            }
        };

        let encoder = match read_encoder(encoder_path) {
            Ok(encoder) => {
                log::info!("Loaded encoder from {}", encoder_path.display());
                encoder
            }
            Err(e) => {
                log::warn!(
                    "Encoder unavailable ({}), using fallback codes: {:#}",
                    encoder_path.display(),
                    e
                );
                CategoricalEncoder::Absent
            }
        };

        Self {
            predictor,
            encoder,
            model_path: model_path.to_path_buf(),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    /// One-line status for the console header
    pub fn status_line(&self) -> String {
        let model = self
            .predictor
            .as_ref()
            .map(|p| p.architecture().to_string())
            .unwrap_or_else(|| "offline".to_string());
        format!("Model: {} | Encoder: {}", model, self.encoder.describe())
    }
}

fn read_predictor(path: &Path) -> crate::Result<Predictor> {
    let text = fs::read_to_string(path)?;
    let predictor: Predictor = serde_json::from_str(&text)?;
    predictor.validate()?;
    Ok(predictor)
}

fn read_encoder(path: &Path) -> crate::Result<CategoricalEncoder> {
    let text = fs::read_to_string(path)?;
    let file: EncoderFile = serde_json::from_str(&text)?;
    Ok(file.into())
}
