/*!
 * Sources of per-frame label log-probabilities for forced alignment.
 *
 * The acoustic model itself runs outside this process: either behind an
 * HTTP service or as an external inference command. Both return the same
 * JSON document:
 *
 * ```json
 * {"labels": ["-", "|", "E", ...], "emissions": [[...], ...], "blank_id": 0, "frame_ratio": 320.0}
 * ```
 */

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::app_config::{AlignerBackend, AlignerConfig};
use crate::errors::AlignmentError;

/// Emission matrix returned by an acoustic model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionMatrix {
    /// Label vocabulary, index matches the emission columns
    pub labels: Vec<String>,

    /// One row of scores per frame
    pub emissions: Vec<Vec<f32>>,

    /// Index of the CTC blank label
    #[serde(default)]
    pub blank_id: usize,

    /// Audio samples per emission frame, derived from the audio when absent
    #[serde(default)]
    pub frame_ratio: Option<f64>,
}

impl EmissionMatrix {
    pub fn num_frames(&self) -> usize {
        self.emissions.len()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Check shape and normalize every row to log-probabilities.
    ///
    /// Rows may arrive as raw logits or as log-probabilities; a row-wise
    /// log-softmax leaves the latter unchanged.
    pub fn into_log_probs(mut self) -> Result<Self, AlignmentError> {
        if self.labels.is_empty() {
            return Err(AlignmentError::InvalidEmissions("no labels".to_string()));
        }
        if self.blank_id >= self.labels.len() {
            return Err(AlignmentError::InvalidEmissions(format!(
                "blank id {} outside {} labels",
                self.blank_id,
                self.labels.len()
            )));
        }
        if self.emissions.is_empty() {
            return Err(AlignmentError::InvalidEmissions("no frames".to_string()));
        }

        let width = self.labels.len();
        for (index, row) in self.emissions.iter_mut().enumerate() {
            if row.len() != width {
                return Err(AlignmentError::InvalidEmissions(format!(
                    "frame {} has {} scores, expected {}",
                    index,
                    row.len(),
                    width
                )));
            }
            if row.iter().any(|v| v.is_nan()) {
                return Err(AlignmentError::InvalidEmissions(format!("frame {} contains NaN", index)));
            }
            log_softmax(row);
        }

        Ok(self)
    }

    /// Samples per frame, from the model or from the audio length
    pub fn frame_ratio_for(&self, num_samples: usize) -> f64 {
        match self.frame_ratio {
            Some(ratio) if ratio > 0.0 => ratio,
            _ => num_samples as f64 / self.num_frames().max(1) as f64,
        }
    }
}

fn log_softmax(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let sum: f32 = row.iter().map(|v| (v - max).exp()).sum();
    let log_sum = max + sum.ln();
    for v in row.iter_mut() {
        *v -= log_sum;
    }
}

/// Anything that can turn a mono WAV file into an emission matrix
#[async_trait]
pub trait EmissionModel: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Compute emissions for the WAV file at `wav_path`
    async fn emissions(&self, wav_path: &Path) -> Result<EmissionMatrix, AlignmentError>;
}

/// Alignment service reached over HTTP
pub struct RemoteEmissionModel {
    client: Client,
    endpoint: String,
}

impl RemoteEmissionModel {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EmissionModel for RemoteEmissionModel {
    fn name(&self) -> &str {
        "service"
    }

    async fn emissions(&self, wav_path: &Path) -> Result<EmissionMatrix, AlignmentError> {
        let bytes = tokio::fs::read(wav_path)
            .await
            .map_err(|e| AlignmentError::ModelUnavailable(format!("cannot read {}: {}", wav_path.display(), e)))?;

        debug!("Posting {} bytes of audio to {}", bytes.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "audio/wav")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AlignmentError::ModelUnavailable(format!("alignment service request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlignmentError::ModelUnavailable(format!(
                "alignment service returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<EmissionMatrix>()
            .await
            .map_err(|e| AlignmentError::InvalidEmissions(format!("bad service response: {}", e)))
    }
}

/// External inference program printing the emission JSON on stdout
pub struct CommandEmissionModel {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEmissionModel {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl EmissionModel for CommandEmissionModel {
    fn name(&self) -> &str {
        "command"
    }

    async fn emissions(&self, wav_path: &Path) -> Result<EmissionMatrix, AlignmentError> {
        // The caller bounds this with a deadline; dropping the future must kill the child
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(wav_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AlignmentError::ModelUnavailable(format!("cannot run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AlignmentError::ModelUnavailable(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.lines().last().unwrap_or_default()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| AlignmentError::InvalidEmissions(format!("bad command output: {}", e)))
    }
}

/// Build the configured emission backend, `None` when alignment is disabled
pub fn emission_model_from_config(config: &AlignerConfig) -> Option<Arc<dyn EmissionModel>> {
    match config.backend {
        AlignerBackend::Disabled => None,
        AlignerBackend::Service => Some(Arc::new(RemoteEmissionModel::new(
            config.endpoint.clone(),
            config.timeout_secs,
        ))),
        AlignerBackend::Command => Some(Arc::new(CommandEmissionModel::new(
            config.command.clone(),
            config.args.clone(),
        ))),
    }
}
