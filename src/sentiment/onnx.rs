// Local ONNX sentiment classifier (DistilBERT fine-tuned on SST-2 by default).
//
// Runs a sequence-classification export through onnxruntime. Texts are
// truncated to the model's maximum sequence length, logits are turned into
// probabilities with a softmax, and the most probable class is reported
// with its probability as the score.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::device::{Device, DevicePreference};
use super::download::{self, CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};
use super::traits::{ModelLoader, RawSentiment, SentimentScorer};

/// SST-2 class names, used when the export ships without a config.json.
const DEFAULT_LABELS: [&str; 2] = ["NEGATIVE", "POSITIVE"];

/// The subset of a Hugging Face config.json we read.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: BTreeMap<String, String>,
}

pub struct OnnxSentimentClassifier {
    model_name: String,
    // ort::Session::run needs &mut self and spawn_blocking needs 'static
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    labels: Arc<Vec<String>>,
    pad_id: i64,
}

impl OnnxSentimentClassifier {
    /// Load the ONNX model, tokenizer, and label table from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json`; `config.json` is optional.
    /// Run `reviewlens download-model` first if they are missing.
    pub fn load(model_dir: &Path, model_name: &str, device: Device, max_length: usize) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `reviewlens download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `reviewlens download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let mut builder = Session::builder().context("Failed to create ONNX session builder")?;
        let providers = device.execution_providers();
        if !providers.is_empty() {
            builder = builder
                .with_execution_providers(providers)
                .context("Failed to register execution providers")?;
        }
        let session = builder
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0) as i64;

        let labels = read_labels(&model_dir.join(CONFIG_FILE))?;

        info!(
            model = model_name,
            device = %device,
            labels = ?labels,
            "Loaded ONNX sentiment model from {}",
            model_dir.display()
        );

        Ok(Self {
            model_name: model_name.to_string(),
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
            pad_id,
        })
    }
}

#[async_trait]
impl SentimentScorer for OnnxSentimentClassifier {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn score_text(&self, text: &str) -> Result<RawSentiment> {
        let mut results = self.score_batch(&[text.to_string()]).await?;
        results.pop().context("Model returned no result")
    }

    /// One forward pass per call. Tokenization and inference are CPU-bound
    /// and run on a blocking thread.
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<RawSentiment>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let pad_id = self.pad_id;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let encodings: Vec<_> = texts
                .iter()
                .map(|t| {
                    tokenizer
                        .encode(t.as_str(), true)
                        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
                })
                .collect::<Result<Vec<_>>>()?;

            let batch_size = encodings.len();
            let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

            // Right-padded to the longest sequence: [batch_size, max_len]
            let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
            let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

            for enc in &encodings {
                let ids = enc.get_ids();
                input_ids_flat.extend(ids.iter().map(|&id| id as i64));
                attention_mask_flat.extend(enc.get_attention_mask().iter().map(|&m| m as i64));
                for _ in ids.len()..max_len {
                    input_ids_flat.push(pad_id);
                    attention_mask_flat.push(0);
                }
            }

            let shape = [batch_size as i64, max_len as i64];
            let input_ids_tensor = Tensor::from_array((shape, input_ids_flat))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // [batch_size, n_labels]
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            let rows = logit_rows(&logits, batch_size)?;

            let mut results = Vec::with_capacity(batch_size);
            for (row, text) in rows.zip(&texts) {
                let probs = softmax(row);
                let result = pick_label(&probs, &labels);
                debug!(
                    label = %result.label,
                    score = result.score,
                    text_preview = %crate::output::truncate_chars(text, 50),
                    "ONNX scored text"
                );
                results.push(result);
            }

            Ok(results)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Builds an [`OnnxSentimentClassifier`] on demand. Loading happens inside
/// the sentiment run so that a missing or broken model becomes a fallback,
/// not a startup failure.
pub struct OnnxModelLoader {
    pub model_name: String,
    pub model_dir: PathBuf,
    pub device: DevicePreference,
    pub max_length: usize,
}

impl ModelLoader for OnnxModelLoader {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn load(&self) -> Result<Box<dyn SentimentScorer>> {
        if !download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Model files not found in {}\nRun `reviewlens download-model` to download them.",
                self.model_dir.display()
            );
        }
        let device = Device::probe(self.device);
        let classifier =
            OnnxSentimentClassifier::load(&self.model_dir, &self.model_name, device, self.max_length)?;
        Ok(Box::new(classifier))
    }
}

/// Split flat `[batch_size, n_labels]` logits into one row per text.
fn logit_rows(logits: &[f32], batch_size: usize) -> Result<std::slice::Chunks<'_, f32>> {
    if logits.is_empty() || logits.len() % batch_size != 0 {
        anyhow::bail!(
            "Unexpected output size {} for a batch of {}",
            logits.len(),
            batch_size
        );
    }
    Ok(logits.chunks(logits.len() / batch_size))
}

/// Read class names from config.json's id2label, ordered by class index.
fn read_labels(config_path: &Path) -> Result<Vec<String>> {
    if !config_path.exists() {
        return Ok(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect());
    }
    let raw = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: ModelConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    labels_from_id2label(config.id2label)
}

fn labels_from_id2label(id2label: BTreeMap<String, String>) -> Result<Vec<String>> {
    if id2label.is_empty() {
        return Ok(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect());
    }
    let mut indexed = id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|i| (i, label))
                .with_context(|| format!("Non-numeric class id {id:?} in id2label"))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&x| (x as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Most probable class and its probability. Classes past the end of the
/// label table are reported as LABEL_<i>.
fn pick_label(probs: &[f64], labels: &[String]) -> RawSentiment {
    let (index, score) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
    let label = labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("LABEL_{index}"));
    RawSentiment { label, score }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_logit_rows_split_per_text() {
        let logits = [0.1, 0.9, 0.7, 0.3, 0.5, 0.5];
        let rows: Vec<&[f32]> = logit_rows(&logits, 3).unwrap().collect();
        assert_eq!(rows, vec![&[0.1, 0.9][..], &[0.7, 0.3][..], &[0.5, 0.5][..]]);
    }

    #[test]
    fn test_logit_rows_rejects_empty_or_ragged_output() {
        assert!(logit_rows(&[], 2).is_err());
        assert!(logit_rows(&[0.1, 0.2, 0.3], 2).is_err());
    }

    #[test]
    fn test_pick_label() {
        let labels = vec!["NEGATIVE".to_string(), "POSITIVE".to_string()];
        let result = pick_label(&softmax(&[-2.0, 3.0]), &labels);
        assert_eq!(result.label, "POSITIVE");
        assert!(result.score > 0.99);

        let result = pick_label(&softmax(&[4.0, -1.0]), &labels);
        assert_eq!(result.label, "NEGATIVE");
    }

    #[test]
    fn test_pick_label_outside_table() {
        let labels = vec!["NEGATIVE".to_string()];
        let result = pick_label(&[0.1, 0.9], &labels);
        assert_eq!(result.label, "LABEL_1");
    }

    #[test]
    fn test_labels_ordered_by_class_index() {
        let mut id2label = BTreeMap::new();
        id2label.insert("10".to_string(), "C".to_string());
        id2label.insert("2".to_string(), "B".to_string());
        id2label.insert("0".to_string(), "A".to_string());
        assert_eq!(labels_from_id2label(id2label).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_config_uses_sst2_labels() {
        let dir = tempfile::tempdir().unwrap();
        let labels = read_labels(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(labels, vec!["NEGATIVE", "POSITIVE"]);
    }

    #[test]
    fn test_config_id2label_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"architectures": ["X"], "id2label": {"0": "neg", "1": "neu", "2": "pos"}}"#,
        )
        .unwrap();
        assert_eq!(read_labels(&path).unwrap(), vec!["neg", "neu", "pos"]);
    }

    #[test]
    fn test_loader_fails_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = OnnxModelLoader {
            model_name: "test-model".to_string(),
            model_dir: dir.path().to_path_buf(),
            device: DevicePreference::Cpu,
            max_length: 512,
        };
        let err = loader.load().err().expect("load should fail");
        assert!(err.to_string().contains("download-model"));
    }
}
