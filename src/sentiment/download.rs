// Model download helper for the ONNX sentiment classifier.
//
// Fetches the ONNX export, tokenizer, and label config of a Hugging Face
// sentiment model. Files are stored in a platform-appropriate directory
// (~/.local/share/reviewlens/models/<model>/ on Linux) so they persist
// across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Default classifier: DistilBERT fine-tuned on SST-2.
pub const DEFAULT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";

/// Hugging Face organisation hosting the default model.
const DEFAULT_MODEL_ORG: &str = "distilbert";

/// Local file names inside the model directory.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";

/// Location of the ONNX export inside the hub repo.
const REMOTE_MODEL_FILE: &str = "onnx/model.onnx";

/// Returns the default directory for a model's files.
pub fn default_model_dir(model: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reviewlens")
        .join("models")
        .join(model.replace('/', "--"))
}

/// Check whether the files needed to initialize the classifier exist.
/// `config.json` is optional (labels fall back to the SST-2 defaults).
pub fn model_files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Hub base URL for a model id. Bare names resolve under the default
/// organisation; "org/name" ids are used as-is.
pub fn hub_url(model: &str) -> String {
    let repo = if model.contains('/') {
        model.to_string()
    } else {
        format!("{DEFAULT_MODEL_ORG}/{model}")
    };
    format!("https://huggingface.co/{repo}/resolve/main")
}

/// Download the classifier files into `dir`.
///
/// Shows a progress bar for the weights. Skips files that already exist.
pub async fn download_model(model: &str, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    let base = hub_url(model);
    println!("\nSentiment model ({model}):");

    let files = [
        (CONFIG_FILE, CONFIG_FILE, false),
        (TOKENIZER_FILE, TOKENIZER_FILE, false),
        (REMOTE_MODEL_FILE, MODEL_FILE, true),
    ];

    for (remote, local, show_progress) in files {
        let dest = dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {local} (already exists)");
            continue;
        }
        println!("  Downloading {local}...");
        download_file(&format!("{base}/{remote}"), &dest, show_progress).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
///
/// The body is streamed chunk by chunk into `<dest>.part`, which is renamed
/// into place once complete, so an interrupted download never looks present.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        progress_bar(response.content_length())
    } else {
        ProgressBar::hidden()
    };

    let part = partial_path(dest);
    let mut file = tokio::fs::File::create(&part)
        .await
        .with_context(|| format!("Failed to create {}", part.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", part.display()))?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&part, dest)
        .await
        .with_context(|| format!("Failed to move {} into place", part.display()))?;
    pb.finish_and_clear();

    info!(url, dest = %dest.display(), bytes = pb.position(), "Downloaded model file");
    Ok(())
}

fn progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        }
    }
}

/// Where a file is written while its download is in flight.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_reviewlens() {
        let dir = default_model_dir(DEFAULT_MODEL);
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("reviewlens") && path_str.ends_with(DEFAULT_MODEL),
            "Expected path under reviewlens/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_dir_flattens_org_prefix() {
        let dir = default_model_dir("cardiffnlp/twitter-roberta-base-sentiment");
        assert!(dir.ends_with("cardiffnlp--twitter-roberta-base-sentiment"));
    }

    #[test]
    fn test_hub_url() {
        assert_eq!(
            hub_url(DEFAULT_MODEL),
            "https://huggingface.co/distilbert/distilbert-base-uncased-finetuned-sst-2-english/resolve/main"
        );
        assert_eq!(
            hub_url("org/model"),
            "https://huggingface.co/org/model/resolve/main"
        );
    }

    #[test]
    fn test_model_files_present() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!model_files_present(dir.path()));

        std::fs::write(dir.path().join(MODEL_FILE), b"fake").unwrap();
        assert!(!model_files_present(dir.path()));

        std::fs::write(dir.path().join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(model_files_present(dir.path()));
    }

    #[test]
    fn test_interrupted_download_is_not_present() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(MODEL_FILE);
        let part = partial_path(&dest);
        assert_eq!(part, dir.path().join("model.onnx.part"));

        std::fs::write(&part, b"half").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(!model_files_present(dir.path()));
    }
}
