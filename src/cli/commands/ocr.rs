//! Single-image field extraction command.

use std::path::Path;

use crate::cli::icons;
use crate::config::{Config, OcrBackendKind};
use crate::inference::OpenAiClient;
use crate::ocr::{FieldExtractor, TesseractExtractor, VisionExtractor};
use crate::secrets::{build_secret_store, fetch_secret_field};

async fn build_extractor(
    config: &Config,
    backend: OcrBackendKind,
) -> anyhow::Result<Box<dyn FieldExtractor>> {
    match backend {
        OcrBackendKind::Tesseract => {
            let extractor = TesseractExtractor::new(config.ocr.language.clone());
            if !extractor.is_available() {
                anyhow::bail!("Tesseract not installed. Install with: apt install tesseract-ocr");
            }
            Ok(Box::new(extractor))
        }
        OcrBackendKind::Vision => {
            let secrets = build_secret_store(&config.secrets).await;
            let api_key = fetch_secret_field(
                secrets.as_ref(),
                &config.secrets.secret_name,
                &config.secrets.field,
            )
            .await?;
            let client = OpenAiClient::new(
                api_key,
                config.batch.api_base.clone(),
                config.batch.request_timeout(),
            )?;
            Ok(Box::new(VisionExtractor::new(
                client,
                config.batch.clone(),
                config.ocr.vision_model.clone(),
            )))
        }
    }
}

/// Run one extractor on one file and print the result.
pub async fn cmd_ocr(
    config: &Config,
    filepath: &Path,
    backend: OcrBackendKind,
) -> anyhow::Result<()> {
    if !filepath.is_file() {
        anyhow::bail!("File not found: {}", filepath.display());
    }

    let extractor = build_extractor(config, backend).await?;
    println!("Running OCR on: {}", filepath.display());

    match extractor.extract_file(filepath).await {
        Ok(fields) => {
            println!("{}", fields.heading());
            println!("{}", fields);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {} failed: {}", icons::error(), extractor.name(), e);
            Err(e.into())
        }
    }
}
