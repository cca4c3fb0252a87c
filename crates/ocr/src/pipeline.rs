use thiserror::Error;

use crate::extract::Extractor;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ScanOutcome;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Image worker panicked: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Orchestrates: format check → preprocess → OCR → item extraction.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Scan one uploaded receipt photo.
    pub async fn scan(&self, data: &[u8]) -> Result<ScanOutcome, PipelineError> {
        // Fail fast on the request task before handing the bytes to a worker.
        preprocess::detect_format(data)?;

        let owned = data.to_vec();
        let png = tokio::task::spawn_blocking(move || preprocess::prepare_for_ocr(&owned)).await??;

        let raw_text = self.recognizer.recognize(&png).await?;
        if raw_text.trim().is_empty() {
            tracing::info!("OCR returned no text");
            return Ok(ScanOutcome::NoText);
        }

        let items = Extractor::extract(&raw_text);
        tracing::info!(lines = raw_text.lines().count(), items = items.len(), "Receipt scanned");

        if items.is_empty() {
            Ok(ScanOutcome::NothingExtracted { raw_text })
        } else {
            Ok(ScanOutcome::Items { items, raw_text })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn scan_extracts_items() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::new("キャベツ ¥198\n合計 ¥198"));

        match pipeline.scan(&tiny_png()).await.unwrap() {
            ScanOutcome::Items { items, raw_text } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "キャベツ");
                assert!(raw_text.contains("合計"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_without_items_keeps_raw_text() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::new("合計 ¥198\n¥1,280"));
        assert_eq!(
            pipeline.scan(&tiny_png()).await.unwrap(),
            ScanOutcome::NothingExtracted {
                raw_text: "合計 ¥198\n¥1,280".into()
            }
        );
    }

    #[tokio::test]
    async fn blank_ocr_result_is_no_text() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::new("  \n"));
        assert_eq!(pipeline.scan(&tiny_png()).await.unwrap(), ScanOutcome::NoText);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let pipeline = ReceiptPipeline::new(MockRecognizer::new("キャベツ ¥198"));
        assert!(matches!(
            pipeline.scan(b"%PDF-1.7").await,
            Err(PipelineError::Preprocess(PreprocessError::Unsupported))
        ));
    }
}
