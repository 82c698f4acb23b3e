//! The analysis workflow: one submitted resume in, one completed record out.
//!
//! Strictly ordered, non-resumable, no retries, no compensation on partial
//! failure. Gateway calls are issued sequentially and each is awaited before
//! the next; the only caller-visible side channel is the stage watch, which is
//! updated before every suspension point and always lands on `Complete` or
//! `Failed` — never a silently stuck in-progress value.

pub mod convert;
pub mod prompts;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{BlobStore as _, Gateway, Inference as _, RecordStore as _};
use crate::models::{record_key, AnalysisOutcome, AnalysisRecord, Feedback};
use crate::pipeline::convert::DocumentConverter;
use crate::session::SessionStore;

/// Size ceiling for submitted documents (20 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1_048_576;

/// The one accepted media type, sniffed by magic bytes.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Everything one submission carries.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file_name: String,
    pub document: Bytes,
}

/// Human-readable progress, informational only.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStage {
    Idle,
    Uploading,
    Converting,
    UploadingImage,
    Saving,
    Analyzing,
    Finalizing,
    Complete,
    Failed(String),
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStage::Idle => write!(f, "idle"),
            AnalysisStage::Uploading => write!(f, "uploading the resume"),
            AnalysisStage::Converting => write!(f, "converting to image"),
            AnalysisStage::UploadingImage => write!(f, "uploading the image"),
            AnalysisStage::Saving => write!(f, "preparing data"),
            AnalysisStage::Analyzing => write!(f, "analyzing"),
            AnalysisStage::Finalizing => write!(f, "saving feedback"),
            AnalysisStage::Complete => write!(f, "analysis complete"),
            AnalysisStage::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

pub struct AnalysisPipeline {
    gateway: Gateway,
    session: SessionStore,
    converter: Arc<dyn DocumentConverter>,
    stage_tx: watch::Sender<AnalysisStage>,
}

impl AnalysisPipeline {
    pub fn new(
        gateway: Gateway,
        session: SessionStore,
        converter: Arc<dyn DocumentConverter>,
    ) -> Self {
        let (stage_tx, _rx) = watch::channel(AnalysisStage::Idle);
        Self {
            gateway,
            session,
            converter,
            stage_tx,
        }
    }

    /// Stage subscription for progress display.
    pub fn subscribe_stage(&self) -> watch::Receiver<AnalysisStage> {
        self.stage_tx.subscribe()
    }

    fn set_stage(&self, stage: AnalysisStage) {
        info!(stage = %stage, "pipeline stage");
        self.stage_tx.send_replace(stage);
    }

    /// Runs the full workflow and returns the completed record's id.
    ///
    /// Failures abort immediately; a stub record persisted at the first
    /// durability point stays in place unchanged. Retrying means calling
    /// `run` again from the top.
    pub async fn run(&self, request: AnalysisRequest) -> Result<Uuid, AppError> {
        match self.execute(request).await {
            Ok(id) => {
                self.set_stage(AnalysisStage::Complete);
                Ok(id)
            }
            Err(err) => {
                warn!(code = err.code(), error = %err, "pipeline aborted");
                self.set_stage(AnalysisStage::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn execute(&self, request: AnalysisRequest) -> Result<Uuid, AppError> {
        // Gate on missing authentication, not on concurrent submissions.
        if !self.session.state().is_authenticated {
            return Err(AppError::Identity(
                "sign in required before analyzing".to_string(),
            ));
        }
        validate_request(&request)?;

        self.set_stage(AnalysisStage::Uploading);
        let resume = self
            .gateway
            .blobs
            .upload(request.document.clone(), &request.file_name)
            .await
            .map_err(as_upload_error)?;

        self.set_stage(AnalysisStage::Converting);
        let image_bytes = self.converter.first_page_image(&request.document).await?;

        self.set_stage(AnalysisStage::UploadingImage);
        let image = self
            .gateway
            .blobs
            .upload(image_bytes, &image_name_for(&request.file_name))
            .await
            .map_err(as_upload_error)?;

        self.set_stage(AnalysisStage::Saving);
        let record = AnalysisRecord {
            id: Uuid::new_v4(),
            resume_blob_path: resume.path,
            image_blob_path: image.path,
            company_name: request.company_name,
            job_title: request.job_title,
            job_description: request.job_description,
            outcome: AnalysisOutcome::Pending,
        };
        let key = record_key(record.id);
        // First durability point: from here on a failure leaves a pending stub.
        self.gateway
            .records
            .set(&key, &encode_record(&record)?)
            .await?;

        self.set_stage(AnalysisStage::Analyzing);
        let instructions =
            prompts::prepare_instructions(&record.job_title, &record.job_description);
        let payload = self
            .gateway
            .inference
            .score(&record.resume_blob_path, &instructions)
            .await?;

        let feedback: Feedback =
            serde_json::from_str(&payload).map_err(|e| AppError::Parse(e.to_string()))?;

        self.set_stage(AnalysisStage::Finalizing);
        let completed = record.into_complete(feedback);
        self.gateway
            .records
            .set(&key, &encode_record(&completed)?)
            .await?;

        info!(id = %completed.id, "analysis complete");
        Ok(completed.id)
    }
}

fn encode_record(record: &AnalysisRecord) -> Result<String, AppError> {
    serde_json::to_string(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("encode record: {e}")))
}

/// Blob-store failures during the two upload steps surface as upload errors.
fn as_upload_error(err: AppError) -> AppError {
    match err {
        AppError::Storage(message) => AppError::Upload(message),
        other => other,
    }
}

/// `resume.pdf` → `resume.png`.
fn image_name_for(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    format!("{stem}.png")
}

/// Rejects bad input before any network call: blank fields, oversized
/// documents, and anything that is not a PDF.
fn validate_request(request: &AnalysisRequest) -> Result<(), AppError> {
    if request.company_name.trim().is_empty() {
        return Err(AppError::Validation("company name cannot be empty".into()));
    }
    if request.job_title.trim().is_empty() {
        return Err(AppError::Validation("job title cannot be empty".into()));
    }
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job description cannot be empty".into(),
        ));
    }
    if request.document.len() > MAX_DOCUMENT_BYTES {
        return Err(AppError::Validation(format!(
            "document is {} bytes, above the {} byte ceiling",
            request.document.len(),
            MAX_DOCUMENT_BYTES
        )));
    }
    if !request.document.starts_with(PDF_MAGIC) {
        return Err(AppError::Validation(
            "document is not a PDF (accepted type: application/pdf)".into(),
        ));
    }
    Ok(())
}
