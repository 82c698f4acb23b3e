//! First-page rasterization seam.
//!
//! Conversion is an external collaborator: the engine only defines the
//! boundary and ships an adapter that shells out to a pdftoppm-compatible
//! rasterizer over temp files. Anything that can turn page one of a PDF into
//! a PNG can sit behind this trait.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::errors::AppError;

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Renders the first page of `document` to a PNG.
    async fn first_page_image(&self, document: &[u8]) -> Result<Bytes, AppError>;
}

/// Adapter around an external rasterizer command (default `pdftoppm`),
/// invoked as `<program> -png -f 1 -l 1 -singlefile <input> <output-prefix>`.
pub struct ExternalConverter {
    program: String,
}

impl ExternalConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DocumentConverter for ExternalConverter {
    async fn first_page_image(&self, document: &[u8]) -> Result<Bytes, AppError> {
        // Scratch directory lives exactly as long as this call.
        let scratch = tempfile::tempdir()
            .map_err(|e| AppError::Conversion(format!("scratch dir: {e}")))?;
        let input = scratch.path().join("page.pdf");
        let prefix = scratch.path().join("page");

        tokio::fs::write(&input, document)
            .await
            .map_err(|e| AppError::Conversion(format!("write scratch input: {e}")))?;

        let output = Command::new(&self.program)
            .args(["-png", "-f", "1", "-l", "1", "-singlefile"])
            .arg(&input)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| AppError::Conversion(format!("spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let rendered = tokio::fs::read(prefix.with_extension("png"))
            .await
            .map_err(|e| AppError::Conversion(format!("read rendered page: {e}")))?;

        debug!(bytes = rendered.len(), "rasterized first page");
        Ok(Bytes::from(rendered))
    }
}
