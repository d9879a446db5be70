use crate::error::ExtractionError;
use std::fs;
use std::path::Path;

pub trait TextExtractor: Send + Sync {
    fn extract_first_page(&self, path: &Path) -> Result<String, ExtractionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_first_page(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = fs::read(path).map_err(|source| ExtractionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("extracting {} ({} bytes)", path.display(), bytes.len());

        // pdf-extract panics on some malformed fonts.
        let pages = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })) {
            Ok(Ok(pages)) => pages,
            Ok(Err(err)) => {
                return Err(ExtractionError::Parse {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
            Err(_) => {
                return Err(ExtractionError::Parse {
                    path: path.to_path_buf(),
                    reason: "extractor panicked on malformed document".to_string(),
                });
            }
        };

        pages
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::NoPages(path.to_path_buf()))
    }
}

pub fn extract_upper(extractor: &dyn TextExtractor, path: &Path) -> Option<String> {
    match extractor.extract_first_page(path) {
        Ok(text) if !text.trim().is_empty() => Some(text.to_uppercase()),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!("{err}");
            None
        }
    }
}
