use base64::Engine;

use crate::models::extraction::{DocumentContent, ExtractionMethod};

/// Turn an uploaded document into vision-ready content.
///
/// The bundled extractor handles single images only: the format is sniffed
/// with the `image` crate and the bytes are passed through base64 for the
/// provider call. OCR text context and PDF rasterization are delegated to
/// external collaborators; a PDF upload fails here with a descriptive error
/// so the job records why it was not processed.
pub fn extract_content(bytes: &[u8], file_name: &str) -> Result<DocumentContent, ContentError> {
    if file_name.to_lowercase().ends_with(".pdf") {
        return Err(ContentError::PdfNotSupported);
    }

    image::guess_format(bytes).map_err(|_| ContentError::UnrecognizedImage)?;

    Ok(DocumentContent {
        raw_text: String::new(),
        page_count: 1,
        page_images: vec![base64::engine::general_purpose::STANDARD.encode(bytes)],
        extraction_method: ExtractionMethod::ImageVision,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("PDF input is not supported by this build; rasterize pages to images before submission")]
    PdfNotSupported,

    #[error("uploaded bytes are not a recognized image format")]
    UnrecognizedImage,
}
