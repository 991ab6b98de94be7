//! Multipart file uploads and form values.
//!
//! The request body is already buffered when a handler runs, so looking up a
//! file or a value means parsing the buffered multipart body, capturing the
//! matching part, and dropping the parser.

use crate::error::UploadError;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use mime::Mime;

/// Upper bound on the multipart body parsed for an upload (32 MiB).
pub const DEFAULT_MAX_MULTIPART_BYTES: u64 = 32 << 20;

/// Descriptor of an uploaded file.
#[derive(Debug, Clone)]
pub struct FileHeader {
    file_name: String,
    content_type: Option<Mime>,
    headers: HeaderMap,
    content: Bytes,
}

impl FileHeader {
    /// The client-supplied file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The part's declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Headers of the multipart part.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// The file content.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.content
    }

    /// Consumes the descriptor, returning the file content.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.content
    }
}

/// Finds the first file part named `field` in a multipart body.
///
/// Parts without a filename are form values, not files, and are skipped.
pub async fn find_file(
    headers: &HeaderMap,
    body: Bytes,
    field: &str,
    limit: u64,
) -> Result<FileHeader, UploadError> {
    let mut multipart = open(headers, body, limit)?;

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let Some(file_name) = part.file_name().map(ToOwned::to_owned) else {
            continue;
        };
        let content_type = part.content_type().cloned();
        let part_headers = part.headers().clone();
        let content = part
            .bytes()
            .await
            .map_err(|e| UploadError::Malformed(e.to_string()))?;

        return Ok(FileHeader {
            file_name,
            content_type,
            headers: part_headers,
            content,
        });
    }

    Err(UploadError::MissingFile(field.to_owned()))
}

/// Finds the first non-file part named `field` and returns its text.
///
/// File parts with the same name are skipped. `Ok(None)` means no such
/// value was sent.
pub async fn find_value(
    headers: &HeaderMap,
    body: Bytes,
    field: &str,
    limit: u64,
) -> Result<Option<String>, UploadError> {
    let mut multipart = open(headers, body, limit)?;

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        if part.name() != Some(field) || part.file_name().is_some() {
            continue;
        }
        let text = part
            .text()
            .await
            .map_err(|e| UploadError::Malformed(e.to_string()))?;
        return Ok(Some(text));
    }

    Ok(None)
}

fn open(headers: &HeaderMap, body: Bytes, limit: u64) -> Result<multer::Multipart<'static>, UploadError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(UploadError::NotMultipart)?;
    let boundary = multer::parse_boundary(content_type).map_err(|_| UploadError::NotMultipart)?;

    let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let constraints =
        multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
    Ok(multer::Multipart::with_constraints(stream, boundary, constraints))
}
