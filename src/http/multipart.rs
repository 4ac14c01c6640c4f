//! `multipart/form-data` parsing.
//!
//! # Responsibilities
//! - Split a buffered body on its boundary delimiter
//! - Read each part's `Content-Disposition` / `Content-Type` headers
//! - Sort parts into plain fields and uploaded files
//!
//! # Design Decisions
//! - Whole-body parser: the body is already buffered by the server
//! - File contents are zero-copy slices of the request body
//! - Any structural problem fails the whole body, partial results are never returned

use std::collections::HashMap;

use axum::body::Bytes;
use memchr::memmem;

use crate::http::body::header_params;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain";

/// One file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Why a multipart body was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    #[error("boundary parameter is empty")]
    EmptyBoundary,
    #[error("body does not contain the boundary delimiter")]
    MissingDelimiter,
    #[error("body ends before the closing delimiter")]
    Truncated,
    #[error("malformed part headers")]
    MalformedHeaders,
    #[error("part has no form-data name")]
    MissingName,
}

/// A parsed `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    pub fn parse(body: &Bytes, boundary: &str) -> Result<Self, MultipartError> {
        if boundary.is_empty() {
            return Err(MultipartError::EmptyBoundary);
        }

        let delimiter = format!("--{boundary}");
        let next_part = format!("\r\n--{boundary}");
        let next_part = memmem::Finder::new(next_part.as_bytes());

        let first = memmem::find(body, delimiter.as_bytes()).ok_or(MultipartError::MissingDelimiter)?;
        let mut pos = first + delimiter.len();
        let mut form = MultipartForm::default();

        loop {
            let rest = &body[pos..];
            if rest.starts_with(b"--") {
                return Ok(form);
            }

            // Linear whitespace is allowed between the delimiter and its CRLF.
            let padding = rest
                .iter()
                .take_while(|byte| **byte == b' ' || **byte == b'\t')
                .count();
            if !rest[padding..].starts_with(CRLF) {
                return Err(MultipartError::Truncated);
            }
            pos += padding + CRLF.len();

            let (header_block, content_start) = if body[pos..].starts_with(CRLF) {
                (&body[pos..pos], pos + CRLF.len())
            } else {
                let end = memmem::find(&body[pos..], HEADER_END).ok_or(MultipartError::Truncated)?;
                (&body[pos..pos + end], pos + end + HEADER_END.len())
            };

            let content_len = next_part
                .find(&body[content_start..])
                .ok_or(MultipartError::Truncated)?;
            let content = body.slice(content_start..content_start + content_len);

            form.insert_part(header_block, content)?;
            pos = content_start + content_len + next_part.needle().len();
        }
    }

    fn insert_part(&mut self, header_block: &[u8], content: Bytes) -> Result<(), MultipartError> {
        let headers = std::str::from_utf8(header_block).map_err(|_| MultipartError::MalformedHeaders)?;

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;

        for line in headers.split("\r\n").filter(|line| !line.is_empty()) {
            let (key, value) = line.split_once(':').ok_or(MultipartError::MalformedHeaders)?;
            let value = value.trim();
            if key.trim().eq_ignore_ascii_case("content-disposition") {
                for (param, param_value) in header_params(value) {
                    match param.as_str() {
                        "name" => name = Some(param_value),
                        "filename" => filename = Some(param_value),
                        _ => {}
                    }
                }
            } else if key.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            }
        }

        let name = name.ok_or(MultipartError::MissingName)?;
        match filename {
            // A file input left blank: the field exists but carries no file.
            Some(filename) if filename.is_empty() && content.is_empty() => {
                self.files.entry(name).or_default();
            }
            Some(filename) => {
                self.files.entry(name).or_default().push(UploadedFile {
                    filename,
                    content_type: content_type.unwrap_or_else(|| DEFAULT_PART_CONTENT_TYPE.to_string()),
                    data: content,
                });
            }
            None => {
                self.fields
                    .insert(name, String::from_utf8_lossy(&content).into_owned());
            }
        }
        Ok(())
    }

    /// A plain (non-file) field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Files uploaded under `name`, in body order. `Some(&[])` when the
    /// field was sent without a file.
    pub fn files(&self, name: &str) -> Option<&[UploadedFile]> {
        self.files.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> Bytes {
        Bytes::from_static(
            b"--XyZ\r\n\
Content-Disposition: form-data; name=\"description\"\r\n\
\r\n\
hi\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
xyz\r\n\
--XyZ--\r\n",
        )
    }

    #[test]
    fn splits_fields_and_files() {
        let form = MultipartForm::parse(&sample_body(), "XyZ").unwrap();
        assert_eq!(form.field("description"), Some("hi"));

        let files = form.files("file").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "a.txt");
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(&files[0].data[..], b"xyz");
        assert!(form.files("description").is_none());
    }

    #[test]
    fn repeated_file_fields_keep_order_and_default_type() {
        let body = Bytes::from_static(
            b"preamble\r\n--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"1.bin\"\r\n\
\r\n\
one\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"2.bin\"\r\n\
\r\n\
two\r\n\
--b--",
        );
        let form = MultipartForm::parse(&body, "b").unwrap();
        let files = form.files("file").unwrap();
        assert_eq!(
            files.iter().map(|f| f.filename.as_str()).collect::<Vec<_>>(),
            vec!["1.bin", "2.bin"]
        );
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(&files[1].data[..], b"two");
    }

    #[test]
    fn blank_file_input_is_a_field_without_files() {
        let body = Bytes::from_static(
            b"--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
Content-Type: application/octet-stream\r\n\
\r\n\
\r\n\
--b--\r\n",
        );
        let form = MultipartForm::parse(&body, "b").unwrap();
        assert_eq!(form.files("file"), Some(&[][..]));
        assert!(form.files("other").is_none());
    }

    #[test]
    fn content_may_contain_crlf() {
        let body = Bytes::from_static(
            b"--b\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nline1\r\nline2\r\n--b--\r\n",
        );
        let form = MultipartForm::parse(&body, "b").unwrap();
        assert_eq!(form.field("text"), Some("line1\r\nline2"));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let body = Bytes::from_static(
            b"--b\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nunfinished",
        );
        assert_eq!(
            MultipartForm::parse(&body, "b").unwrap_err(),
            MultipartError::Truncated
        );
    }

    #[test]
    fn wrong_boundary_is_rejected() {
        assert_eq!(
            MultipartForm::parse(&sample_body(), "other").unwrap_err(),
            MultipartError::MissingDelimiter
        );
        assert_eq!(
            MultipartForm::parse(&sample_body(), "").unwrap_err(),
            MultipartError::EmptyBoundary
        );
    }

    #[test]
    fn part_without_name_is_rejected() {
        let body = Bytes::from_static(b"--b\r\nContent-Type: text/plain\r\n\r\nx\r\n--b--");
        assert_eq!(
            MultipartForm::parse(&body, "b").unwrap_err(),
            MultipartError::MissingName
        );
    }
}
