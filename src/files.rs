//! File transfer handlers: attachment downloads from a directory and
//! multipart uploads to a caller-chosen path.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use multipart::server::Multipart;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::handler::{handler, HandlerRef};

/// Query key naming the requested file.
pub const FILE_QUERY_KEY: &str = "file";

/// Largest file a [`FileDownloader`] buffers by default (64 MiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 64 * 1024 * 1024;

const REJECTED_BODY: &[u8] = b"file not found";

/// Serves files below `dir` as attachments, chosen by the `file` query key.
///
/// Requests without the key, or whose path would leave `dir` (`..`,
/// absolute paths, drive prefixes), are answered 400 without touching the
/// filesystem.
///
/// Responses are buffered, so files larger than `max_bytes` are refused
/// with a 500 instead of being read into memory.
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
    max_bytes: u64,
}

impl FileDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Resolve a client-supplied relative path inside `dir`.
    fn map_path(&self, requested: &str) -> Option<PathBuf> {
        let mut resolved = self.dir.clone();
        let mut depth = 0usize;
        for comp in Path::new(requested).components() {
            match comp {
                Component::Normal(s) => {
                    resolved.push(s);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        (depth > 0).then_some(resolved)
    }

    #[must_use]
    pub fn handler(self) -> HandlerRef {
        let downloader = Arc::new(self);
        handler(move |ctx| downloader.serve(ctx))
    }

    fn serve(&self, ctx: &mut Context<'_>) {
        let requested = ctx.query_value(FILE_QUERY_KEY);
        let Some(dest) = requested.string().ok().and_then(|p| self.map_path(p)) else {
            debug!(requested = ?requested.string().ok(), "rejected download path");
            ctx.status = 400;
            ctx.resp_data = REJECTED_BODY.to_vec();
            return;
        };

        match read_bounded(&dest, self.max_bytes) {
            Ok(bytes) => {
                let file_name = dest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let resp = ctx.resp();
                resp.set_header("Content-Disposition", &content_disposition(&file_name));
                resp.set_header("Content-Description", "File Transfer");
                resp.set_header("Content-Type", "application/octet-stream");
                resp.set_header("Content-Transfer-Encoding", "binary");
                resp.set_header("Expires", "0");
                resp.set_header("Cache-Control", "must-revalidate");
                resp.set_header("Pragma", "public");
                ctx.status = 200;
                ctx.resp_data = bytes;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                ctx.status = 404;
                ctx.resp_data = REJECTED_BODY.to_vec();
            }
            Err(err) => {
                warn!(path = %dest.display(), error = %err, "failed to read download");
                ctx.status = 500;
                ctx.resp_data = b"failed to read file".to_vec();
            }
        }
    }
}

/// Read a regular file of at most `max_bytes`. Directories count as missing.
fn read_bounded(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let meta = file.metadata()?;
    if !meta.is_file() {
        return Err(io::Error::from(io::ErrorKind::NotFound));
    }
    if meta.len() > max_bytes {
        return Err(io::Error::other(format!(
            "file is {} bytes, limit is {max_bytes}",
            meta.len()
        )));
    }
    let mut bytes = Vec::with_capacity(usize::try_from(meta.len()).unwrap_or(0));
    file.take(max_bytes).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// `attachment` disposition with a quoted ASCII fallback and the exact name
/// as RFC 5987 `filename*`.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// Why an upload could not be stored.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("request is not multipart/form-data")]
    NotMultipart,
    #[error("no file in form field {0:?}")]
    MissingField(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Part headers of the uploaded file, handed to the destination function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

type DestPathFn = Arc<dyn Fn(&UploadedFile) -> PathBuf + Send + Sync>;

/// Stores the file part named `file_field` of a `multipart/form-data` body.
///
/// The destination is whatever `dest_path` returns for the part; an existing
/// file there is truncated. Failures answer 500 with the reason, success
/// answers 200.
///
/// ```rust,ignore
/// let uploads = FileUploader::new("upload", |file: &UploadedFile| {
///     let name = file.file_name.as_deref().unwrap_or("upload.bin");
///     PathBuf::from("/srv/uploads").join(name)
/// });
/// server.add_route(Method::POST, "/upload", uploads.handler())?;
/// ```
#[derive(Clone)]
pub struct FileUploader {
    file_field: String,
    dest_path: DestPathFn,
}

impl std::fmt::Debug for FileUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUploader")
            .field("file_field", &self.file_field)
            .finish_non_exhaustive()
    }
}

impl FileUploader {
    pub fn new<F>(file_field: impl Into<String>, dest_path: F) -> Self
    where
        F: Fn(&UploadedFile) -> PathBuf + Send + Sync + 'static,
    {
        Self {
            file_field: file_field.into(),
            dest_path: Arc::new(dest_path),
        }
    }

    #[must_use]
    pub fn handler(self) -> HandlerRef {
        let uploader = Arc::new(self);
        handler(move |ctx| uploader.serve(ctx))
    }

    fn serve(&self, ctx: &mut Context<'_>) {
        match self.store(ctx) {
            Ok((dest, written)) => {
                info!(path = %dest.display(), bytes = written, "stored upload");
                ctx.respond_text(200, "upload succeeded");
            }
            Err(err) => {
                warn!(field = %self.file_field, error = %err, "upload failed");
                ctx.respond_text(500, format!("upload failed: {err}"));
            }
        }
    }

    fn store(&self, ctx: &Context<'_>) -> Result<(PathBuf, u64), UploadError> {
        let boundary = ctx
            .header("content-type")
            .and_then(multipart_boundary)
            .ok_or(UploadError::NotMultipart)?;
        let mut form = Multipart::with_body(ctx.body(), boundary);

        while let Some(mut field) = form.read_entry()? {
            if &*field.headers.name != self.file_field.as_str() || field.headers.filename.is_none() {
                continue;
            }
            let uploaded = UploadedFile {
                field: field.headers.name.to_string(),
                file_name: field.headers.filename.clone(),
                content_type: field.headers.content_type.as_ref().map(ToString::to_string),
            };
            let dest = (self.dest_path)(&uploaded);
            let mut out = File::create(&dest)?;
            let written = io::copy(&mut field.data, &mut out)?;
            return Ok((dest, written));
        }
        Err(UploadError::MissingField(self.file_field.clone()))
    }
}

/// The `boundary` parameter of a `multipart/form-data` content type.
fn multipart_boundary(content_type: &str) -> Option<String> {
    let mut parts = content_type.split(';');
    let mime = parts.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BufferedResponse;

    fn run(downloader: &FileDownloader, uri: &str) -> (u16, BufferedResponse) {
        let mut out = BufferedResponse::new();
        let req = http::Request::get(uri).body(Vec::new()).unwrap();
        let status = {
            let mut ctx = Context::new(req, &mut out);
            downloader.serve(&mut ctx);
            ctx.flush().unwrap();
            ctx.status
        };
        (status, out)
    }

    #[test]
    fn serves_file_with_attachment_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report.txt"), b"quarterly").unwrap();
        let downloader = FileDownloader::new(dir.path());

        let (status, out) = run(&downloader, "/download?file=report.txt");
        assert_eq!(status, 200);
        assert_eq!(out.body, b"quarterly");
        assert_eq!(
            out.header("content-disposition"),
            Some("attachment; filename=\"report.txt\"; filename*=UTF-8''report.txt")
        );
        assert_eq!(out.header("content-type"), Some("application/octet-stream"));
        assert_eq!(out.header("pragma"), Some("public"));
    }

    #[test]
    fn traversal_and_absolute_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = FileDownloader::new(dir.path());
        for uri in [
            "/download?file=../secret",
            "/download?file=a/../../secret",
            "/download?file=%2Fetc%2Fpasswd",
            "/download?file=",
            "/download",
        ] {
            let (status, out) = run(&downloader, uri);
            assert_eq!(status, 400, "{uri}");
            assert!(out.header("content-disposition").is_none());
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = FileDownloader::new(dir.path());
        let (status, _) = run(&downloader, "/download?file=nope.txt");
        assert_eq!(status, 404);
    }

    #[test]
    fn awkward_file_names_are_quoted_and_encoded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q3 report;v2 é.txt"), b"numbers").unwrap();
        let downloader = FileDownloader::new(dir.path());

        let (status, out) = run(&downloader, "/download?file=q3%20report%3Bv2%20%C3%A9.txt");
        assert_eq!(status, 200);
        assert_eq!(
            out.header("content-disposition"),
            Some(
                "attachment; filename=\"q3 report;v2 _.txt\"; \
                 filename*=UTF-8''q3%20report%3Bv2%20%C3%A9.txt"
            )
        );
        let header = out.header("content-disposition").unwrap();
        assert!(tiny_http::Header::from_bytes("Content-Disposition", header).is_ok());
    }

    #[test]
    fn oversized_and_directory_targets_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 64]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let downloader = FileDownloader::new(dir.path()).with_max_bytes(16);

        let (status, out) = run(&downloader, "/download?file=big.bin");
        assert_eq!(status, 500);
        assert!(out.header("content-disposition").is_none());

        let (status, _) = run(&downloader, "/download?file=sub");
        assert_eq!(status, 404);
    }

    fn multipart_request(boundary: &str, parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut body = String::new();
        for (name, file_name, data) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: text/plain\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(data);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        body.into_bytes()
    }

    fn upload(uploader: &FileUploader, content_type: &str, body: Vec<u8>) -> (u16, Vec<u8>) {
        let mut out = BufferedResponse::new();
        let req = http::Request::post("/upload")
            .header("content-type", content_type)
            .body(body)
            .unwrap();
        let status = {
            let mut ctx = Context::new(req, &mut out);
            uploader.serve(&mut ctx);
            ctx.flush().unwrap();
            ctx.status
        };
        (status, out.body)
    }

    fn uploader_into(dir: &Path) -> FileUploader {
        let dir = dir.to_path_buf();
        FileUploader::new("upload", move |file: &UploadedFile| {
            assert_eq!(file.content_type.as_deref(), Some("text/plain"));
            dir.join(file.file_name.as_deref().unwrap_or("unnamed"))
        })
    }

    #[test]
    fn stores_named_file_part() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"stale contents, longer").unwrap();
        let uploader = uploader_into(dir.path());

        let body = multipart_request(
            "XyZ",
            &[("title", None, "ignored"), ("upload", Some("notes.txt"), "fresh")],
        );
        let (status, resp) = upload(&uploader, "multipart/form-data; boundary=XyZ", body);
        assert_eq!(status, 200);
        assert_eq!(resp, b"upload succeeded");
        assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"fresh");
    }

    #[test]
    fn missing_field_or_wrong_type_fails() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader_into(dir.path());

        let body = multipart_request("b", &[("other", Some("a.txt"), "x")]);
        let (status, resp) = upload(&uploader, "multipart/form-data; boundary=\"b\"", body);
        assert_eq!(status, 500);
        assert_eq!(
            String::from_utf8(resp).unwrap(),
            "upload failed: no file in form field \"upload\""
        );

        let (status, resp) = upload(&uploader, "application/x-www-form-urlencoded", b"a=1".to_vec());
        assert_eq!(status, 500);
        assert_eq!(resp, b"upload failed: request is not multipart/form-data");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader_into(&dir.path().join("missing-subdir"));

        let body = multipart_request("b", &[("upload", Some("a.txt"), "x")]);
        let (status, resp) = upload(&uploader, "multipart/form-data; boundary=b", body);
        assert_eq!(status, 500);
        assert!(String::from_utf8(resp).unwrap().starts_with("upload failed: "));
    }

    #[test]
    fn boundary_is_read_from_content_type() {
        assert_eq!(
            multipart_boundary("multipart/form-data; charset=utf-8; boundary=\"abc\"").as_deref(),
            Some("abc")
        );
        assert_eq!(multipart_boundary("Multipart/Form-Data;boundary=x").as_deref(), Some("x"));
        assert_eq!(multipart_boundary("multipart/form-data"), None);
        assert_eq!(multipart_boundary("text/plain; boundary=x"), None);
    }
}
