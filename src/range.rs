//! 单区间 Range 解析与文件内容响应。

use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use httpdate::fmt_http_date;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::config::RANGE_COPY_BUFFER_SIZE;
use crate::drive::ContentHandle;
use crate::error::ApiError;

/// Inclusive byte range within a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// 解析 `bytes=start-end` 形式的单区间 Range 头。
///
/// Only one range is supported. A missing start (`bytes=-500`, a suffix
/// range) is rejected rather than read from byte zero. A missing,
/// unparsable or oversized end is clamped to the last byte. Every rejection
/// maps to 416 with `Content-Range: bytes */<size>`.
pub fn parse_range(value: &str, file_size: u64) -> Result<ByteRange, ApiError> {
    let unsatisfiable = || ApiError::RangeNotSatisfiable(file_size);

    let spec = value.trim().strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    if spec.contains(',') {
        return Err(unsatisfiable());
    }
    let parts: Vec<&str> = spec.split('-').collect();
    let [start_part, end_part] = parts.as_slice() else {
        return Err(unsatisfiable());
    };

    let start_part = start_part.trim();
    if start_part.is_empty() {
        return Err(unsatisfiable());
    }
    let start: u64 = start_part.parse().map_err(|_| unsatisfiable())?;
    if file_size == 0 {
        return Err(unsatisfiable());
    }

    let last = file_size - 1;
    let end = match end_part.trim().parse::<u64>() {
        Ok(end) if end < file_size => end,
        _ => last,
    };

    if start > end || start >= file_size {
        return Err(unsatisfiable());
    }
    Ok(ByteRange { start, end })
}

/// 根据 Range 头输出完整内容 (200) 或部分内容 (206)。
///
/// `headers` carries endpoint-specific headers (cache policy, disposition)
/// and is extended with content type, length and range headers. When the
/// handle does not require range handling the `Range` header is ignored.
pub async fn serve_content(
    handle: ContentHandle,
    range_header: Option<&HeaderValue>,
    mut headers: HeaderMap,
) -> Result<Response, ApiError> {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(handle.mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    if let Some(modified) = handle.modified {
        headers.insert(
            header::LAST_MODIFIED,
            header_value(&fmt_http_date(modified))?,
        );
    }

    let ContentHandle {
        mut file,
        size,
        path,
        range_required,
        ..
    } = handle;

    let range = match range_header {
        Some(value) if range_required => {
            let value = value
                .to_str()
                .map_err(|_| ApiError::RangeNotSatisfiable(size))?;
            Some(parse_range(value, size)?)
        }
        _ => None,
    };

    let Some(range) = range else {
        headers.insert(header::CONTENT_LENGTH, header_value(&size.to_string())?);
        debug!(path = %path.display(), size, "serve whole file");
        let stream = ReaderStream::with_capacity(file, RANGE_COPY_BUFFER_SIZE);
        let body = body_from(stream, path.display().to_string());
        return Ok((StatusCode::OK, headers, body).into_response());
    };

    let length = range.len();
    file.seek(SeekFrom::Start(range.start))
        .await
        .map_err(|err| ApiError::Internal(format!("failed to seek file: {err}")))?;
    headers.insert(
        header::CONTENT_RANGE,
        header_value(&format!("bytes {}-{}/{}", range.start, range.end, size))?,
    );
    headers.insert(header::CONTENT_LENGTH, header_value(&length.to_string())?);
    debug!(
        path = %path.display(),
        start = range.start,
        end = range.end,
        length,
        "serve range"
    );
    let stream = ReaderStream::with_capacity(file.take(length), RANGE_COPY_BUFFER_SIZE);
    let body = body_from(stream, path.display().to_string());
    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}

fn body_from<S>(stream: S, path: String) -> AxumBody
where
    S: futures_util::Stream<Item = std::io::Result<axum::body::Bytes>> + Send + 'static,
{
    AxumBody::from_stream(stream.inspect_err(move |err| {
        warn!(path, error = %err, "content stream aborted");
    }))
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|_| ApiError::Internal("failed to build header".into()))
}
