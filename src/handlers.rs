//! 驱动器相关的 HTTP 处理器。

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json, Multipart, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthenticatedUser;
use crate::config::CONTENT_CACHE_CONTROL;
use crate::drive::{ContentMode, Drive, DriveError};
use crate::error::ApiError;
use crate::range::serve_content;

#[derive(Deserialize)]
pub(crate) struct PathQuery {
    path: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct PathBody {
    path: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct UploadQuery {
    path: Option<String>,
    upload_type: Option<String>,
    overwrite: Option<String>,
}

/// 列出可浏览的根目录。
pub async fn list_roots(
    Extension(drive): Extension<Arc<Drive>>,
) -> Result<JsonResponse<Value>, ApiError> {
    let roots = drive.roots().await?;
    let message = if roots.is_empty() {
        "No root directories found"
    } else {
        "fetch all drivers successfully"
    };
    Ok(JsonResponse(json!({ "Data": roots, "message": message })))
}

/// 列出目录内容，超时后取消。
pub async fn list_path(
    Query(query): Query<PathQuery>,
    Extension(drive): Extension<Arc<Drive>>,
) -> Result<JsonResponse<Value>, ApiError> {
    let path = require_path(query.path)?;

    let cancel = CancellationToken::new();
    let deadline = cancel.clone();
    let timeout = drive.config().list_timeout;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                warn!(?timeout, "directory listing timed out");
                deadline.cancel();
            }
            _ = deadline.cancelled() => {}
        }
    });
    // Also fires when the client goes away and the handler future is dropped.
    let _cancel_on_exit = cancel.clone().drop_guard();

    let records = drive.list(&path, &cancel).await?;
    Ok(JsonResponse(
        json!({ "Data": records, "message": "fetch all files successfully" }),
    ))
}

/// 以附件形式下载文件。
pub async fn download(
    Extension(drive): Extension<Arc<Drive>>,
    request_headers: HeaderMap,
    payload: Result<Json<PathBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(reject_json)?;
    let path = require_path(body.path)?;
    let handle = drive.open(&path, ContentMode::Download).await?;
    info!(path = %handle.path.display(), size = handle.size, "download file");

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        attachment_disposition(&handle.file_name())?,
    );
    serve_content(handle, request_headers.get(header::RANGE), headers).await
}

/// 创建目录。
pub async fn create_folder(
    Extension(drive): Extension<Arc<Drive>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<PathBody>, JsonRejection>,
) -> Result<JsonResponse<Value>, ApiError> {
    let Json(body) = payload.map_err(reject_json)?;
    let path = require_path(body.path)?;
    let created = drive.create_folder(&path).await?;
    info!(user = user.id, path = %created.display(), "create folder");
    Ok(JsonResponse(
        json!({ "message": "Folder created successfully" }),
    ))
}

/// 预览文件：大文件才启用 Range。
pub async fn preview(
    Query(query): Query<PathQuery>,
    Extension(drive): Extension<Arc<Drive>>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = require_path(query.path)?;
    let handle = drive.open(&path, ContentMode::Preview).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CONTENT_CACHE_CONTROL),
    );
    serve_content(handle, request_headers.get(header::RANGE), headers).await
}

/// 流式播放，始终支持 Range。
pub async fn stream(
    Query(query): Query<PathQuery>,
    Extension(drive): Extension<Arc<Drive>>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = require_path(query.path)?;
    let handle = drive.open(&path, ContentMode::Stream).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CONTENT_CACHE_CONTROL),
    );
    serve_content(handle, request_headers.get(header::RANGE), headers).await
}

/// 上传文件或文件夹（multipart）。
///
/// File parts are read from the `files` field, or `file` for a single
/// upload. `upload_type` and `overwrite` may come from the query string or
/// from form fields; form fields take precedence.
pub async fn upload_files(
    Extension(drive): Extension<Arc<Drive>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let dest = require_path(query.path)?;
    let mut multipart = multipart.map_err(|err| {
        ApiError::BadRequest(format!("failed to parse multipart form: {}", err.body_text()))
    })?;

    let mut upload_type = query.upload_type;
    let mut overwrite = query.overwrite;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(reject_multipart)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let upload = drive.spool_upload(file_name, field).await?;
                debug!(name = upload.name, size = upload.size, "received file part");
                files.push(upload);
            }
            "upload_type" => upload_type = Some(field.text().await.map_err(reject_multipart)?),
            "overwrite" => overwrite = Some(field.text().await.map_err(reject_multipart)?),
            _ => debug!(field = name, "ignoring multipart field"),
        }
    }

    let as_folder = upload_type
        .as_deref()
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("folder"));
    let overwrite = overwrite
        .as_deref()
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
    info!(
        user = user.id,
        dest = %dest.display(),
        count = files.len(),
        as_folder,
        overwrite,
        "upload request"
    );

    let report = if as_folder {
        drive.upload_folder(&dest, files, overwrite).await?
    } else {
        drive.upload_flat(&dest, files, overwrite).await?
    };

    if report.all_failed {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            JsonResponse(json!({
                "error": DriveError::AllUploadsFailed.to_string(),
                "results": report.outcomes,
            })),
        )
            .into_response());
    }
    Ok(JsonResponse(json!({
        "results": report.outcomes,
        "message": "files uploaded successfully",
    }))
    .into_response())
}

fn require_path(path: Option<String>) -> Result<PathBuf, ApiError> {
    match path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(ApiError::BadRequest("path is required".into())),
    }
}

fn reject_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
}

fn reject_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("failed to parse multipart form: {}", err.body_text()))
}

/// `attachment; filename="..."` with an ASCII fallback plus the RFC 5987 form.
fn attachment_disposition(file_name: &str) -> Result<HeaderValue, ApiError> {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut value = format!("attachment; filename=\"{fallback}\"");
    if !file_name.is_ascii() {
        value.push_str("; filename*=UTF-8''");
        for byte in file_name.bytes() {
            if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
                value.push(byte as char);
            } else {
                value.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    HeaderValue::from_str(&value)
        .map_err(|_| ApiError::Internal("failed to build content disposition".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::build_router;
    use crate::drive::DriveConfig;
    use crate::drive::test_support::test_guard;
    use axum::Router;
    use axum::body::Body as AxumBody;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::path::Path;
    use tower::ServiceExt;

    // base64("u:p")
    const BASIC_AUTH: &str = "Basic dTpw";
    const BOUNDARY: &str = "vault-drive-test-boundary";

    fn app() -> Router {
        let drive = Drive::new(test_guard(), DriveConfig::default());
        let auth = AuthConfig {
            username: "u".into(),
            password: "p".into(),
        };
        build_router(Arc::new(drive), Arc::new(auth), 1024 * 1024)
    }

    fn get(uri: &str) -> Request<AxumBody> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, BASIC_AUTH)
            .body(AxumBody::empty())
            .expect("request")
    }

    fn post_json(uri: &str, body: &str) -> Request<AxumBody> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, BASIC_AUTH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(body.to_string()))
            .expect("request")
    }

    fn path_uri(route: &str, path: &Path) -> String {
        format!("{route}?path={}", path.display())
    }

    fn multipart_request(uri: &str, fields: &[(&str, Option<&str>, &str)]) -> Request<AxumBody> {
        let mut body = String::new();
        for (name, file_name, content) in fields {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, BASIC_AUTH)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(AxumBody::from(body))
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    #[test]
    fn disposition_sanitizes_and_encodes_names() {
        let plain = attachment_disposition("report final.pdf").expect("header");
        assert_eq!(plain, "attachment; filename=\"report final.pdf\"");

        let quoted = attachment_disposition("a\"b.txt").expect("header");
        assert_eq!(quoted, "attachment; filename=\"a_b.txt\"");

        let unicode = attachment_disposition("résumé.txt").expect("header");
        assert_eq!(
            unicode,
            "attachment; filename=\"r_sum_.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"
        );
    }

    #[tokio::test]
    async fn requests_without_credentials_are_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/drive/root")
                    .body(AxumBody::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/drive/root")
                    // base64("u:x")
                    .header(header::AUTHORIZATION, "Basic dTp4")
                    .body(AxumBody::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn both_root_routes_list_filesystem_root() {
        for route in ["/drive/root", "/drivers/root"] {
            let response = app().oneshot(get(route)).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");

            let body = body_json(response).await;
            let roots = body["Data"].as_array().expect("roots");
            let slash = roots.iter().filter(|root| root["path"] == "/").count();
            assert_eq!(slash, 1);
            assert!(roots.iter().all(|root| root["type"] == "directory"));
        }
    }

    #[tokio::test]
    async fn list_requires_path() {
        let response = app().oneshot(get("/drive/list")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "path is required");
    }

    #[tokio::test]
    async fn list_returns_records_in_envelope() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a.txt"), b"abc").expect("write");
        std::fs::write(temp.path().join(".secret"), b"x").expect("write");
        std::fs::create_dir(temp.path().join("sub")).expect("mkdir");

        let response = app()
            .oneshot(get(&path_uri("/drive/list", temp.path())))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "fetch all files successfully");
        let mut records = body["Data"].as_array().expect("records").clone();
        records.sort_by_key(|record| record["name"].as_str().unwrap_or_default().to_string());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "a.txt");
        assert_eq!(records[0]["type"], "file");
        assert_eq!(records[0]["size"], 3);
        assert_eq!(records[1]["name"], "sub");
        assert_eq!(records[1]["type"], "folder");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn list_of_denied_path_is_forbidden() {
        let response = app()
            .oneshot(get("/drive/list?path=/tmp/../etc"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn list_of_missing_path_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = app()
            .oneshot(get(&path_uri("/drive/list", &temp.path().join("gone"))))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_folder_then_list_it() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("x/y");
        let body = json!({ "path": target.display().to_string() }).to_string();

        let response = app()
            .oneshot(post_json("/drive/create-folder", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Folder created successfully"
        );
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn malformed_json_body_is_bad_request() {
        let response = app()
            .oneshot(post_json("/drive/create-folder", "{not json"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn download_sends_attachment() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("report.txt");
        std::fs::write(&file, b"quarterly").expect("write");
        let body = json!({ "path": file.display().to_string() }).to_string();

        let response = app()
            .oneshot(post_json("/drive/download", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.txt\""
        );
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(body_bytes(response).await, b"quarterly");
    }

    #[tokio::test]
    async fn download_without_path_is_bad_request() {
        let response = app()
            .oneshot(post_json("/drive/download", "{}"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preview_of_small_file_ignores_range() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("note.txt");
        std::fs::write(&file, b"0123456789").expect("write");

        let mut request = get(&path_uri("/drive/preview", &file));
        request
            .headers_mut()
            .insert(header::RANGE, HeaderValue::from_static("bytes=0-1"));
        let response = app().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            CONTENT_CACHE_CONTROL
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_bytes(response).await, b"0123456789");
    }

    #[tokio::test]
    async fn stream_honors_range() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("clip.mp4");
        std::fs::write(&file, b"0123456789").expect("write");

        let mut request = get(&path_uri("/drive/stream", &file));
        request
            .headers_mut()
            .insert(header::RANGE, HeaderValue::from_static("bytes=2-4"));
        let response = app().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-4/10");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_bytes(response).await, b"234");
    }

    #[tokio::test]
    async fn stream_rejects_suffix_range() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("clip.mp4");
        std::fs::write(&file, b"0123456789").expect("write");

        let mut request = get(&path_uri("/drive/stream", &file));
        request
            .headers_mut()
            .insert(header::RANGE, HeaderValue::from_static("bytes=-4"));
        let response = app().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn folder_upload_via_form_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dest = temp.path().join("D");
        let request = multipart_request(
            &path_uri("/drive/upload-files", &dest),
            &[
                ("upload_type", None, "folder"),
                ("files", Some("a/b/c.txt"), "deep"),
                ("files", Some("a/top.txt"), "top"),
            ],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "files uploaded successfully");
        assert_eq!(body["results"].as_array().expect("results").len(), 2);
        assert_eq!(std::fs::read(dest.join("a/b/c.txt")).expect("read"), b"deep");
    }

    #[tokio::test]
    async fn flat_upload_strips_folders_and_keeps_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let uri = format!(
            "/drive/upload-files?path={}&upload_type=files",
            temp.path().display()
        );
        let request = multipart_request(
            &uri,
            &[
                ("files", Some("nested/first.txt"), "1"),
                ("files", Some("second.txt"), "22"),
            ],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let results = body["results"].as_array().expect("results");
        assert_eq!(results[0]["name"], "nested/first.txt");
        assert_eq!(results[0]["size"], 1);
        assert_eq!(results[1]["name"], "second.txt");
        assert!(results[0].get("error").is_none());
        assert!(temp.path().join("first.txt").exists());
        assert!(!temp.path().join("nested").exists());
    }

    #[tokio::test]
    async fn single_file_field_is_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            &path_uri("/drive/upload-files", temp.path()),
            &[("file", Some("solo.txt"), "only")],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            std::fs::read(temp.path().join("solo.txt")).expect("read"),
            b"only"
        );
    }

    #[tokio::test]
    async fn upload_where_every_item_fails_is_500_with_results() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("taken.txt"), b"original").expect("seed");
        let uri = format!(
            "/drive/upload-files?path={}&overwrite=false",
            temp.path().display()
        );
        let request = multipart_request(&uri, &[("files", Some("taken.txt"), "new")]);

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "all uploads failed");
        assert!(body["results"][0]["error"].is_string());
        assert_eq!(
            std::fs::read(temp.path().join("taken.txt")).expect("read"),
            b"original"
        );
    }

    #[tokio::test]
    async fn form_overwrite_wins_over_query() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("taken.txt"), b"original").expect("seed");
        let uri = format!(
            "/drive/upload-files?path={}&overwrite=false",
            temp.path().display()
        );
        let request = multipart_request(
            &uri,
            &[
                ("overwrite", None, "true"),
                ("files", Some("taken.txt"), "new"),
            ],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            std::fs::read(temp.path().join("taken.txt")).expect("read"),
            b"new"
        );
    }

    #[tokio::test]
    async fn upload_without_files_is_bad_request() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            &path_uri("/drive/upload-files", temp.path()),
            &[("upload_type", None, "files")],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "no files provided");
    }

    #[tokio::test]
    async fn upload_without_multipart_body_is_bad_request() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = app()
            .oneshot(post_json(
                &path_uri("/drive/upload-files", temp.path()),
                "{}",
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn large_part_is_written_in_full() {
        let temp = tempfile::tempdir().expect("tempdir");
        let content: String = (0..256 * 1024)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let request = multipart_request(
            &path_uri("/drive/upload-files", temp.path()),
            &[("files", Some("large.txt"), content.as_str())],
        );

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"][0]["size"], 256 * 1024);
        let saved = std::fs::read(temp.path().join("large.txt")).expect("read");
        assert_eq!(saved.len(), 256 * 1024);
        assert!(saved == content.as_bytes());
    }
}
