//! Basic 认证中间件：校验凭据并注入当前用户。

use axum::extract::Extension;
use axum::http::Request;
use axum::{body::Body as AxumBody, middleware};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Basic};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;

#[derive(Debug)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// Identity of the caller, available to handlers as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
}

/// 认证中间件：`/auth/` 下的路径放行，其余请求需要 Basic 凭据。
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthConfig>>,
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    mut req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    if is_auth_exempt_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    if let Some(TypedHeader(credentials)) = auth_header
        && credentials.username() == auth.username
        && credentials.password() == auth.password
    {
        debug!(user = credentials.username(), "authenticated");
        req.extensions_mut().insert(AuthenticatedUser {
            id: credentials.username().to_string(),
        });
        return Ok(next.run(req).await);
    }

    warn!(path = req.uri().path(), "rejected unauthenticated request");
    Err(ApiError::Unauthorized)
}

fn is_auth_exempt_path(path: &str) -> bool {
    path == "/auth" || path.starts_with("/auth/")
}
