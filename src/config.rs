//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;
use std::path::PathBuf;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

/// Files at or above this size are previewed with range support.
pub const PREVIEW_RANGE_THRESHOLD: u64 = 10 * 1024 * 1024;
pub const RANGE_COPY_BUFFER_SIZE: usize = 32 * 1024;
pub const CONTENT_CACHE_CONTROL: &str = "public, max-age=3600";
pub const DEFAULT_AUTH_USER: &str = "vault";
pub const DEFAULT_AUTH_PASS: &str = "vault";
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 10 * 1024 * 1024 * 1024;
pub const DEFAULT_UPLOAD_WORKERS: usize = 5;
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 30;
/// Spool directory name under the system temp dir.
pub const DEFAULT_SPOOL_DIR_NAME: &str = "vault-drive-uploads";

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "vault-drive", version = VERSION_INFO, about = "Vault drive server")]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        env = "VAULT_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "VAULT_HTTP_PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub http_port: u16,
    #[arg(
        long,
        env = "VAULT_AUTH_USER",
        default_value = DEFAULT_AUTH_USER,
        help = "Basic auth username"
    )]
    pub auth_user: String,
    #[arg(
        long,
        env = "VAULT_AUTH_PASS",
        default_value = DEFAULT_AUTH_PASS,
        help = "Basic auth password"
    )]
    pub auth_pass: String,
    #[arg(long, env = "VAULT_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "VAULT_LOG",
        default_value = "info",
        help = "Log filter used when RUST_LOG is unset"
    )]
    pub log_filter: String,
    #[arg(
        long,
        env = "VAULT_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload request body in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(
        long,
        env = "VAULT_UPLOAD_WORKERS",
        default_value_t = DEFAULT_UPLOAD_WORKERS,
        help = "Concurrent writers for folder uploads"
    )]
    pub upload_workers: usize,
    #[arg(
        long,
        env = "VAULT_LIST_TIMEOUT_SECS",
        default_value_t = DEFAULT_LIST_TIMEOUT_SECS,
        help = "Directory listing timeout in seconds"
    )]
    pub list_timeout_secs: u64,
    #[arg(
        long,
        env = "VAULT_UPLOAD_SPOOL_DIR",
        help = "Directory for staging upload parts (defaults to the system temp dir)"
    )]
    pub upload_spool_dir: Option<PathBuf>,
}
