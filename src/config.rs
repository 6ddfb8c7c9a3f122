use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub uploads_dir: PathBuf,
    pub app_name: String,
    pub upload_max_bytes: usize,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: time::Duration,
}

pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uploads_dir: std::env::temp_dir(),
            app_name: "Inkpad".to_string(),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            auth: AuthConfig {
                key: "dGVzdC1zZWNyZXQtdGVzdC1zZWNyZXQ".to_string(),
                token_ttl: time::Duration::days(1),
            },
        }
    }
}
