use std::env;

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through the
/// application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local x-user-id bypass and log format.
    pub env: Env,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Postgres connection string. `None` in local mode selects the in-memory profile store.
    pub db_url: Option<String>,
    // HMAC secret the identity provider signs its ID tokens with.
    pub jwt_secret: String,
    pub upload: UploadConfig,
}

/// Env
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// UploadBackend
#[derive(Clone, PartialEq, Debug)]
pub enum UploadBackend {
    ImageHost,
    S3,
}

/// UploadConfig
///
/// Settings for the image upload collaborator. Only the fields of the selected
/// backend are consulted.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub backend: UploadBackend,
    // Upload preset sent with every image (folder/profile on the host side).
    pub preset: String,
    pub image_host_url: String,
    pub image_host_cloud: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_IMAGE_HOST_URL: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_PRESET: &str = "marketplace_uploads";

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            backend: UploadBackend::ImageHost,
            preset: DEFAULT_PRESET.to_string(),
            image_host_url: DEFAULT_IMAGE_HOST_URL.to_string(),
            image_host_cloud: "demo".to_string(),
            // Default MinIO credentials for local/testing convenience.
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "marketplace-uploads".to_string(),
        }
    }
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests: local mode, in-memory store.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            upload: UploadConfig::default(),
        }
    }
}

fn var_or(name: &str, fallback: &str) -> String {
    env::var(name).unwrap_or_else(|_| fallback.to_string())
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// In production, panics when a required secret is missing so the service
    /// never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let backend = match env::var("UPLOAD_BACKEND").as_deref() {
            Ok("s3") => UploadBackend::S3,
            _ => UploadBackend::ImageHost,
        };

        let bind_addr = var_or("BIND_ADDR", "0.0.0.0:3000");
        let preset = var_or("IMAGE_UPLOAD_PRESET", DEFAULT_PRESET);
        let image_host_url = var_or("IMAGE_HOST_URL", DEFAULT_IMAGE_HOST_URL);

        match env {
            Env::Local => {
                let defaults = UploadConfig::default();
                Self {
                    env: Env::Local,
                    bind_addr,
                    db_url: env::var("DATABASE_URL").ok(),
                    jwt_secret: var_or("JWT_SECRET", LOCAL_JWT_SECRET),
                    upload: UploadConfig {
                        backend,
                        preset,
                        image_host_url,
                        image_host_cloud: var_or("IMAGE_HOST_CLOUD", &defaults.image_host_cloud),
                        ..defaults
                    },
                }
            }
            Env::Production => {
                let upload = match backend {
                    UploadBackend::ImageHost => UploadConfig {
                        backend,
                        preset,
                        image_host_url,
                        image_host_cloud: env::var("IMAGE_HOST_CLOUD")
                            .expect("FATAL: IMAGE_HOST_CLOUD required in prod"),
                        ..UploadConfig::default()
                    },
                    UploadBackend::S3 => UploadConfig {
                        backend,
                        preset,
                        image_host_url,
                        image_host_cloud: String::new(),
                        s3_endpoint: env::var("S3_ENDPOINT")
                            .expect("FATAL: S3_ENDPOINT required in prod"),
                        s3_region: var_or("S3_REGION", "us-east-1"),
                        s3_key: env::var("S3_ACCESS_KEY")
                            .expect("FATAL: S3_ACCESS_KEY required in prod"),
                        s3_secret: env::var("S3_SECRET_KEY")
                            .expect("FATAL: S3_SECRET_KEY required in prod"),
                        s3_bucket: var_or("S3_BUCKET", "marketplace-uploads"),
                    },
                };

                Self {
                    env: Env::Production,
                    bind_addr,
                    db_url: Some(
                        env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                    ),
                    jwt_secret: env::var("JWT_SECRET")
                        .expect("FATAL: JWT_SECRET must be set in production."),
                    upload,
                }
            }
        }
    }
}
