use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, localstack). Enables path-style addressing.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Base URL used when building public object links; falls back to the
    /// virtual-hosted AWS URL of the bucket.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt: JwtConfig,
    pub s3: S3Config,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mongodb_uri = std::env::var("MONGODB_URI")?;
        let mongodb_database =
            std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "storefront".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "storefront-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let s3 = S3Config {
            bucket: std::env::var("S3_BUCKET")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            access_key: std::env::var("S3_ACCESS_KEY").ok(),
            secret_key: std::env::var("S3_SECRET_KEY").ok(),
            public_url: std::env::var("S3_PUBLIC_URL").ok(),
        };
        Ok(Self {
            mongodb_uri,
            mongodb_database,
            jwt,
            s3,
        })
    }
}

impl S3Config {
    /// Public URL of an object stored under `key`.
    pub fn object_url(&self, key: &str) -> String {
        match &self.public_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}
