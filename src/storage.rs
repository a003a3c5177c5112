use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::S3Config;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;

    /// Publicly addressable URL of `key`.
    fn object_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    config: S3Config,
}

impl Storage {
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut builder = S3ConfigBuilder::from(&shared);
        if config.endpoint.is_some() {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}
