use std::sync::Arc;

use crate::{
    auth::{jwt::JwtKeys, services::AuthService},
    config::AppConfig,
    db,
    products::{
        repo::{MongoProductRepository, ProductRepository},
        services::ProductService,
    },
    storage::{Storage, StorageClient},
    users::{
        repo::{MongoUserRepository, UserRepository},
        services::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub products: ProductService,
    pub auth: AuthService,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let database = db::connect(&config).await?;

        let users = MongoUserRepository::new(&database);
        users.init_indexes().await?;
        let products = MongoProductRepository::new(&database);
        products.init_indexes().await?;

        let storage = Arc::new(Storage::new(&config.s3).await?) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(
            &config,
            Arc::new(users),
            Arc::new(products),
            storage,
        ))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        products: Arc<dyn ProductRepository>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self {
            users: UserService::new(users.clone()),
            products: ProductService::new(products),
            auth: AuthService::new(users, keys),
            storage,
        }
    }

    /// In-memory stores and a recording object store.
    #[cfg(test)]
    pub fn fake() -> (Self, Arc<crate::storage::fake::FakeStorage>) {
        use crate::{
            config::{JwtConfig, S3Config},
            products::repo::memory::InMemoryProductRepository,
            storage::fake::FakeStorage,
            users::repo::memory::InMemoryUserRepository,
        };

        let config = AppConfig {
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_database: "storefront-test".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            s3: S3Config {
                bucket: "fake".into(),
                region: "us-east-1".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
                public_url: None,
            },
        };

        let storage = Arc::new(FakeStorage::default());
        let state = Self::from_parts(
            &config,
            Arc::new(InMemoryUserRepository::default()),
            Arc::new(InMemoryProductRepository::default()),
            storage.clone(),
        );
        (state, storage)
    }
}
