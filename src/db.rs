use anyhow::Context;
use mongodb::{
    bson::{doc, spec::BinarySubtype, Binary, Bson, Document},
    options::ClientOptions,
    Client, Database,
};
use uuid::Uuid;

use crate::config::AppConfig;

/// Connect to the document store and check it answers before serving.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Database> {
    let options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .context("parse MONGODB_URI")?;
    let client = Client::with_options(options).context("build mongodb client")?;
    let db = client.database(&config.mongodb_database);
    db.run_command(doc! { "ping": 1 })
        .await
        .context("ping mongodb")?;
    tracing::info!(database = %config.mongodb_database, "connected to mongodb");
    Ok(db)
}

/// Stored form of a document identifier: BSON binary, UUID subtype.
pub fn id_bson(id: Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.as_bytes().to_vec(),
    })
}

/// Filter matching the document whose `_id` is `id`.
pub fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id_bson(id) }
}

/// Serde adapter for `_id` fields. BSON gets the binary form of `id_bson`;
/// JSON and other human-readable formats keep the hyphenated string.
pub mod uuid_as_binary {
    use mongodb::bson::Bson;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            id.serialize(serializer)
        } else {
            super::id_bson(*id).serialize(serializer)
        }
    }

    /// Accepts the binary form as well as a plain UUID string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        match Bson::deserialize(deserializer)? {
            Bson::Binary(binary) => Uuid::from_slice(&binary.bytes).map_err(D::Error::custom),
            Bson::String(s) => Uuid::parse_str(&s).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a binary or string _id, got {other:?}"
            ))),
        }
    }
}
