//! String key/value storage that survives adapter restarts.
use async_trait::async_trait;
use k8s_openapi::{api::core::v1::ConfigMap, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use kube::{
    api::{Api, PostParams},
    error::ErrorResponse,
    Client,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum KvStoreError {
    #[error("config map {0:?} was modified concurrently")]
    Conflict(String),
    #[error("unable to decode value of {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to encode value of {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Key/value storage loaded into memory by `init` and written through by `set`.
#[async_trait]
pub trait KvStore: Send {
    async fn init(&mut self) -> Result<(), KvStoreError>;
    fn get(&self, key: &str) -> Option<String>;
    async fn set(&mut self, key: &str, value: String) -> Result<(), KvStoreError>;
}

/// [`KvStore`] keeping its entries in the data of one `ConfigMap`.
pub struct ConfigMapKvStore {
    api: Api<ConfigMap>,
    name: String,
    config_map: ConfigMap,
}

fn is_status(err: &kube::Error, status: u16) -> bool {
    matches!(err, kube::Error::Api(ErrorResponse { code, .. }) if *code == status)
}

impl ConfigMapKvStore {
    pub fn new(client: Client, namespace: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        ConfigMapKvStore {
            api: Api::namespaced(client, namespace),
            config_map: ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    ..Default::default()
                },
                ..Default::default()
            },
            name,
        }
    }
}

#[async_trait]
impl KvStore for ConfigMapKvStore {
    /// Loads the config map, creating it when it does not exist yet.
    async fn init(&mut self) -> Result<(), KvStoreError> {
        self.config_map = match self.api.get(&self.name).await {
            Ok(config_map) => config_map,
            Err(err) if is_status(&err, 404) => {
                info!(name = %self.name, "creating checkpoint config map");
                match self.api.create(&PostParams::default(), &self.config_map).await {
                    Ok(config_map) => config_map,
                    // someone else created it in the meantime
                    Err(err) if is_status(&err, 409) => self.api.get(&self.name).await?,
                    Err(err) => return Err(err.into()),
                }
            }
            Err(err) => return Err(err.into()),
        };
        debug!(name = %self.name, entries = self.config_map.data.as_ref().map_or(0, BTreeMap::len), "loaded config map");
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.config_map.data.as_ref()?.get(key).cloned()
    }

    /// Writes the entry, guarded by the resource version of the last read.
    async fn set(&mut self, key: &str, value: String) -> Result<(), KvStoreError> {
        let mut updated = self.config_map.clone();
        updated.data.get_or_insert_with(BTreeMap::new).insert(key.to_string(), value);
        self.config_map = self.api
            .replace(&self.name, &PostParams::default(), &updated)
            .await
            .map_err(|err| match err {
                err if is_status(&err, 409) => KvStoreError::Conflict(self.name.clone()),
                err => err.into(),
            })?;
        Ok(())
    }
}
