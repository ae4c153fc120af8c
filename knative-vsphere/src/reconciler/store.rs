use async_trait::async_trait;
use kube::{
    api::{Api, PostParams},
    error::ErrorResponse,
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Objects the reconciler reads and writes.
pub trait Object:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Object for T where
    T: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// Another writer got there first; the object must be read again.
    #[error("{kind} {name:?} was modified concurrently")]
    Conflict { kind: String, name: String },
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },
    #[error("{0} is missing metadata.name")]
    MissingName(String),
    #[error("unable to encode object: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Kube(kube::Error),
}

impl StoreError {
    fn from_kube<K: Object>(err: kube::Error, name: &str) -> Self {
        match err {
            kube::Error::Api(ErrorResponse { code: 409, .. }) => StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ErrorResponse { code: 404, .. }) => StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                name: name.to_string(),
            },
            err => StoreError::Kube(err),
        }
    }
}

/// Structured object storage with optimistic concurrency on `metadata.resourceVersion`.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// `Ok(None)` when no such object exists.
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;
    async fn create<K: Object>(&self, object: &K) -> Result<K, StoreError>;
    /// Replaces everything but the status.
    async fn update<K: Object>(&self, object: &K) -> Result<K, StoreError>;
    /// Replaces only the status.
    async fn update_status<K: Object>(&self, object: &K) -> Result<K, StoreError>;
}

/// [`ResourceStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        KubeStore { client }
    }

    fn api<K: Object>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn api_for<K: Object>(&self, object: &K) -> Result<(Api<K>, String), StoreError> {
        let meta = object.meta();
        let name = meta.name
            .clone()
            .ok_or_else(|| StoreError::MissingName(K::kind(&()).to_string()))?;
        Ok((self.api(meta.namespace.as_deref().unwrap_or("default")), name))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        match self.api::<K>(namespace).get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(ErrorResponse { code: 404, .. })) => Ok(None),
            Err(err) => Err(StoreError::from_kube::<K>(err, name)),
        }
    }

    async fn create<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        let (api, name) = self.api_for(object)?;
        api.create(&PostParams::default(), object)
            .await
            .map_err(|err| StoreError::from_kube::<K>(err, &name))
    }

    async fn update<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        let (api, name) = self.api_for(object)?;
        api.replace(&name, &PostParams::default(), object)
            .await
            .map_err(|err| StoreError::from_kube::<K>(err, &name))
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        let (api, name) = self.api_for(object)?;
        let data = serde_json::to_vec(object)?;
        api.replace_status(&name, &PostParams::default(), data)
            .await
            .map_err(|err| StoreError::from_kube::<K>(err, &name))
    }
}
