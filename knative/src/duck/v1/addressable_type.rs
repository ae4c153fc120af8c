use super::knative_reference::KReference;
use crate::error::Error;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Resource, ResourceExt};
use kube::core::{ApiResource, DynamicObject};
use thiserror::Error;
use url::Url;
use serde_json::Value;
use serde::Deserialize;

/// Domain suffix of in-cluster service hostnames.
pub const CLUSTER_DOMAIN: &str = "cluster.local";

#[derive(Error, Debug)]
pub enum AddressableErr {
    #[error("{0} ({1}) is not an AddressableType")]
    NotAddressable(String, String),
    #[error("url missing in address of {0}")]
    UrlNotSet(String),
    #[error("service must have name to be addressable")]
    ServiceMustHaveName,
    #[error("unable to parse url: {0}")]
    UrlParseErr(#[from] url::ParseError)
}

#[derive(Deserialize)]
pub struct Addressable {
    pub url: Option<Url>
}

#[derive(Deserialize)]
pub struct AddressableStatus {
    pub address: Addressable,
}

#[derive(Deserialize)]
pub struct AddressableType {
    pub status: AddressableStatus
}

#[doc(hidden)]
/// Construct the uri from the service metadata
fn build_service_url(name: &str, namespace: &str) -> Result<Url, AddressableErr> {
    Ok(Url::parse(&format!("http://{name}.{namespace}.svc.{CLUSTER_DOMAIN}"))?)
}

#[doc(hidden)]
/// Parse a url from a &serde_json::Value containing a status. This avoids a clone of data.
fn parse_url_from_obj_data(name: &str, kind: &str, data: &Value) -> Result<Url, AddressableErr> {
    let address = data.get("status")
        .and_then(|status| status.get("address"))
        .and_then(Value::as_object)
        .ok_or_else(|| AddressableErr::NotAddressable(name.to_string(), kind.to_string()))?;

    match address.get("url").and_then(Value::as_str) {
        Some(url) => Ok(Url::parse(url)?),
        None => Err(AddressableErr::UrlNotSet(name.to_string()))
    }
}

/// Objects that can report the URL events should be sent to.
pub trait AddressableTypeExt {
    fn try_get_address(&self) -> Result<Url, AddressableErr>;
}

impl AddressableTypeExt for AddressableType {
    fn try_get_address(&self) -> Result<Url, AddressableErr> {
        self.status.address.url
            .clone()
            .ok_or_else(|| AddressableErr::UrlNotSet("addressable".to_string()))
    }
}

impl AddressableTypeExt for DynamicObject {
    fn try_get_address(&self) -> Result<Url, AddressableErr> {
        let name = self.meta().name.as_ref().ok_or(AddressableErr::ServiceMustHaveName)?;
        let namespace = self.namespace().unwrap_or_else(|| "default".into());

        match &self.types {
            Some(t) => match (t.api_version.as_ref(), t.kind.as_ref()) {
                ("v1", "Service") => build_service_url(name, &namespace),
                _ => parse_url_from_obj_data(name, t.kind.as_ref(), &self.data)
            }
            None => Err(AddressableErr::NotAddressable(name.to_string(), "unknown".to_string()))
        }
    }
}

impl AddressableTypeExt for Service {
    fn try_get_address(&self) -> Result<Url, AddressableErr> {
        let name = self.meta().name.as_ref().ok_or(AddressableErr::ServiceMustHaveName)?;
        let namespace = self.namespace().unwrap_or_else(|| "default".into());
        build_service_url(name, &namespace)
    }
}

/// Looks up the object a [`KReference`] points at and returns its address.
#[async_trait::async_trait]
pub trait AddressableResolver: Send + Sync {
    async fn resolve_reference(&self, reference: &KReference) -> Result<Url, Error>;
}

#[async_trait::async_trait]
impl AddressableResolver for kube::Client {
    async fn resolve_reference(&self, reference: &KReference) -> Result<Url, Error> {
        let gvk = reference.group_version_kind()?;
        let resource = ApiResource::from_gvk(&gvk);
        let namespace = reference.namespace.as_deref().unwrap_or("default");
        let api: Api<DynamicObject> = Api::namespaced_with(self.clone(), namespace, &resource);

        let object = api.get(&reference.name).await?;
        Ok(object.try_get_address()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DEFAULT_BROKER: &str = r#"
apiVersion: eventing.knative.dev/v1
kind: Broker
metadata:
  name: default
  namespace: default
spec: {}
status:
  address:
    url: http://broker-ingress.default.svc.cluster.local/default/default
"#;

    const DEFAULT_SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: default
  namespace: default
spec:
  ports:
  - port: 80
"#;

    const PENDING_CHANNEL: &str = r#"
apiVersion: messaging.knative.dev/v1
kind: InMemoryChannel
metadata:
  name: pending
  namespace: default
status:
  address: {}
"#;

    #[test]
    fn broker_uri() {
        let broker: DynamicObject = serde_yaml::from_str(DEFAULT_BROKER).unwrap();
        let uri = broker.try_get_address().expect("broker is addressable");
        assert_eq!(uri.scheme(), "http");
        assert_eq!(uri.host_str(), Some("broker-ingress.default.svc.cluster.local"));
        assert_eq!(uri.path(), "/default/default");
    }

    #[test]
    fn broker_status_deserializes_into_addressable() {
        let broker: DynamicObject = serde_yaml::from_str(DEFAULT_BROKER).unwrap();
        let addressable: AddressableType = serde_json::from_value(broker.data)
            .expect("broker status deserializes into AddressableType");
        let uri = addressable.try_get_address().expect("url set on default broker");
        assert_eq!(uri.path(), "/default/default");
    }

    #[test]
    fn service_uri() {
        let service: DynamicObject = serde_yaml::from_str(DEFAULT_SERVICE).unwrap();
        let uri = service.try_get_address().expect("service is addressable");
        assert_eq!(uri.as_str(), "http://default.default.svc.cluster.local/");
    }

    #[test]
    fn service_struct_uri() {
        let service: Service = serde_yaml::from_str(DEFAULT_SERVICE).unwrap();
        let uri = service.try_get_address().expect("service is addressable");
        assert_eq!(uri.host_str(), Some("default.default.svc.cluster.local"));
    }

    #[test]
    fn missing_url_is_reported() {
        let channel: DynamicObject = serde_yaml::from_str(PENDING_CHANNEL).unwrap();
        assert!(matches!(channel.try_get_address(), Err(AddressableErr::UrlNotSet(name)) if name == "pending"));
    }
}
