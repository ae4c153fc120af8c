//! Events as read from the vSphere event history, in their JSON form.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Points at an object managed by vCenter, e.g. `{"Type": "Folder", "Value": "group-d1"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedObjectReference {
    #[serde(rename = "Type")]
    pub type_: String,
    pub value: String,
}

/// Names an entity involved in an event, keyed by its kind (`Datacenter`, `Vm`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EntityArgument {
    pub name: String,
    #[serde(flatten)]
    pub entity: BTreeMap<String, ManagedObjectReference>,
}

/// The fields shared by every event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub key: i32,
    #[serde(default)]
    pub chain_id: i32,
    pub created_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_resource: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ds: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvs: Option<EntityArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_formatted_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_tag: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct KeyAnyValue {
    pub key: String,
    pub value: Value,
}

/// An extensible event identified by its `EventTypeId`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EventEx {
    #[serde(flatten)]
    pub base: Event,
    pub event_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<KeyAnyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtendedEventPair {
    pub key: String,
    pub value: String,
}

/// An event raised by an extension, carrying free form key/value data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtendedEvent {
    #[serde(flatten)]
    pub base: Event,
    pub event_type_id: String,
    pub managed_object: ManagedObjectReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ExtendedEventPair>,
}

/// Any other event class (`VmPoweredOnEvent`, `UserLoginSessionEvent`, ...).
///
/// `details` holds the fields specific to the class, next to the common base.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    pub class: String,
    pub base: Event,
    pub details: Map<String, Value>,
}

/// An event of the feed, tagged by its class.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    EventEx(EventEx),
    ExtendedEvent(ExtendedEvent),
    Other(GenericEvent),
}

impl ProviderEvent {
    /// Decodes the JSON form of an event of class `class`.
    pub fn from_value(class: &str, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match class {
            "EventEx" => ProviderEvent::EventEx(serde_json::from_value(value)?),
            "ExtendedEvent" => ProviderEvent::ExtendedEvent(serde_json::from_value(value)?),
            _ => {
                let base: Event = serde_json::from_value(value.clone())?;
                let mut details = match value {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                };
                for field in base_fields(&base) {
                    details.remove(&field);
                }
                ProviderEvent::Other(GenericEvent {
                    class: class.to_string(),
                    base,
                    details,
                })
            }
        })
    }

    pub fn class_name(&self) -> &str {
        match self {
            ProviderEvent::EventEx(_) => "EventEx",
            ProviderEvent::ExtendedEvent(_) => "ExtendedEvent",
            ProviderEvent::Other(event) => &event.class,
        }
    }

    pub fn base(&self) -> &Event {
        match self {
            ProviderEvent::EventEx(event) => &event.base,
            ProviderEvent::ExtendedEvent(event) => &event.base,
            ProviderEvent::Other(event) => &event.base,
        }
    }

    pub fn key(&self) -> i32 {
        self.base().key
    }
}

fn base_fields(base: &Event) -> Vec<String> {
    match serde_json::to_value(base) {
        Ok(Value::Object(fields)) => fields.into_iter().map(|(field, _)| field).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) fn sample(class: &str, key: i32) -> ProviderEvent {
    let created_time = DateTime::parse_from_rfc3339("2020-03-01T12:00:00.5-08:00").unwrap();
    ProviderEvent::Other(GenericEvent {
        class: class.to_string(),
        base: Event {
            key,
            chain_id: key,
            created_time: created_time + chrono::Duration::seconds(key.into()),
            user_name: "VSPHERE.LOCAL\\Administrator".into(),
            datacenter: None,
            compute_resource: None,
            host: None,
            vm: None,
            ds: None,
            net: None,
            dvs: None,
            full_formatted_message: Some(format!("event {key}")),
            change_tag: None,
        },
        details: Map::new(),
    })
}
