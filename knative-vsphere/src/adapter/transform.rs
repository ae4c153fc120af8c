//! Turns feed events into CloudEvents.
use super::event::ProviderEvent;
use chrono::{DateTime, FixedOffset};
use knative::source_types::CloudEventOverrides;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SPEC_VERSION: &str = "1.0";
pub const EVENT_TYPE_PREFIX: &str = "com.vmware.vsphere.";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Attribute names that overrides may not replace.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "specversion",
    "id",
    "type",
    "source",
    "time",
    "datacontenttype",
    "dataschema",
    "subject",
    "data",
];

/// A CloudEvent in structured JSON form. Read only once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CloudEvent {
    specversion: String,
    id: String,
    #[serde(rename = "type")]
    type_: String,
    source: String,
    time: DateTime<FixedOffset>,
    datacontenttype: String,
    data: Value,
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl CloudEvent {
    pub fn specversion(&self) -> &str {
        &self.specversion
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.type_
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn time(&self) -> &DateTime<FixedOffset> {
        &self.time
    }

    pub fn datacontenttype(&self) -> &str {
        &self.datacontenttype
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }

    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        &self.extensions
    }
}

/// Builds CloudEvents attributed to one vCenter.
#[derive(Debug, Clone)]
pub struct Transformer {
    source: String,
    overrides: BTreeMap<String, String>,
}

impl Transformer {
    pub fn new(source: impl Into<String>, overrides: Option<&CloudEventOverrides>) -> Self {
        let overrides = overrides
            .and_then(|overrides| overrides.extensions.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|(name, _)| !RESERVED_ATTRIBUTES.contains(&name.as_str()))
            .collect();
        Transformer {
            source: source.into(),
            overrides,
        }
    }

    /// Fails only when a feed payload cannot be represented as JSON.
    pub fn transform(&self, event: &ProviderEvent) -> Result<CloudEvent, serde_json::Error> {
        let base = event.base();
        let mut extensions: BTreeMap<String, Value> = self.overrides
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();

        let data = match event {
            ProviderEvent::EventEx(eventex) => {
                extensions.insert("eventex".into(), serde_json::to_value(eventex)?);
                serde_json::to_value(base)?
            }
            ProviderEvent::ExtendedEvent(extended) => {
                extensions.insert("extendedevent".into(), serde_json::to_value(extended)?);
                serde_json::to_value(base)?
            }
            ProviderEvent::Other(generic) => {
                let mut data = serde_json::to_value(base)?;
                if let Value::Object(fields) = &mut data {
                    fields.extend(generic.details.clone());
                }
                data
            }
        };

        Ok(CloudEvent {
            specversion: SPEC_VERSION.into(),
            id: base.key.to_string(),
            type_: format!("{EVENT_TYPE_PREFIX}{}", event.class_name().to_lowercase()),
            source: self.source.clone(),
            time: base.created_time,
            datacontenttype: CONTENT_TYPE_JSON.into(),
            data,
            extensions,
        })
    }
}
