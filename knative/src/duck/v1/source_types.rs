use super::{
    addressable_type::AddressableResolver,
    knative_reference::KReference,
    status_types::Status,
};
use crate::apis::FieldError;
use crate::derive::ConditionType;
use crate::error::{DiscoveryError, Error};
use knative_conditions::{ConditionAccessor, Conditions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Sink is a reference to an object that will resolve to a uri to use as the sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<Destination>,
    // CloudEventOverrides defines overrides to control the output format and
    // modifications of the event sent to the sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ce_overrides: Option<CloudEventOverrides>,
}

impl SourceSpec {
    pub fn ce_overrides(&self) -> Option<CloudEventOverrides> {
        self.ce_overrides.clone()
    }

    /// Defaults the namespace of a sink reference to the namespace of the source.
    pub fn set_defaults(&mut self, namespace: &str) {
        if let Some(ref_) = self.sink.as_mut().and_then(|sink| sink.ref_.as_mut()) {
            ref_.set_default_namespace(namespace);
        }
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        self.sink
            .as_ref()
            .map_or_else(|| Destination::default().validate(), Destination::validate)
            .map_err(|err| err.via_field("sink"))
    }
}

/// Destination represents a target of an invocation over HTTP.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Destination {
    /// Ref points to an Addressable.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<KReference>,
    /// URI is an absolute URL (non-empty scheme and non-empty host) pointing to the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<url::Url>,
}

impl From<KReference> for Destination {
    fn from(reference: KReference) -> Self {
        Destination {
            ref_: Some(KReference {
                // combine the group and api_version, handling the case that this was done already
                api_version: match (reference.api_version, reference.group) {
                    (Some(api_version), _) if api_version.contains('/') => Some(api_version),
                    (Some(api_version), Some(group)) => Some(group + "/" + &api_version),
                    (Some(api_version), None) => Some(api_version),
                    (None, _) => None,
                },
                group: None,
                kind: reference.kind,
                namespace: reference.namespace,
                name: reference.name,
            }),
            uri: None,
        }
    }
}

impl From<url::Url> for Destination {
    fn from(uri: url::Url) -> Self {
        Destination {
            ref_: None,
            uri: Some(uri),
        }
    }
}

impl Destination {
    /// Exactly one of `ref` and `uri` must be set.
    pub fn validate(&self) -> Result<(), FieldError> {
        match (&self.ref_, &self.uri) {
            (None, None) => Err(FieldError::generic("expected at least one, got none", &["ref", "uri"])),
            (Some(_), Some(_)) => Err(FieldError::multiple_one_of(&["ref", "uri"])),
            (Some(ref_), None) => ref_.validate().map_err(|err| err.via_field("ref")),
            (None, Some(uri)) if uri.host_str().map_or(true, str::is_empty) => {
                Err(FieldError::invalid_value(uri, "uri"))
            }
            (None, Some(_)) => Ok(()),
        }
    }

    pub async fn resolve_uri<R>(&self, resolver: &R) -> Result<url::Url, Error>
    where R: AddressableResolver + ?Sized {
        match (&self.ref_, &self.uri) {
            (Some(ref_), _) => resolver.resolve_reference(ref_).await,
            (None, Some(uri)) => Ok(uri.clone()),
            (None, None) => Err(Error::Discovery(DiscoveryError::EmptyDestination)),
        }
    }
}

/// CloudEventOverrides defines arguments for a Source that control the output
/// format of the CloudEvents produced by the Source.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudEventOverrides {
    /// Extensions specify what attribute are added or overridden on the
    /// outbound event. Each `Extensions` key-value pair are set on the event as
    /// an attribute extension independently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<std::collections::BTreeMap<String, String>>,
}

/// CloudEventAttributes specifies the attributes that a Source
/// uses as part of its CloudEvents.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudEventAttributes {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub source: Option<String>,
}

/// A baseline [`ConditionType`] for [`SourceStatus`].
///
/// Custom conditions should implement [`SourceConditionType`] in order to be used by
/// [`SourceStatus`].
#[derive(ConditionType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum SourceCondition {
    Ready,
    /// A [`sink_uri`] has been set on the resource.
    ///
    /// [`sink_uri`]:./struct.SourceStatus.html#structfield.sink_uri
    #[dependent]
    SinkProvided
}

/// SourceStatus shows how we expect folks to embed Addressable in
/// their Status field.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus<S: SourceConditionType> {
    /// inherits Status, which currently provides:
    /// * ObservedGeneration - the 'Generation' of the Service that was last
    ///   processed by the controller.
    /// * Conditions - the latest available observations of a resource's current
    ///   state.
    #[serde(flatten)]
    pub status: Status<S>,
    /// SinkURI is the current active sink URI that has been configured for the
    /// Source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<url::Url>,
    /// CloudEventAttributes are the specific attributes that the Source uses
    /// as part of its CloudEvents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ce_attributes: Option<Vec<CloudEventAttributes>>,
}

impl<S: SourceConditionType> ConditionAccessor<S> for SourceStatus<S> {
    fn conditions(&mut self) -> &mut Conditions<S> {
        self.status.conditions()
    }
}

/// Provides management `sink_uri` on [`SourceStatus`].
///
/// This traits helps to discourage use of the `*sinkprovided()` methods from
/// [`SourceConditionManager`], which must be disambiguated when using a custom [`ConditionType`]
/// that also has `*sinkprovided()` methods.
pub trait SinkManager<S: SourceConditionType>: SourceConditionManager<S> {
    /// Return the [`SourceStatus`] of your CRD Status type.
    fn source_status(&mut self) -> &mut SourceStatus<S>;

    /// Set the condition that the source has a sink configured
    fn mark_sink(&mut self, uri: url::Url) {
        self.source_status().sink_uri = Some(uri);
        self.manager().mark_true(S::sinkprovided());
    }

    /// Set the condition that the source has no sink configured
    fn mark_no_sink(&mut self, reason: &str, message: Option<String>) {
        self.source_status().sink_uri = None;
        self.manager().mark_false(S::sinkprovided(), reason, message);
    }

    /// The sink could not be resolved yet; readiness is undetermined rather than failed.
    fn mark_sink_unknown(&mut self, reason: &str, message: Option<String>) {
        self.source_status().sink_uri = None;
        self.manager().mark_unknown(S::sinkprovided(), reason, message);
    }
}

impl<S: SourceConditionType> SinkManager<S> for SourceStatus<S> {
    fn source_status(&mut self) -> &mut SourceStatus<S> {
        self
    }
}
