use super::ObjectKey;
use crate::apis::sources::{v1alpha1::VSphereSource, GROUP};
use kube::Resource;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Identifies a dependent object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependentKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl DependentKey {
    pub fn of<K: Resource<DynamicType = ()>>(object: &K) -> Option<Self> {
        let meta = object.meta();
        Some(DependentKey {
            kind: K::kind(&()).to_string(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone()?,
        })
    }
}

/// Maps dependents to the `VSphereSource` controlling them.
///
/// Entries come from controller owner references, so a dependent whose reference was
/// removed is still routed to the source that used to control it. Every relist of a
/// watched kind routes each live object again, which refreshes the entries.
#[derive(Default)]
pub struct OwnerIndex {
    owners: RwLock<HashMap<DependentKey, ObjectKey>>,
}

impl OwnerIndex {
    /// The source controlling `object`, if any.
    pub fn owner_of<K: Resource>(object: &K) -> Option<ObjectKey> {
        let meta = object.meta();
        let owner_kind = VSphereSource::kind(&());
        let owner = meta.owner_references
            .iter()
            .flatten()
            .find(|owner| {
                owner.controller == Some(true)
                    && owner.kind == owner_kind
                    && owner.api_version.split('/').next() == Some(GROUP)
            })?;
        // owners of namespaced objects live in the same namespace
        Some(ObjectKey::new(meta.namespace.clone().unwrap_or_default(), owner.name.clone()))
    }

    /// Indexes `object` and returns the source it should be routed to.
    ///
    /// An object that no longer names a controlling source is dropped from the index and
    /// routed to the owner it was last indexed under.
    pub fn route<K: Resource<DynamicType = ()>>(&self, object: &K) -> Option<ObjectKey> {
        let key = DependentKey::of(object)?;
        let mut owners = self.owners.write();
        match Self::owner_of(object) {
            Some(owner) => {
                owners.insert(key, owner.clone());
                Some(owner)
            }
            None => owners.remove(&key),
        }
    }

    pub fn lookup(&self, key: &DependentKey) -> Option<ObjectKey> {
        self.owners.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.owners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    fn deployment(name: &str, owner: Option<(&str, &str)>) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("default".into()),
                owner_references: owner.map(|(api_version, owner)| vec![OwnerReference {
                    api_version: api_version.into(),
                    kind: "VSphereSource".into(),
                    name: owner.into(),
                    uid: "uid".into(),
                    controller: Some(true),
                    block_owner_deletion: Some(true),
                }]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn routes_controlled_dependents() {
        let index = OwnerIndex::default();
        let dep = deployment("vcenter-deployment", Some(("sources.tanzu.vmware.com/v1alpha1", "vcenter")));
        assert_eq!(index.route(&dep), Some(ObjectKey::new("default", "vcenter")));
        assert_eq!(
            index.lookup(&DependentKey::of(&dep).unwrap()),
            Some(ObjectKey::new("default", "vcenter"))
        );
    }

    #[test]
    fn ignores_foreign_owners() {
        let index = OwnerIndex::default();
        let foreign = deployment("other", Some(("example.com/v1", "vcenter")));
        assert_eq!(index.route(&foreign), None);
        assert_eq!(index.route(&deployment("orphan", None)), None);
        assert!(index.is_empty());
    }

    #[test]
    fn released_dependents_reach_their_last_owner() {
        let index = OwnerIndex::default();
        index.route(&deployment("vcenter-deployment", Some(("sources.tanzu.vmware.com/v1alpha1", "vcenter"))));

        // the owner reference was stripped, the previous owner still has to hear about it
        let released = deployment("vcenter-deployment", None);
        assert_eq!(index.route(&released), Some(ObjectKey::new("default", "vcenter")));
        assert!(index.is_empty());
        assert_eq!(index.route(&released), None);
    }

    #[test]
    fn reindexing_follows_owner_changes() {
        let index = OwnerIndex::default();
        index.route(&deployment("shared", Some(("sources.tanzu.vmware.com/v1alpha1", "a"))));
        let moved = deployment("shared", Some(("sources.tanzu.vmware.com/v1alpha1", "b")));
        assert_eq!(index.route(&moved), Some(ObjectKey::new("default", "b")));
        assert_eq!(index.len(), 1);
    }
}
