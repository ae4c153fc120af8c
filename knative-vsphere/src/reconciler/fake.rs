//! In-memory [`ResourceStore`] for tests.
use super::store::{Object, ResourceStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Update,
    UpdateStatus,
}

type Key = (String, String, String);

/// Mimics the API server: resource versions, status subresource semantics and
/// optional server side defaulting.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<Key, Value>>,
    version: AtomicUsize,
    writes: AtomicUsize,
    failures: Mutex<Vec<(Op, String)>>,
    defaulter: Option<fn(&str, &mut Value)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `defaulter` on every written object, like admission defaulting would.
    pub fn with_defaulter(defaulter: fn(&str, &mut Value)) -> Self {
        MemoryStore {
            defaulter: Some(defaulter),
            ..Self::default()
        }
    }

    /// Stores an object without counting it as a write.
    pub fn seed<K: Object>(&self, object: &K) {
        let mut value = serde_json::to_value(object).unwrap();
        value["metadata"]["resourceVersion"] = Value::String(self.next_version());
        self.objects.lock().insert(key_of::<K>(&value), value);
    }

    /// Makes the next `op` on `K` fail with a conflict.
    pub fn fail_next<K: Object>(&self, op: Op) {
        self.failures.lock().push((op, K::kind(&()).to_string()));
    }

    /// Number of successful create, update and status writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fetch<K: Object>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (K::kind(&()).to_string(), namespace.to_string(), name.to_string());
        self.objects.lock().get(&key).map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    /// Edits a stored object as another actor would, bumping its resource version.
    pub fn mutate<K: Object>(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut Value)) {
        let key = (K::kind(&()).to_string(), namespace.to_string(), name.to_string());
        let version = self.next_version();
        let mut objects = self.objects.lock();
        let value = objects.get_mut(&key).expect("object to mutate");
        edit(value);
        value["metadata"]["resourceVersion"] = Value::String(version);
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn check_failure<K: Object>(&self, op: Op, name: &str) -> Result<(), StoreError> {
        let mut failures = self.failures.lock();
        match failures.iter().position(|(o, kind)| *o == op && kind == K::kind(&()).as_ref()) {
            Some(i) => {
                failures.remove(i);
                Err(conflict::<K>(name))
            }
            None => Ok(()),
        }
    }

    fn write<K: Object>(&self, op: Op, object: &K) -> Result<K, StoreError> {
        let mut value = serde_json::to_value(object)?;
        let key = key_of::<K>(&value);
        self.check_failure::<K>(op, &key.2)?;

        let mut objects = self.objects.lock();
        let existing = objects.get(&key).cloned();
        match (op, &existing) {
            (Op::Create, Some(_)) => return Err(conflict::<K>(&key.2)),
            (Op::Update | Op::UpdateStatus, None) => {
                return Err(StoreError::NotFound { kind: key.0, name: key.2 })
            }
            (Op::Update | Op::UpdateStatus, Some(existing)) => {
                if existing["metadata"]["resourceVersion"] != value["metadata"]["resourceVersion"] {
                    return Err(conflict::<K>(&key.2));
                }
            }
            (Op::Create, None) => {}
        }

        match (op, existing) {
            (Op::Update, Some(existing)) => set_status(&mut value, existing.get("status").cloned()),
            (Op::UpdateStatus, Some(mut existing)) => {
                set_status(&mut existing, value.get("status").cloned());
                value = existing;
            }
            (Op::Create, _) => set_status(&mut value, None),
            _ => {}
        }

        if let Some(defaulter) = self.defaulter {
            defaulter(&key.0, &mut value);
        }
        value["metadata"]["resourceVersion"] = Value::String(self.next_version());
        objects.insert(key, value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(value)?)
    }
}

fn set_status(value: &mut Value, status: Option<Value>) {
    if let Value::Object(map) = value {
        match status {
            Some(status) => map.insert("status".to_string(), status),
            None => map.remove("status"),
        };
    }
}

fn key_of<K: Object>(value: &Value) -> Key {
    let field = |f: &str| value["metadata"][f].as_str().unwrap_or_default().to_string();
    (K::kind(&()).to_string(), field("namespace"), field("name"))
}

fn conflict<K: Object>(name: &str) -> StoreError {
    StoreError::Conflict {
        kind: K::kind(&()).to_string(),
        name: name.to_string(),
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.fetch(namespace, name))
    }

    async fn create<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        self.write(Op::Create, object)
    }

    async fn update<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        self.write(Op::Update, object)
    }

    async fn update_status<K: Object>(&self, object: &K) -> Result<K, StoreError> {
        self.write(Op::UpdateStatus, object)
    }
}
