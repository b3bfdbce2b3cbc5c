//! # In-Memory Store
//!
//! [`ObjectStore`] kept entirely in process memory. The test suite drives the full
//! reconciliation engine against it.
//!
//! It behaves like the API server where the engine can observe the difference:
//!
//! - objects round-trip through JSON, so only serialized state survives
//! - creates assign `uid`, `resourceVersion` and `generation`
//! - replaces and status writes are rejected with `Conflict` on a stale `resourceVersion`
//! - a replace keeps the stored `status`; a status write keeps the stored spec
//!
//! Every call is recorded in order, and failures can be injected per kind and name.

use super::{kind_of, ObjectKey, ObjectStore, StoreError, StoreObject};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Store operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Create,
    Replace,
    UpdateStatus,
}

impl Verb {
    /// Whether the operation changes stored state
    pub fn is_write(self) -> bool {
        !matches!(self, Verb::Get)
    }
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub verb: Verb,
    pub kind: String,
    pub key: ObjectKey,
}

/// Failure a test can arm for a kind and name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Forbidden,
    Conflict,
    Invalid,
    Unavailable,
}

impl InjectedFailure {
    fn to_error(self, kind: &str, key: &ObjectKey) -> StoreError {
        let kind = kind.to_string();
        let key = key.clone();
        let message = format!("injected {self:?} failure");
        match self {
            InjectedFailure::Forbidden => StoreError::Forbidden { kind, key, message },
            InjectedFailure::Conflict => StoreError::Conflict { kind, key, message },
            InjectedFailure::Invalid => StoreError::Invalid { kind, key, message },
            InjectedFailure::Unavailable => StoreError::Unavailable { kind, key, message },
        }
    }
}

type Slot = (String, ObjectKey);

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Slot, Value>,
    operations: Vec<Operation>,
    read_failures: HashMap<Slot, InjectedFailure>,
    write_failures: HashMap<Slot, InjectedFailure>,
    next_resource_version: u64,
    next_uid: u64,
}

impl State {
    fn record(&mut self, verb: Verb, kind: &str, key: &ObjectKey) {
        self.operations.push(Operation {
            verb,
            kind: kind.to_string(),
            key: key.clone(),
        });
    }

    fn bump_resource_version(&mut self) -> String {
        self.next_resource_version += 1;
        self.next_resource_version.to_string()
    }

    fn new_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-4000-8000-{:012x}", self.next_uid)
    }
}

/// In-process object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the store from the assertions that follow
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed an object as if an external actor had created it (not recorded as an operation)
    ///
    /// Fills in `uid`, `resourceVersion` and `generation` when missing and returns the
    /// stored object.
    pub fn insert<K: StoreObject>(&self, obj: K) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let key = ObjectKey::for_object(&obj).ok_or_else(|| StoreError::MissingIdentity {
            kind: kind.clone(),
        })?;
        let mut state = self.lock();
        let mut value = serde_json::to_value(&obj)?;
        let uid = match obj.meta().uid.clone() {
            Some(uid) => uid,
            None => state.new_uid(),
        };
        let resource_version = state.bump_resource_version();
        let metadata = metadata_mut(&mut value);
        metadata.insert("uid".to_string(), Value::String(uid));
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(resource_version),
        );
        metadata
            .entry("generation".to_string())
            .or_insert(Value::from(1));
        state.objects.insert((kind, key), value.clone());
        Ok(serde_json::from_value(value)?)
    }

    /// Read an object without recording an operation
    pub fn object<K: StoreObject>(&self, key: &ObjectKey) -> Option<K> {
        let state = self.lock();
        state
            .objects
            .get(&(kind_of::<K>(), key.clone()))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Fail every `get` of the given kind and name
    pub fn fail_reads<K: StoreObject>(&self, key: &ObjectKey, failure: InjectedFailure) {
        self.lock()
            .read_failures
            .insert((kind_of::<K>(), key.clone()), failure);
    }

    /// Fail every create, replace and status write of the given kind and name
    pub fn fail_writes<K: StoreObject>(&self, key: &ObjectKey, failure: InjectedFailure) {
        self.lock()
            .write_failures
            .insert((kind_of::<K>(), key.clone()), failure);
    }

    /// Disarm every injected failure
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.read_failures.clear();
        state.write_failures.clear();
    }

    /// Every recorded operation, oldest first
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Recorded operations that changed (or tried to change) stored state
    pub fn writes(&self) -> Vec<Operation> {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.verb.is_write())
            .cloned()
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    /// Whether any recorded operation touched the given kind
    pub fn touched<K: StoreObject>(&self) -> bool {
        let kind = kind_of::<K>();
        self.lock().operations.iter().any(|op| op.kind == kind)
    }

    /// Forget recorded operations, keeping stored objects
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    fn checked_write<K: StoreObject>(
        &self,
        verb: Verb,
        obj: &K,
    ) -> Result<(MutexGuard<'_, State>, Slot, Value), StoreError> {
        let kind = kind_of::<K>();
        let key = ObjectKey::for_object(obj).ok_or_else(|| StoreError::MissingIdentity {
            kind: kind.clone(),
        })?;
        let value = serde_json::to_value(obj)?;
        let mut state = self.lock();
        state.record(verb, &kind, &key);
        let slot = (kind, key);
        if let Some(failure) = state.write_failures.get(&slot) {
            return Err(failure.to_error(&slot.0, &slot.1));
        }
        Ok((state, slot, value))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let mut state = self.lock();
        state.record(Verb::Get, &kind, key);
        let slot = (kind, key.clone());
        if let Some(failure) = state.read_failures.get(&slot) {
            return Err(failure.to_error(&slot.0, key));
        }
        match state.objects.get(&slot) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(StoreError::NotFound {
                kind: slot.0,
                key: key.clone(),
            }),
        }
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (mut state, slot, mut value) = self.checked_write(Verb::Create, obj)?;
        if state.objects.contains_key(&slot) {
            return Err(StoreError::Conflict {
                message: "object already exists".to_string(),
                kind: slot.0,
                key: slot.1,
            });
        }
        let uid = state.new_uid();
        let resource_version = state.bump_resource_version();
        let metadata = metadata_mut(&mut value);
        metadata.insert("uid".to_string(), Value::String(uid));
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(resource_version),
        );
        metadata.insert("generation".to_string(), Value::from(1));
        state.objects.insert(slot, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn replace<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (mut state, slot, mut value) = self.checked_write(Verb::Replace, obj)?;
        let current = precondition(&state, &slot, &value)?;

        // The status sub-resource is only written through update_status
        match current.get("status") {
            Some(status) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert("status".to_string(), status.clone());
                }
            }
            None => {
                if let Some(object) = value.as_object_mut() {
                    object.remove("status");
                }
            }
        }

        let generation = current
            .pointer("/metadata/generation")
            .and_then(Value::as_i64)
            .unwrap_or(1);
        let generation = if current.get("spec") == value.get("spec") {
            generation
        } else {
            generation + 1
        };
        let uid = current.pointer("/metadata/uid").cloned();
        let resource_version = state.bump_resource_version();
        let metadata = metadata_mut(&mut value);
        if let Some(uid) = uid {
            metadata.insert("uid".to_string(), uid);
        }
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(resource_version),
        );
        metadata.insert("generation".to_string(), Value::from(generation));
        state.objects.insert(slot, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (mut state, slot, value) = self.checked_write(Verb::UpdateStatus, obj)?;
        let mut current = precondition(&state, &slot, &value)?;

        match value.get("status") {
            Some(status) => {
                if let Some(object) = current.as_object_mut() {
                    object.insert("status".to_string(), status.clone());
                }
            }
            None => {
                if let Some(object) = current.as_object_mut() {
                    object.remove("status");
                }
            }
        }
        let resource_version = state.bump_resource_version();
        metadata_mut(&mut current).insert(
            "resourceVersion".to_string(),
            Value::String(resource_version),
        );
        state.objects.insert(slot, current.clone());
        Ok(serde_json::from_value(current)?)
    }
}

/// The stored object, provided the write carries its current `resourceVersion`
fn precondition(state: &State, slot: &Slot, value: &Value) -> Result<Value, StoreError> {
    let current = state
        .objects
        .get(slot)
        .cloned()
        .ok_or_else(|| StoreError::NotFound {
            kind: slot.0.clone(),
            key: slot.1.clone(),
        })?;
    let stored_version = current.pointer("/metadata/resourceVersion");
    let written_version = value.pointer("/metadata/resourceVersion");
    if written_version.is_some() && written_version != stored_version {
        return Err(StoreError::Conflict {
            kind: slot.0.clone(),
            key: slot.1.clone(),
            message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
        });
    }
    Ok(current)
}

fn metadata_mut(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }
    let object = value
        .as_object_mut()
        .unwrap_or_else(|| unreachable!("value was just made an object"));
    let metadata = object
        .entry("metadata".to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(serde_json::Map::new());
    }
    metadata
        .as_object_mut()
        .unwrap_or_else(|| unreachable!("metadata was just made an object"))
}
