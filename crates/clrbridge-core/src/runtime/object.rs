//! Object heap and live object references.
//!
//! Objects are stored in a slot table with generation tracking. When an
//! object is collected its slot is reused and the generation bumped, so
//! stale handles are detected rather than resurrected.

use rustc_hash::FxHashMap;

use crate::error::BridgeError;
use crate::runtime::class::{Class, ClassId};
use crate::runtime::domain::Domain;
use crate::value::{ManagedValue, ObjectHandle};

pub(crate) struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

struct HeapSlot {
    generation: u32,
    class: ClassId,
    /// `None` once the object has been collected
    fields: Option<FxHashMap<String, ManagedValue>>,
}

impl ObjectHeap {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn allocate(
        &mut self,
        class: ClassId,
        fields: FxHashMap<String, ManagedValue>,
    ) -> ObjectHandle {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.class = class;
            slot.fields = Some(fields);
            ObjectHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                class,
                fields: Some(fields),
            });
            ObjectHandle::new(index, 0)
        }
    }

    fn slot(&self, handle: ObjectHandle) -> Option<&HeapSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub(crate) fn is_live(&self, handle: ObjectHandle) -> bool {
        self.slot(handle).is_some_and(|slot| slot.fields.is_some())
    }

    pub(crate) fn class_of(&self, handle: ObjectHandle) -> Option<ClassId> {
        self.slot(handle)
            .filter(|slot| slot.fields.is_some())
            .map(|slot| slot.class)
    }

    pub(crate) fn field(&self, handle: ObjectHandle, name: &str) -> Option<Option<ManagedValue>> {
        let slot = self.slot(handle)?;
        let fields = slot.fields.as_ref()?;
        Some(fields.get(name).cloned())
    }

    pub(crate) fn set_field(
        &mut self,
        handle: ObjectHandle,
        name: &str,
        value: ManagedValue,
    ) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
        else {
            return false;
        };
        match slot.fields.as_mut() {
            Some(fields) => {
                fields.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Collect an object: drop its fields (releasing any native handles
    /// they hold) and bump the generation so existing handles go stale.
    pub(crate) fn free(&mut self, handle: ObjectHandle) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
        else {
            return false;
        };
        if slot.fields.is_none() {
            return false;
        }
        slot.fields = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        true
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.fields.is_some()).count()
    }
}

/// Reference to a live managed object.
///
/// Cheap to clone; equality compares identity (same domain, same heap
/// slot, same generation). The reference is only meaningful against the
/// domain it was created in, which it carries.
#[derive(Clone)]
pub struct Object {
    domain: Domain,
    handle: ObjectHandle,
}

impl Object {
    /// Attach a domain to a raw handle (e.g. one received as a boxed
    /// argument from the host runtime).
    pub fn from_handle(domain: Domain, handle: ObjectHandle) -> Self {
        Self { domain, handle }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Whether the underlying object is still live.
    pub fn valid(&self) -> bool {
        self.domain.is_live(self.handle)
    }

    /// The class this object was instantiated from.
    pub fn class(&self) -> Result<Class, BridgeError> {
        self.domain.class_of_object(self.handle)
    }

    /// Read a boxed field value.
    pub fn field_raw(&self, name: &str) -> Result<ManagedValue, BridgeError> {
        self.domain.object_field(self.handle, name)
    }

    /// Store a boxed field value.
    pub fn set_field_raw(&self, name: &str, value: ManagedValue) -> Result<(), BridgeError> {
        self.domain.set_object_field(self.handle, name, value)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.domain == other.domain
    }
}

impl Eq for Object {}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("handle", &self.handle)
            .field("valid", &self.valid())
            .finish()
    }
}
