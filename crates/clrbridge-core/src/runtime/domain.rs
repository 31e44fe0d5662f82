//! The domain: assemblies, the class table, the object heap, and static
//! storage.
//!
//! A [`Domain`] is a cheap-clone handle over shared state. No lock is held
//! across a managed method body or a native adapter call, so callbacks may
//! re-enter the domain freely.
//!
//! Thread attachment is the embedder's concern: every operation here
//! assumes the calling thread is already attached to the host runtime.
//! Calling from an unattached thread is a misuse the domain cannot detect.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{BridgeError, InternalCallError, NativeError};
use crate::internal_call::{InternalCallContext, InternalCallRegistry};
use crate::runtime::assembly::{Assembly, AssemblyDef};
use crate::runtime::class::{Class, ClassDef, ClassId, MethodImpl};
use crate::runtime::method::Method;
use crate::runtime::object::{Object, ObjectHeap};
use crate::value::{ManagedValue, ObjectHandle};

struct ClassTable {
    by_id: Vec<Arc<ClassDef>>,
    by_full_name: FxHashMap<String, ClassId>,
    assemblies: FxHashMap<String, Vec<ClassId>>,
}

struct DomainInner {
    name: String,
    internal_calls: Arc<InternalCallRegistry>,
    classes: Mutex<ClassTable>,
    heap: Mutex<ObjectHeap>,
    statics: Mutex<FxHashMap<(ClassId, String), ManagedValue>>,
}

/// Handle to a runtime domain.
#[derive(Clone)]
pub struct Domain {
    inner: Arc<DomainInner>,
}

impl Domain {
    /// Create a domain backed by the given internal-call registry.
    ///
    /// All internal-call bindings the domain's assemblies rely on must be
    /// present in the registry before those assemblies are loaded.
    pub fn new(name: impl Into<String>, internal_calls: Arc<InternalCallRegistry>) -> Self {
        Self {
            inner: Arc::new(DomainInner {
                name: name.into(),
                internal_calls,
                classes: Mutex::new(ClassTable {
                    by_id: Vec::new(),
                    by_full_name: FxHashMap::default(),
                    assemblies: FxHashMap::default(),
                }),
                heap: Mutex::new(ObjectHeap::new()),
                statics: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn internal_calls(&self) -> &Arc<InternalCallRegistry> {
        &self.inner.internal_calls
    }

    /// Load an assembly definition.
    ///
    /// Verifies that every extern method declared by the assembly has a
    /// registry binding with matching arity - binding after load is a
    /// configuration error this check surfaces early. Also initializes
    /// static field storage from the declared defaults.
    pub fn load(&self, assembly: AssemblyDef) -> Result<Assembly, BridgeError> {
        for class in &assembly.classes {
            self.verify_extern_bindings(class)?;
        }

        let mut ids = Vec::with_capacity(assembly.classes.len());
        {
            let mut table = self.inner.classes.lock();
            for class in &assembly.classes {
                let full_name = class.full_name();
                if table.by_full_name.contains_key(&full_name) {
                    return Err(BridgeError::DuplicateClass { name: full_name });
                }
            }
            for class in assembly.classes {
                let full_name = class.full_name();
                let id = ClassId(table.by_id.len() as u32);
                table.by_id.push(Arc::new(class));
                table.by_full_name.insert(full_name, id);
                ids.push(id);
            }
            table.assemblies.insert(assembly.name.clone(), ids.clone());
        }

        // Static storage starts at the declared defaults.
        {
            let table = self.inner.classes.lock();
            let mut statics = self.inner.statics.lock();
            for id in &ids {
                let def = &table.by_id[id.0 as usize];
                for field in &def.fields {
                    if field.is_static {
                        statics.insert((*id, field.name.clone()), field.default.clone());
                    }
                }
            }
        }

        debug!(
            "domain `{}`: loaded assembly `{}` ({} classes)",
            self.inner.name,
            assembly.name,
            ids.len()
        );
        Ok(Assembly {
            domain: self.clone(),
            name: assembly.name,
        })
    }

    fn verify_extern_bindings(&self, class: &ClassDef) -> Result<(), BridgeError> {
        let class_path = class.full_name();
        for method in &class.methods {
            if !matches!(method.body, MethodImpl::InternalCall) {
                continue;
            }
            let qualified = format!("{class_path}::{}", method.desc);
            let Some(bound) = self.inner.internal_calls.lookup(&qualified) else {
                return Err(InternalCallError::NotBound { name: qualified }.into());
            };
            if bound.arity() != method.desc.arity() {
                return Err(InternalCallError::ArityMismatch {
                    name: qualified,
                    bound: bound.arity(),
                    declared: method.desc.arity(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Look up a loaded assembly by name.
    pub fn assembly(&self, name: &str) -> Result<Assembly, BridgeError> {
        let table = self.inner.classes.lock();
        if table.assemblies.contains_key(name) {
            Ok(Assembly {
                domain: self.clone(),
                name: name.to_string(),
            })
        } else {
            Err(BridgeError::AssemblyNotFound {
                name: name.to_string(),
            })
        }
    }

    /// Resolve a class by its full name, across all loaded assemblies.
    pub fn class_by_full_name(&self, full_name: &str) -> Option<Class> {
        let table = self.inner.classes.lock();
        let id = *table.by_full_name.get(full_name)?;
        let def = Arc::clone(&table.by_id[id.0 as usize]);
        Some(Class {
            domain: self.clone(),
            id,
            def,
        })
    }

    pub(crate) fn assembly_class(
        &self,
        assembly: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Class, BridgeError> {
        let full_name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}.{name}")
        };
        let table = self.inner.classes.lock();
        let id = table.by_full_name.get(&full_name).copied();
        let member = id.is_some_and(|id| {
            table
                .assemblies
                .get(assembly)
                .is_some_and(|ids| ids.contains(&id))
        });
        match id {
            Some(id) if member => {
                let def = Arc::clone(&table.by_id[id.0 as usize]);
                Ok(Class {
                    domain: self.clone(),
                    id,
                    def,
                })
            }
            _ => Err(BridgeError::ClassNotFound { name: full_name }),
        }
    }

    /// Collect an object, releasing any native references held by its
    /// fields (the finalization path of wrapper proxies). Returns whether
    /// the reference was live.
    pub fn free_object(&self, object: &Object) -> bool {
        let freed = self.inner.heap.lock().free(object.handle());
        if freed {
            trace!("domain `{}`: collected {:?}", self.inner.name, object.handle());
        }
        freed
    }

    /// Number of live objects on the heap.
    pub fn live_objects(&self) -> usize {
        self.inner.heap.lock().live_count()
    }

    // ==== crate-internal surface used by handles ====

    pub(crate) fn alloc_object(
        &self,
        class: ClassId,
        fields: FxHashMap<String, ManagedValue>,
    ) -> Object {
        let handle = self.inner.heap.lock().allocate(class, fields);
        Object::from_handle(self.clone(), handle)
    }

    pub(crate) fn is_live(&self, handle: ObjectHandle) -> bool {
        self.inner.heap.lock().is_live(handle)
    }

    pub(crate) fn class_of_object(&self, handle: ObjectHandle) -> Result<Class, BridgeError> {
        let id = self
            .inner
            .heap
            .lock()
            .class_of(handle)
            .ok_or(BridgeError::InvalidInstance {
                reason: "object reference is not live",
            })?;
        let table = self.inner.classes.lock();
        let def = Arc::clone(&table.by_id[id.0 as usize]);
        Ok(Class {
            domain: self.clone(),
            id,
            def,
        })
    }

    pub(crate) fn object_field(
        &self,
        handle: ObjectHandle,
        name: &str,
    ) -> Result<ManagedValue, BridgeError> {
        let looked_up = self.inner.heap.lock().field(handle, name);
        match looked_up {
            None => Err(BridgeError::InvalidInstance {
                reason: "object reference is not live",
            }),
            Some(Some(value)) => Ok(value),
            Some(None) => {
                let class = self.class_of_object(handle)?;
                Err(BridgeError::FieldNotFound {
                    class: class.full_name(),
                    name: name.to_string(),
                })
            }
        }
    }

    pub(crate) fn set_object_field(
        &self,
        handle: ObjectHandle,
        name: &str,
        value: ManagedValue,
    ) -> Result<(), BridgeError> {
        if self.inner.heap.lock().set_field(handle, name, value) {
            Ok(())
        } else {
            Err(BridgeError::InvalidInstance {
                reason: "object reference is not live",
            })
        }
    }

    pub(crate) fn static_field(
        &self,
        class: &Class,
        name: &str,
    ) -> Result<ManagedValue, BridgeError> {
        self.inner
            .statics
            .lock()
            .get(&(class.id, name.to_string()))
            .cloned()
            .ok_or_else(|| BridgeError::FieldNotFound {
                class: class.full_name(),
                name: name.to_string(),
            })
    }

    pub(crate) fn set_static_field(
        &self,
        class: &Class,
        name: &str,
        value: ManagedValue,
    ) -> Result<(), BridgeError> {
        let key = (class.id, name.to_string());
        let mut statics = self.inner.statics.lock();
        if statics.contains_key(&key) {
            statics.insert(key, value);
            Ok(())
        } else {
            Err(BridgeError::FieldNotFound {
                class: class.full_name(),
                name: name.to_string(),
            })
        }
    }

    /// Dispatch an extern method to its bound native callable.
    ///
    /// The reverse marshaling direction: the native adapter unpacks the
    /// boxed arguments, runs, and packs its result. Native failures and
    /// panics are translated into managed exceptions; no native unwind
    /// crosses back into the managed caller.
    pub(crate) fn dispatch_internal_call(
        &self,
        method: &Method,
        instance: Option<&Object>,
        args: &[ManagedValue],
    ) -> Result<ManagedValue, BridgeError> {
        let qualified = method.full_name();
        let call = self
            .inner
            .internal_calls
            .lookup(&qualified)
            .ok_or_else(|| InternalCallError::NotBound {
                name: qualified.clone(),
            })?;

        trace!("dispatching internal call `{qualified}`");
        let mut ctx = InternalCallContext::new(self, instance, args);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call.call(&mut ctx)));
        match outcome {
            Ok(Ok(())) => Ok(ctx.take_return()),
            Ok(Err(native)) => Err(BridgeError::Managed(native.into_managed_exception())),
            Err(payload) => {
                let native = NativeError::Panic {
                    message: panic_message(&payload),
                };
                Err(BridgeError::Managed(native.into_managed_exception()))
            }
        }
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Domain {}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.inner.name)
            .field("live_objects", &self.live_objects())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
