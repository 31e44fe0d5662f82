//! Object-wrapper protocol: linking a reference-counted native object to a
//! managed proxy instance.
//!
//! The proxy stores one strong reference in an opaque handle field. The
//! protocol never frees the native object itself; the reference is
//! released when the host collects the proxy instance and drops its
//! fields. Reference counting is `Arc`, so a proxy collected on another
//! thread releases safely while native code still holds its own
//! references.

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BridgeError, ConversionError};
use crate::runtime::object::Object;
use crate::value::ManagedValue;

/// Name of the reserved handle field on wrapper proxy instances.
pub(crate) const HANDLE_FIELD: &str = "__native_handle";

/// Associates `Arc<T>` natives with managed proxy instances.
///
/// `create` is typically called from a bridged extern constructor; see
/// [`register_wrapper_converter!`](crate::register_wrapper_converter) for
/// the converter that calls into this protocol automatically.
pub struct ObjectWrapper<T: ?Sized> {
    _marker: PhantomData<T>,
}

impl<T: Send + Sync + 'static> ObjectWrapper<T> {
    /// Store a strong reference to `native` inside `instance`'s opaque
    /// handle field. The instance must be live.
    pub fn create(instance: &Object, native: Arc<T>) -> Result<(), BridgeError> {
        if !instance.valid() {
            return Err(BridgeError::InvalidInstance {
                reason: "wrapper target is not live",
            });
        }
        let handle: Arc<dyn Any + Send + Sync> = native;
        instance.set_field_raw(HANDLE_FIELD, ManagedValue::Boxed(handle))
    }

    /// Read the stored reference back, yielding an additional strong
    /// reference to the same native object.
    ///
    /// Fails with [`ConversionError::NotInitialized`] if no handle was
    /// ever stored (e.g. reading before the proxy's constructor ran, or
    /// after the proxy was collected).
    pub fn extract(instance: &Object) -> Result<Arc<T>, ConversionError> {
        let value = instance
            .field_raw(HANDLE_FIELD)
            .map_err(|_| ConversionError::NotInitialized {
                class: type_name::<T>(),
            })?;
        match value {
            ManagedValue::Boxed(handle) => {
                handle
                    .downcast::<T>()
                    .map_err(|_| ConversionError::TypeMismatch {
                        expected: type_name::<T>(),
                        actual: "boxed",
                    })
            }
            other => Err(ConversionError::TypeMismatch {
                expected: type_name::<T>(),
                actual: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_call::InternalCallRegistry;
    use crate::runtime::domain::Domain;
    use crate::runtime::{AssemblyBuilder, ClassBuilder};

    #[derive(Debug)]
    struct Mesh {
        vertices: usize,
    }

    fn domain_with_proxy() -> Domain {
        let domain = Domain::new("wrapper-tests", Arc::new(InternalCallRegistry::new()));
        domain
            .load(
                AssemblyBuilder::new("meshes")
                    .class(ClassBuilder::new("Engine", "Mesh").build())
                    .build(),
            )
            .unwrap();
        domain
    }

    fn proxy_instance(domain: &Domain) -> Object {
        domain
            .class_by_full_name("Engine.Mesh")
            .unwrap()
            .new_uninitialized()
    }

    #[test]
    fn create_then_extract_yields_same_object() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);
        let native = Arc::new(Mesh { vertices: 36 });

        ObjectWrapper::create(&instance, Arc::clone(&native)).unwrap();
        let extracted = ObjectWrapper::<Mesh>::extract(&instance).unwrap();

        assert!(Arc::ptr_eq(&native, &extracted));
        assert_eq!(extracted.vertices, 36);
    }

    #[test]
    fn extract_adds_a_reference() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);
        let native = Arc::new(Mesh { vertices: 3 });

        ObjectWrapper::create(&instance, Arc::clone(&native)).unwrap();
        // One here, one in the proxy's handle field.
        assert_eq!(Arc::strong_count(&native), 2);

        let extracted = ObjectWrapper::<Mesh>::extract(&instance).unwrap();
        assert_eq!(Arc::strong_count(&native), 3);
        drop(extracted);
        assert_eq!(Arc::strong_count(&native), 2);
    }

    #[test]
    fn extract_before_create_fails() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);

        let err = ObjectWrapper::<Mesh>::extract(&instance).unwrap_err();
        assert!(matches!(err, ConversionError::NotInitialized { .. }));
    }

    #[test]
    fn create_on_dead_instance_fails() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);
        domain.free_object(&instance);

        let err = ObjectWrapper::create(&instance, Arc::new(Mesh { vertices: 1 })).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInstance { .. }));
    }

    #[test]
    fn collection_releases_exactly_one_reference() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);
        let native = Arc::new(Mesh { vertices: 8 });

        ObjectWrapper::create(&instance, Arc::clone(&native)).unwrap();
        assert_eq!(Arc::strong_count(&native), 2);

        domain.free_object(&instance);
        assert_eq!(Arc::strong_count(&native), 1);

        // The stale proxy no longer yields the native object.
        let err = ObjectWrapper::<Mesh>::extract(&instance).unwrap_err();
        assert!(matches!(err, ConversionError::NotInitialized { .. }));
    }

    #[test]
    fn wrong_type_extraction_fails() {
        let domain = domain_with_proxy();
        let instance = proxy_instance(&domain);
        ObjectWrapper::create(&instance, Arc::new(Mesh { vertices: 1 })).unwrap();

        let err = ObjectWrapper::<String>::extract(&instance).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }
}
