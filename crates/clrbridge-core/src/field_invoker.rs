//! Typed field accessors.

use std::marker::PhantomData;

use crate::convert::{FromManaged, ToManaged};
use crate::error::BridgeError;
use crate::runtime::class::Field;
use crate::runtime::object::Object;

/// Typed get/set access over a resolved field handle.
///
/// Instance fields are accessed with [`get`](Self::get)/[`set`](Self::set),
/// static fields with [`get_static`](Self::get_static)/
/// [`set_static`](Self::set_static); using the wrong pair fails with a
/// descriptive staticness error. Values route through the same converter
/// traits as method arguments.
pub struct FieldInvoker<T> {
    field: Field,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldInvoker<T>
where
    T: ToManaged + FromManaged,
{
    pub fn new(field: Field) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Read an instance field.
    pub fn get(&self, instance: &Object) -> Result<T, BridgeError> {
        self.check_staticness(false)?;
        self.check_instance(instance)?;
        let value = instance.field_raw(self.field.name())?;
        T::from_managed(&value, self.field.declaring_class().domain()).map_err(BridgeError::from)
    }

    /// Write an instance field.
    pub fn set(&self, instance: &Object, value: T) -> Result<(), BridgeError> {
        self.check_staticness(false)?;
        self.check_instance(instance)?;
        let domain = self.field.declaring_class().domain().clone();
        let boxed = value.to_managed(&domain)?;
        instance.set_field_raw(self.field.name(), boxed)
    }

    /// Read a static field.
    pub fn get_static(&self) -> Result<T, BridgeError> {
        self.check_staticness(true)?;
        let class = self.field.declaring_class();
        let value = class.static_field_raw(self.field.name())?;
        T::from_managed(&value, class.domain()).map_err(BridgeError::from)
    }

    /// Write a static field.
    pub fn set_static(&self, value: T) -> Result<(), BridgeError> {
        self.check_staticness(true)?;
        let class = self.field.declaring_class().clone();
        let boxed = value.to_managed(class.domain())?;
        class.set_static_field_raw(self.field.name(), boxed)
    }

    fn check_staticness(&self, want_static: bool) -> Result<(), BridgeError> {
        if self.field.is_static() == want_static {
            Ok(())
        } else {
            Err(BridgeError::StaticMismatch {
                member: self.field.full_declname(),
                reason: if want_static {
                    "instance field accessed through a static accessor"
                } else {
                    "static field accessed through an instance accessor"
                },
            })
        }
    }

    fn check_instance(&self, instance: &Object) -> Result<(), BridgeError> {
        if instance.valid() {
            Ok(())
        } else {
            Err(BridgeError::InvalidInstance {
                reason: "object reference is not live",
            })
        }
    }
}

impl<T> Clone for FieldInvoker<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for FieldInvoker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldInvoker({})", self.field.full_declname())
    }
}

/// Bind a resolved field handle to a native value type.
pub fn make_field_invoker<T>(field: Field) -> FieldInvoker<T>
where
    T: ToManaged + FromManaged,
{
    FieldInvoker::new(field)
}
