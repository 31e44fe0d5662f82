//! Typed property accessors.
//!
//! A property's get/set are zero/one-argument methods under the hood, so
//! the invoker routes through the same generic invoke path as method
//! thunks - marshaling logic is not duplicated between members.

use std::marker::PhantomData;

use crate::convert::{FromManaged, ToManaged};
use crate::error::BridgeError;
use crate::runtime::class::Property;
use crate::runtime::method::Method;
use crate::runtime::object::Object;

/// Typed get/set access over a resolved property handle.
pub struct PropertyInvoker<T> {
    property: Property,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyInvoker<T>
where
    T: ToManaged + FromManaged,
{
    pub fn new(property: Property) -> Self {
        Self {
            property,
            _marker: PhantomData,
        }
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Read an instance property through its getter method.
    pub fn get(&self, instance: &Object) -> Result<T, BridgeError> {
        self.check_staticness(false)?;
        let getter = self.getter()?;
        let result = getter.invoke(Some(instance), &[])?;
        T::from_managed(&result, self.property.declaring_class().domain())
            .map_err(BridgeError::from)
    }

    /// Write an instance property through its setter method.
    pub fn set(&self, instance: &Object, value: T) -> Result<(), BridgeError> {
        self.check_staticness(false)?;
        let setter = self.setter()?;
        let domain = self.property.declaring_class().domain().clone();
        let boxed = value.to_managed(&domain)?;
        setter.invoke(Some(instance), &[boxed])?;
        Ok(())
    }

    /// Read a static property.
    pub fn get_static(&self) -> Result<T, BridgeError> {
        self.check_staticness(true)?;
        let getter = self.getter()?;
        let result = getter.invoke(None, &[])?;
        T::from_managed(&result, self.property.declaring_class().domain())
            .map_err(BridgeError::from)
    }

    /// Write a static property.
    pub fn set_static(&self, value: T) -> Result<(), BridgeError> {
        self.check_staticness(true)?;
        let setter = self.setter()?;
        let domain = self.property.declaring_class().domain().clone();
        let boxed = value.to_managed(&domain)?;
        setter.invoke(None, &[boxed])?;
        Ok(())
    }

    fn getter(&self) -> Result<Method, BridgeError> {
        self.property
            .getter()
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: self.property.declaring_class().full_name(),
                desc: format!("get_{}()", self.property.name()),
            })
    }

    fn setter(&self) -> Result<Method, BridgeError> {
        self.property
            .setter()
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: self.property.declaring_class().full_name(),
                desc: format!("set_{}/1", self.property.name()),
            })
    }

    fn check_staticness(&self, want_static: bool) -> Result<(), BridgeError> {
        if self.property.is_static() == want_static {
            Ok(())
        } else {
            Err(BridgeError::StaticMismatch {
                member: self.property.full_declname(),
                reason: if want_static {
                    "instance property accessed through a static accessor"
                } else {
                    "static property accessed through an instance accessor"
                },
            })
        }
    }
}

impl<T> Clone for PropertyInvoker<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for PropertyInvoker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropertyInvoker({})", self.property.full_declname())
    }
}

/// Bind a resolved property handle to a native value type.
pub fn make_property_invoker<T>(property: Property) -> PropertyInvoker<T>
where
    T: ToManaged + FromManaged,
{
    PropertyInvoker::new(property)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_call::InternalCallRegistry;
    use crate::runtime::domain::Domain;
    use crate::runtime::{AssemblyBuilder, ClassBuilder};
    use crate::value::ManagedValue;
    use std::sync::Arc;

    // Properties backed by fields, the usual managed pattern.
    fn player_domain() -> Domain {
        let domain = Domain::new("property-tests", Arc::new(InternalCallRegistry::new()));
        let class = ClassBuilder::new("Tests", "Player")
            .field("score_backing", ManagedValue::Int(10))
            .static_field("limit_backing", ManagedValue::Int(100))
            .property(
                "Score",
                "int",
                |_, obj, _| Ok(obj.expect("instance getter").field_raw("score_backing")?),
                Some(Arc::new(|_, obj, args| {
                    let obj = obj.expect("instance setter");
                    obj.set_field_raw("score_backing", args[0].clone())?;
                    Ok(ManagedValue::Void)
                })),
            )
            .static_property(
                "Limit",
                "int",
                |domain, _, _| {
                    let class = domain.class_by_full_name("Tests.Player").expect("loaded");
                    Ok(class.static_field_raw("limit_backing")?)
                },
                Some(Arc::new(|domain, _, args| {
                    let class = domain.class_by_full_name("Tests.Player").expect("loaded");
                    class.set_static_field_raw("limit_backing", args[0].clone())?;
                    Ok(ManagedValue::Void)
                })),
            )
            .property("ReadOnly", "int", |_, _, _| Ok(ManagedValue::Int(1)), None)
            .build();
        domain
            .load(AssemblyBuilder::new("players").class(class).build())
            .unwrap();
        domain
    }

    #[test]
    fn instance_property_roundtrip() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();
        let score = make_property_invoker::<i32>(class.property("Score").unwrap());

        let a = class.new_instance().unwrap();
        let b = class.new_instance().unwrap();
        assert_eq!(score.get(&a).unwrap(), 10);

        score.set(&a, 55).unwrap();
        assert_eq!(score.get(&a).unwrap(), 55);
        assert_eq!(score.get(&b).unwrap(), 10);
    }

    #[test]
    fn static_property_roundtrip() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();
        let limit = make_property_invoker::<i32>(class.property("Limit").unwrap());

        assert_eq!(limit.get_static().unwrap(), 100);
        limit.set_static(250).unwrap();
        assert_eq!(limit.get_static().unwrap(), 250);
    }

    #[test]
    fn setterless_property_set_fails() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();
        let read_only = make_property_invoker::<i32>(class.property("ReadOnly").unwrap());

        let obj = class.new_instance().unwrap();
        assert_eq!(read_only.get(&obj).unwrap(), 1);
        assert!(matches!(
            read_only.set(&obj, 2).unwrap_err(),
            BridgeError::MethodNotFound { .. }
        ));
    }

    #[test]
    fn staticness_mismatch_is_rejected() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();

        let score = make_property_invoker::<i32>(class.property("Score").unwrap());
        assert!(matches!(
            score.get_static().unwrap_err(),
            BridgeError::StaticMismatch { .. }
        ));

        let limit = make_property_invoker::<i32>(class.property("Limit").unwrap());
        let obj = class.new_instance().unwrap();
        assert!(matches!(
            limit.get(&obj).unwrap_err(),
            BridgeError::StaticMismatch { .. }
        ));
    }

    #[test]
    fn dead_instance_is_rejected_by_invoke_path() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();
        let score = make_property_invoker::<i32>(class.property("Score").unwrap());

        let obj = class.new_instance().unwrap();
        domain.free_object(&obj);
        assert!(matches!(
            score.get(&obj).unwrap_err(),
            BridgeError::InvalidInstance { .. }
        ));
    }

    #[test]
    fn accessors_visible_through_reflection() {
        let domain = player_domain();
        let class = domain.class_by_full_name("Tests.Player").unwrap();
        let names: Vec<String> = class
            .methods()
            .iter()
            .map(|method| method.desc().to_string())
            .collect();
        assert!(names.contains(&"get_Score()".to_string()));
        assert!(names.contains(&"set_Score(int)".to_string()));
    }
}
