//! Shared fixture for the integration suites: a 2-float native POD with a
//! structurally different managed counterpart, a wrapper registration for
//! its reference-counted form, and a managed test class exercising both.
#![allow(dead_code)]

use std::sync::Arc;

use clrbridge::prelude::*;
use clrbridge::runtime::ClassDef;
use clrbridge::{ManagedValue, ToManaged, register_pod_converter, register_wrapper_converter};

/// Native-side vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Managed-side layout of the same data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2f> for Vector2f {
    fn from(v: Vec2f) -> Self {
        Vector2f { x: v.x, y: v.y }
    }
}

impl From<Vector2f> for Vec2f {
    fn from(v: Vector2f) -> Self {
        Vec2f { x: v.x, y: v.y }
    }
}

register_pod_converter!(Vec2f => Vector2f, token = "Tests.Vector2f");
register_wrapper_converter!(Vec2f, class = "Tests.WrapperVector2f");

/// Box a managed-layout vector.
pub fn vector(x: f32, y: f32) -> ManagedValue {
    ManagedValue::boxed(Vector2f { x, y })
}

pub fn unbox_vector(value: &ManagedValue) -> Vector2f {
    *value
        .boxed_ref::<Vector2f>()
        .expect("value should carry a Vector2f")
}

/// The managed test class: POD fields and properties (instance and
/// static), a method mutating instance state, and methods taking/returning
/// the POD and wrapper types.
pub fn bridge_test_class() -> ClassDef {
    ClassBuilder::new("Tests", "BridgeTest")
        .field("someFieldPOD", vector(12.0, 13.0))
        .field("propBacking", vector(12.0, 13.0))
        .static_field("someFieldPODStatic", vector(12.0, 13.0))
        .static_field("someFieldWrapperStatic", ManagedValue::Null)
        .static_field("staticPropBacking", vector(6.0, 7.0))
        .method(
            "MethodPodAR(Tests.Vector2f)",
            MethodAttributes::empty(),
            |_, _, args| {
                let v = *args[0]
                    .boxed_ref::<Vector2f>()
                    .ok_or_else(|| ManagedException::new("System.InvalidCastException", "arg 0"))?;
                Ok(ManagedValue::boxed(Vector2f {
                    x: v.x * 2.0,
                    y: v.y * 3.0,
                }))
            },
        )
        .method(
            "MethodPodARW(Tests.WrapperVector2f)",
            MethodAttributes::empty(),
            |domain, _, args| {
                let rhs = <Arc<Vec2f> as FromManaged>::from_managed(&args[0], domain)
                    .map_err(|e| ManagedException::new("System.InvalidCastException", e.to_string()))?;
                // Hand back a fresh native object with the coordinates swapped.
                Arc::new(Vec2f::new(rhs.y, rhs.x))
                    .to_managed(domain)
                    .map_err(|e| ManagedException::new("System.InvalidCastException", e.to_string()))
            },
        )
        .method(
            "Scale(single)",
            MethodAttributes::empty(),
            |_, obj, args| {
                let obj = obj.ok_or_else(|| {
                    ManagedException::new("System.NullReferenceException", "this")
                })?;
                let factor = args[0].as_float().unwrap_or(1.0) as f32;
                let mut v = unbox_vector(&obj.field_raw("someFieldPOD")?);
                v.x *= factor;
                v.y *= factor;
                obj.set_field_raw("someFieldPOD", ManagedValue::boxed(v))?;
                Ok(ManagedValue::boxed(v))
            },
        )
        .property(
            "somePropertyPOD",
            "Tests.Vector2f",
            |_, obj, _| {
                let obj = obj.ok_or_else(|| {
                    ManagedException::new("System.NullReferenceException", "this")
                })?;
                Ok(obj.field_raw("propBacking")?)
            },
            Some(Arc::new(|_, obj, args| {
                let obj = obj.ok_or_else(|| {
                    ManagedException::new("System.NullReferenceException", "this")
                })?;
                obj.set_field_raw("propBacking", args[0].clone())?;
                Ok(ManagedValue::Void)
            })),
        )
        .static_property(
            "somePropertyPODStatic",
            "Tests.Vector2f",
            |domain, _, _| {
                let class = domain
                    .class_by_full_name("Tests.BridgeTest")
                    .ok_or_else(|| ManagedException::new("System.TypeLoadException", "Tests.BridgeTest"))?;
                Ok(class.static_field_raw("staticPropBacking")?)
            },
            Some(Arc::new(|domain, _, args| {
                let class = domain
                    .class_by_full_name("Tests.BridgeTest")
                    .ok_or_else(|| ManagedException::new("System.TypeLoadException", "Tests.BridgeTest"))?;
                class.set_static_field_raw("staticPropBacking", args[0].clone())?;
                Ok(ManagedValue::Void)
            })),
        )
        .build()
}

/// The wrapper proxy class, with no members of its own: the handle field
/// is stored through the object-wrapper protocol.
pub fn wrapper_class() -> ClassDef {
    ClassBuilder::new("Tests", "WrapperVector2f").build()
}

/// A domain with the test assembly loaded and no internal calls.
pub fn test_domain() -> Domain {
    let domain = Domain::new("tests", Arc::new(InternalCallRegistry::new()));
    domain
        .load(
            AssemblyBuilder::new("tests_managed")
                .class(bridge_test_class())
                .class(wrapper_class())
                .build(),
        )
        .expect("test assembly should load");
    domain
}

pub fn bridge_test_class_of(domain: &Domain) -> Class {
    domain
        .assembly("tests_managed")
        .expect("assembly loaded")
        .class("Tests", "BridgeTest")
        .expect("class present")
}
