//! Bidirectional interop between native Rust and a managed,
//! garbage-collected object runtime.
//!
//! This crate re-exports the core layer; see [`clrbridge_core`] for the
//! full API documentation. The short tour:
//!
//! - [`make_method_invoker`], [`make_field_invoker`],
//!   [`make_property_invoker`] - bind reflection-resolved members into
//!   strongly-typed callables.
//! - [`register_pod_converter!`] / [`register_wrapper_converter!`] -
//!   declare how native types cross the boundary.
//! - [`internal_call`] / [`internal_method`] + [`InternalCallRegistry`] -
//!   expose native functions to managed code.
//! - [`runtime`] - the host runtime's collaborator surface (domains,
//!   assemblies, classes, objects).

pub use clrbridge_core::*;
pub use clrbridge_core::{register_pod_converter, register_wrapper_converter};

/// Convenience imports for embedders.
pub mod prelude {
    pub use clrbridge_core::runtime::{
        Assembly, AssemblyBuilder, Class, ClassBuilder, Domain, MethodAttributes, Object,
    };
    pub use clrbridge_core::{
        BridgeError, FromManaged, InternalCallRegistry, ManagedException, ManagedValue,
        ObjectWrapper, ToManaged, internal_call, internal_method, make_field_invoker,
        make_method_invoker, make_property_invoker,
    };
}
