//! Core interop layer between native Rust and a managed, garbage-collected
//! object runtime.
//!
//! The bridge works in both directions:
//!
//! - **Native → managed**: resolve a class, bind a [`MethodInvoker`] /
//!   [`FieldInvoker`] / [`PropertyInvoker`] to it, and call with plain
//!   Rust values. Argument signatures are derived at compile time from the
//!   native types; marshaling goes through the [`ToManaged`] /
//!   [`FromManaged`] converter traits.
//! - **Managed → native**: bind native functions in an
//!   [`InternalCallRegistry`] under qualified extern-method names; the
//!   runtime dispatches managed calls to them with automatic argument
//!   unmarshaling, translating native failures into managed exceptions.
//!
//! Plain data crosses by value (identity or explicitly converted layout),
//! strings cross as managed strings, and reference-counted native objects
//! cross as proxy instances holding one strong reference (the
//! [`ObjectWrapper`] protocol).
//!
//! # Preconditions
//!
//! Every call across the boundary assumes the current thread is attached
//! to the host runtime; attachment is the embedder's responsibility and is
//! not checked here. Resolved handles ([`runtime::Class`],
//! [`runtime::Method`], [`runtime::Field`], [`runtime::Property`]) are
//! only meaningful against the domain they were resolved from and must not
//! outlive it.
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(InternalCallRegistry::new());
//! let domain = Domain::new("game", registry);
//! let assembly = domain.load(game_assembly())?;
//!
//! let class = assembly.class("Game", "Player")?;
//! let heal = make_method_invoker::<(f32,), f32>(&class, "Heal")?;
//! let player = class.new_instance()?;
//! let health = heal.call(Some(&player), (25.0,))?;
//! ```

mod convert;
mod error;
mod field_invoker;
mod internal_call;
mod marshal;
mod method_invoker;
mod property_invoker;
pub mod runtime;
mod signature;
mod value;
mod wrapper;

pub use convert::{FromManaged, ToManaged};
pub use error::{
    BridgeError, ConversionError, InternalCallError, ManagedException, NativeError,
};
pub use field_invoker::{FieldInvoker, make_field_invoker};
pub use internal_call::{
    InternalCall, InternalCallContext, InternalCallRegistry, IntoMethodCall, IntoStaticCall,
    internal_call, internal_method,
};
pub use marshal::ArgPack;
pub use method_invoker::{MethodInvoker, make_method_invoker};
pub use property_invoker::{PropertyInvoker, make_property_invoker};
pub use signature::{MethodDesc, QualifiedName, TypeToken, derive_signature};
pub use value::{ManagedValue, ObjectHandle};
pub use wrapper::ObjectWrapper;

// Used by the registration macros through `$crate::...`.
pub use runtime::{Domain, Object};
