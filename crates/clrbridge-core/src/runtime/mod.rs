//! In-process model of the host runtime's collaborator surface.
//!
//! This is the side of the boundary the bridge queries and invokes:
//! reflection lookup, object allocation, generic invoke, boxed field
//! access, and internal-call dispatch. Managed method *bodies* are opaque
//! closures supplied by the embedder - no execution engine lives here.
//!
//! ## Key types
//!
//! - [`Domain`]: assemblies, class table, object heap, static storage
//! - [`Assembly`] / [`AssemblyBuilder`]: named sets of class definitions
//! - [`Class`] / [`ClassBuilder`]: class metadata and member resolution
//! - [`Method`]: resolved method handle with the generic invoke path
//! - [`Object`]: live object reference with validity tracking

pub(crate) mod assembly;
pub(crate) mod class;
pub(crate) mod domain;
pub(crate) mod method;
pub(crate) mod object;

pub use assembly::{Assembly, AssemblyBuilder, AssemblyDef};
pub use class::{Class, ClassBuilder, ClassDef, Field, MethodAttributes, MethodBodyFn, Property};
pub use domain::Domain;
pub use method::Method;
pub use object::Object;
