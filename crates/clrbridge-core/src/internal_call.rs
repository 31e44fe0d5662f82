//! Internal-call bridge: native functions callable from managed code.
//!
//! An extern method declared on a managed class resolves, at dispatch
//! time, to a native callable bound in an [`InternalCallRegistry`] under
//! the method's fully qualified name. The bridge performs the reverse
//! marshaling direction: boxed managed arguments are unpacked into the
//! native callable's declared parameter types, the callable runs, and its
//! result is packed back. A native failure (or panic) is translated into a
//! managed exception rather than unwinding across the boundary.
//!
//! The registry is an explicit object handed to [`Domain::new`], not an
//! ambient global. Binding is expected to happen once at startup, strictly
//! before the assemblies declaring the extern methods are loaded; there is
//! no unbinding - entries live as long as the registry.
//!
//! [`Domain::new`]: crate::runtime::Domain::new
//!
//! # Example
//!
//! ```ignore
//! fn area(width: f32, height: f32) -> f32 {
//!     width * height
//! }
//!
//! let registry = Arc::new(InternalCallRegistry::new());
//! registry.bind("Geometry.Rect::Area(single,single)", internal_call(area))?;
//! ```

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::convert::{FromManaged, ToManaged};
use crate::error::{InternalCallError, NativeError};
use crate::runtime::domain::Domain;
use crate::runtime::object::Object;
use crate::signature::QualifiedName;
use crate::value::ManagedValue;

/// Call-servicing context handed to a native adapter.
///
/// Provides the receiver, typed access to the boxed argument array, and
/// the return slot.
pub struct InternalCallContext<'a> {
    domain: &'a Domain,
    instance: Option<&'a Object>,
    args: &'a [ManagedValue],
    ret: ManagedValue,
}

impl<'a> InternalCallContext<'a> {
    pub(crate) fn new(
        domain: &'a Domain,
        instance: Option<&'a Object>,
        args: &'a [ManagedValue],
    ) -> Self {
        Self {
            domain,
            instance,
            args,
            ret: ManagedValue::Void,
        }
    }

    pub fn domain(&self) -> &Domain {
        self.domain
    }

    /// The managed receiver, for instance externs.
    pub fn instance(&self) -> Result<&Object, NativeError> {
        self.instance.ok_or(NativeError::MissingInstance)
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Borrow a boxed argument.
    pub fn arg_raw(&self, index: usize) -> Result<&ManagedValue, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            })
    }

    /// Unpack a typed argument.
    pub fn arg<T: FromManaged>(&self, index: usize) -> Result<T, NativeError> {
        let value = self.arg_raw(index)?;
        T::from_managed(value, self.domain).map_err(NativeError::from)
    }

    /// Pack the return value.
    pub fn set_return<T: ToManaged>(&mut self, value: T) -> Result<(), NativeError> {
        self.ret = value.to_managed(self.domain)?;
        Ok(())
    }

    /// Store a pre-boxed return value.
    pub fn set_return_raw(&mut self, value: ManagedValue) {
        self.ret = value;
    }

    pub(crate) fn take_return(self) -> ManagedValue {
        self.ret
    }
}

impl std::fmt::Debug for InternalCallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalCallContext")
            .field("arg_count", &self.arg_count())
            .field("has_instance", &self.has_instance())
            .finish()
    }
}

type AdapterFn = dyn Fn(&mut InternalCallContext) -> Result<(), NativeError> + Send + Sync;

/// A native callable in the fixed shape the runtime dispatches to.
///
/// Usually produced by the typed adapters ([`internal_call`] and
/// [`internal_method`], which accept both plain and `Result`-returning
/// functions); `new` is the low-level escape hatch for callables that
/// want raw context access.
#[derive(Clone)]
pub struct InternalCall {
    arity: usize,
    inner: Arc<AdapterFn>,
}

impl InternalCall {
    /// Wrap a raw context function with an explicit native arity.
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&mut InternalCallContext) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self {
            arity,
            inner: Arc::new(f),
        }
    }

    /// The native callable's declared parameter count (receiver excluded).
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn call(&self, ctx: &mut InternalCallContext) -> Result<(), NativeError> {
        (self.inner)(ctx)
    }
}

impl std::fmt::Debug for InternalCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalCall")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Process-scoped table of bound internal calls, keyed by fully qualified
/// method name.
///
/// Thread-safe for concurrent registration; lookups clone the (Arc-backed)
/// entry. Duplicate binds are rejected and the original entry kept.
#[derive(Default)]
pub struct InternalCallRegistry {
    entries: Mutex<FxHashMap<String, InternalCall>>,
}

impl InternalCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a native callable under an exact qualified name, e.g.
    /// `"Tests.Wrapper::.ctor(single,single)"`.
    ///
    /// The name's parameter list is compared against the callable's
    /// declared arity here, at bind time; the extern declaration itself is
    /// verified later, when the assembly declaring it is loaded.
    pub fn bind(&self, qualified: &str, call: InternalCall) -> Result<(), InternalCallError> {
        let parsed =
            QualifiedName::parse(qualified).ok_or_else(|| InternalCallError::InvalidName {
                name: qualified.to_string(),
            })?;
        if parsed.desc.arity() != call.arity() {
            return Err(InternalCallError::ArityMismatch {
                name: qualified.to_string(),
                bound: call.arity(),
                declared: parsed.desc.arity(),
            });
        }

        let mut entries = self.entries.lock();
        if entries.contains_key(qualified) {
            return Err(InternalCallError::AlreadyBound {
                name: qualified.to_string(),
            });
        }
        debug!("bound internal call `{qualified}` ({} params)", call.arity());
        entries.insert(qualified.to_string(), call);
        Ok(())
    }

    pub fn lookup(&self, qualified: &str) -> Option<InternalCall> {
        self.entries.lock().get(qualified).cloned()
    }

    pub fn is_bound(&self, qualified: &str) -> bool {
        self.entries.lock().contains_key(qualified)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for InternalCallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalCallRegistry")
            .field("count", &self.len())
            .finish()
    }
}

// ============================================================================
// Typed adapters
// ============================================================================

mod marker {
    //! Zero-sized tags keeping the adapter trait impls disjoint.
    pub struct Plain;
    pub struct Fallible;
}

/// Conversion of a typed native function into a static-extern adapter.
///
/// The `Marker` parameter exists only to keep the plain and fallible
/// impl families coherent; it is always inferred.
pub trait IntoStaticCall<Marker> {
    fn into_internal_call(self) -> InternalCall;
}

/// Conversion of a typed native function (explicit receiver first) into an
/// instance-extern adapter.
pub trait IntoMethodCall<Marker> {
    fn into_internal_call(self) -> InternalCall;
}

/// Adapt a typed native function as a static extern implementation.
pub fn internal_call<Marker, F: IntoStaticCall<Marker>>(f: F) -> InternalCall {
    f.into_internal_call()
}

/// Adapt a typed native function as an instance extern implementation.
/// The function's first parameter receives the managed `this` reference.
pub fn internal_method<Marker, F: IntoMethodCall<Marker>>(f: F) -> InternalCall {
    f.into_internal_call()
}

macro_rules! impl_internal_adapters {
    ($count:expr $(, $A:ident $a:ident $idx:tt)*) => {
        impl<F, R $(, $A)*> IntoStaticCall<(marker::Plain, ($($A,)*), R)> for F
        where
            F: Fn($($A),*) -> R + Send + Sync + 'static,
            R: ToManaged,
            $($A: FromManaged + 'static,)*
        {
            fn into_internal_call(self) -> InternalCall {
                InternalCall::new($count, move |ctx| {
                    $(let $a: $A = ctx.arg($idx)?;)*
                    let result = (self)($($a),*);
                    ctx.set_return(result)
                })
            }
        }

        impl<F, R $(, $A)*> IntoStaticCall<(marker::Fallible, ($($A,)*), R)> for F
        where
            F: Fn($($A),*) -> Result<R, String> + Send + Sync + 'static,
            R: ToManaged,
            $($A: FromManaged + 'static,)*
        {
            fn into_internal_call(self) -> InternalCall {
                InternalCall::new($count, move |ctx| {
                    $(let $a: $A = ctx.arg($idx)?;)*
                    match (self)($($a),*) {
                        Ok(value) => ctx.set_return(value),
                        Err(message) => Err(NativeError::Failed { message }),
                    }
                })
            }
        }

        impl<F, R $(, $A)*> IntoMethodCall<(marker::Plain, ($($A,)*), R)> for F
        where
            F: Fn(Object $(, $A)*) -> R + Send + Sync + 'static,
            R: ToManaged,
            $($A: FromManaged + 'static,)*
        {
            fn into_internal_call(self) -> InternalCall {
                InternalCall::new($count, move |ctx| {
                    let this = ctx.instance()?.clone();
                    $(let $a: $A = ctx.arg($idx)?;)*
                    let result = (self)(this $(, $a)*);
                    ctx.set_return(result)
                })
            }
        }

        impl<F, R $(, $A)*> IntoMethodCall<(marker::Fallible, ($($A,)*), R)> for F
        where
            F: Fn(Object $(, $A)*) -> Result<R, String> + Send + Sync + 'static,
            R: ToManaged,
            $($A: FromManaged + 'static,)*
        {
            fn into_internal_call(self) -> InternalCall {
                InternalCall::new($count, move |ctx| {
                    let this = ctx.instance()?.clone();
                    $(let $a: $A = ctx.arg($idx)?;)*
                    match (self)(this $(, $a)*) {
                        Ok(value) => ctx.set_return(value),
                        Err(message) => Err(NativeError::Failed { message }),
                    }
                })
            }
        }
    };
}

impl_internal_adapters!(0);
impl_internal_adapters!(1, A0 a0 0);
impl_internal_adapters!(2, A0 a0 0, A1 a1 1);
impl_internal_adapters!(3, A0 a0 0, A1 a1 1, A2 a2 2);
impl_internal_adapters!(4, A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
impl_internal_adapters!(5, A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4);
impl_internal_adapters!(6, A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5);
impl_internal_adapters!(7, A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6);
impl_internal_adapters!(8, A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6, A7 a7 7);
