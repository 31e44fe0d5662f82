//! Conversion traits between native types and the boxed managed
//! representation.
//!
//! "Registering" a converter means implementing these traits, so an
//! unregistered type fails to compile on the typed call paths - there is
//! no runtime registry to miss. The name-based paths (wrapper class lookup
//! by token, internal-call dispatch) fail at lookup time with descriptive
//! errors instead.
//!
//! Primitives and strings are implemented here. User PODs and wrapper
//! types are registered with [`register_pod_converter!`] and
//! [`register_wrapper_converter!`].
//!
//! Every converter pair must be inverse up to value equality:
//! `from_managed(to_managed(x)) == x` for all representable `x`.
//!
//! [`register_pod_converter!`]: crate::register_pod_converter
//! [`register_wrapper_converter!`]: crate::register_wrapper_converter

use crate::error::ConversionError;
use crate::runtime::domain::Domain;
use crate::runtime::object::Object;
use crate::signature::TypeToken;
use crate::value::ManagedValue;

/// Convert a native value into the boxed managed representation.
///
/// The domain is available because some conversions allocate (wrapper
/// proxies, interned strings); primitive conversions ignore it.
pub trait ToManaged: TypeToken {
    fn to_managed(self, domain: &Domain) -> Result<ManagedValue, ConversionError>;
}

/// Convert a boxed managed value back into a native value.
pub trait FromManaged: Sized {
    fn from_managed(value: &ManagedValue, domain: &Domain) -> Result<Self, ConversionError>;
}

// ============================================================================
// Primitive implementations
// ============================================================================

impl ToManaged for () {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Void)
    }
}

impl FromManaged for () {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Void => Ok(()),
            other => Err(ConversionError::TypeMismatch {
                expected: "void",
                actual: other.type_name(),
            }),
        }
    }
}

impl ToManaged for bool {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Bool(self))
    }
}

impl FromManaged for bool {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Bool(v) => Ok(*v),
            other => Err(ConversionError::TypeMismatch {
                expected: "bool",
                actual: other.type_name(),
            }),
        }
    }
}

macro_rules! impl_int_converters {
    ($($ty:ty => $tok:literal),* $(,)?) => {
        $(
            impl ToManaged for $ty {
                fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
                    Ok(ManagedValue::Int(self as i64))
                }
            }

            impl FromManaged for $ty {
                fn from_managed(
                    value: &ManagedValue,
                    _domain: &Domain,
                ) -> Result<Self, ConversionError> {
                    match value {
                        ManagedValue::Int(v) => {
                            <$ty>::try_from(*v).map_err(|_| ConversionError::IntegerOverflow {
                                value: *v,
                                target_type: $tok,
                            })
                        }
                        other => Err(ConversionError::TypeMismatch {
                            expected: $tok,
                            actual: other.type_name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_int_converters! {
    i8 => "sbyte",
    i16 => "int16",
    i32 => "int",
    i64 => "long",
    u8 => "byte",
    u16 => "uint16",
    u32 => "uint",
}

// u64 is bit-reinterpreted through i64 so the full range round-trips.
impl ToManaged for u64 {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Int(self as i64))
    }
}

impl FromManaged for u64 {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Int(v) => Ok(*v as u64),
            other => Err(ConversionError::TypeMismatch {
                expected: "ulong",
                actual: other.type_name(),
            }),
        }
    }
}

impl ToManaged for f32 {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Float(self as f64))
    }
}

impl FromManaged for f32 {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Float(v) => Ok(*v as f32),
            other => Err(ConversionError::TypeMismatch {
                expected: "single",
                actual: other.type_name(),
            }),
        }
    }
}

impl ToManaged for f64 {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Float(self))
    }
}

impl FromManaged for f64 {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Float(v) => Ok(*v),
            other => Err(ConversionError::TypeMismatch {
                expected: "double",
                actual: other.type_name(),
            }),
        }
    }
}

// The dedicated string converter: native text buffers become managed
// strings (allocated managed-side; this model owns them in the value).
impl ToManaged for String {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Str(self))
    }
}

impl FromManaged for String {
    fn from_managed(value: &ManagedValue, _domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Str(s) => Ok(s.clone()),
            other => Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }
}

impl ToManaged for &str {
    fn to_managed(self, _domain: &Domain) -> Result<ManagedValue, ConversionError> {
        Ok(ManagedValue::Str(self.to_string()))
    }
}

// ============================================================================
// Managed object references as arguments/results
// ============================================================================

// No registered token: signatures mentioning a bare object reference are
// resolved by arity.
impl TypeToken for Object {
    const TOKEN: Option<&'static str> = None;
}

impl ToManaged for Object {
    fn to_managed(self, domain: &Domain) -> Result<ManagedValue, ConversionError> {
        if self.domain() != domain {
            return Err(ConversionError::Failed {
                message: "object belongs to a different domain".to_string(),
            });
        }
        Ok(ManagedValue::Object(self.handle()))
    }
}

impl FromManaged for Object {
    fn from_managed(value: &ManagedValue, domain: &Domain) -> Result<Self, ConversionError> {
        match value {
            ManagedValue::Object(handle) => Ok(Object::from_handle(domain.clone(), *handle)),
            ManagedValue::Null => Err(ConversionError::NullValue {
                target_type: "object",
            }),
            other => Err(ConversionError::TypeMismatch {
                expected: "object",
                actual: other.type_name(),
            }),
        }
    }
}

// ============================================================================
// Registration macros
// ============================================================================

/// Register a POD converter for a native value type.
///
/// Forms:
///
/// - `register_pod_converter!(T, token = "Ns.Name")` - `T` is structurally
///   identical to its managed counterpart and crosses as a by-value copy.
/// - `register_pod_converter!(T => M, token = "Ns.Name")` - the layouts
///   differ; values are converted through the `From<T> for M` and
///   `From<M> for T` impls you supply.
/// - Either form without `token = ...` registers the type with no managed
///   name, so signatures mentioning it are resolved by arity.
///
/// Requires `T: Clone + Send + Sync + 'static` (and the same of `M`).
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Copy, PartialEq)]
/// struct Vec2f { x: f32, y: f32 }
///
/// register_pod_converter!(Vec2f, token = "Tests.Vector2f");
/// ```
#[macro_export]
macro_rules! register_pod_converter {
    ($native:ty, token = $tok:literal) => {
        impl $crate::TypeToken for $native {
            const TOKEN: ::core::option::Option<&'static str> =
                ::core::option::Option::Some($tok);
        }
        $crate::__pod_identity_impls!($native);
    };
    ($native:ty) => {
        impl $crate::TypeToken for $native {
            const TOKEN: ::core::option::Option<&'static str> = ::core::option::Option::None;
        }
        $crate::__pod_identity_impls!($native);
    };
    ($native:ty => $managed:ty, token = $tok:literal) => {
        impl $crate::TypeToken for $native {
            const TOKEN: ::core::option::Option<&'static str> =
                ::core::option::Option::Some($tok);
        }
        $crate::__pod_mapped_impls!($native => $managed);
    };
    ($native:ty => $managed:ty) => {
        impl $crate::TypeToken for $native {
            const TOKEN: ::core::option::Option<&'static str> = ::core::option::Option::None;
        }
        $crate::__pod_mapped_impls!($native => $managed);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __pod_identity_impls {
    ($native:ty) => {
        impl $crate::ToManaged for $native {
            fn to_managed(
                self,
                _domain: &$crate::Domain,
            ) -> ::core::result::Result<$crate::ManagedValue, $crate::ConversionError> {
                ::core::result::Result::Ok($crate::ManagedValue::boxed(self))
            }
        }

        impl $crate::FromManaged for $native {
            fn from_managed(
                value: &$crate::ManagedValue,
                _domain: &$crate::Domain,
            ) -> ::core::result::Result<Self, $crate::ConversionError> {
                match value {
                    $crate::ManagedValue::Boxed(boxed) => boxed
                        .downcast_ref::<$native>()
                        .cloned()
                        .ok_or($crate::ConversionError::TypeMismatch {
                            expected: ::core::stringify!($native),
                            actual: "boxed",
                        }),
                    other => {
                        ::core::result::Result::Err($crate::ConversionError::TypeMismatch {
                            expected: ::core::stringify!($native),
                            actual: other.type_name(),
                        })
                    }
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __pod_mapped_impls {
    ($native:ty => $managed:ty) => {
        impl $crate::ToManaged for $native {
            fn to_managed(
                self,
                _domain: &$crate::Domain,
            ) -> ::core::result::Result<$crate::ManagedValue, $crate::ConversionError> {
                let managed: $managed = ::core::convert::From::from(self);
                ::core::result::Result::Ok($crate::ManagedValue::boxed(managed))
            }
        }

        impl $crate::FromManaged for $native {
            fn from_managed(
                value: &$crate::ManagedValue,
                _domain: &$crate::Domain,
            ) -> ::core::result::Result<Self, $crate::ConversionError> {
                match value {
                    $crate::ManagedValue::Boxed(boxed) => boxed
                        .downcast_ref::<$managed>()
                        .cloned()
                        .map(|managed| <$native as ::core::convert::From<$managed>>::from(managed))
                        .ok_or($crate::ConversionError::TypeMismatch {
                            expected: ::core::stringify!($managed),
                            actual: "boxed",
                        }),
                    other => {
                        ::core::result::Result::Err($crate::ConversionError::TypeMismatch {
                            expected: ::core::stringify!($managed),
                            actual: other.type_name(),
                        })
                    }
                }
            }
        }
    };
}

/// Register a wrapper converter for a reference-counted native type.
///
/// The managed counterpart is a proxy class (named by `class = ...`) that
/// stores one strong reference to the native object in an opaque handle
/// field. Native→managed allocates a proxy instance in the domain;
/// managed→native reads the stored reference back out, incrementing the
/// shared owner count.
///
/// The proxy class must be loaded in the domain the conversion runs
/// against; converting before it is loaded fails with a descriptive
/// [`ConversionError::UnregisteredClass`].
///
/// # Example
///
/// ```ignore
/// struct Texture { /* native resource */ }
///
/// register_wrapper_converter!(Texture, class = "Engine.Texture");
///
/// // Arc<Texture> now crosses the boundary in both directions.
/// ```
///
/// [`ConversionError::UnregisteredClass`]: crate::ConversionError::UnregisteredClass
#[macro_export]
macro_rules! register_wrapper_converter {
    ($native:ty, class = $tok:literal) => {
        impl $crate::TypeToken for ::std::sync::Arc<$native> {
            const TOKEN: ::core::option::Option<&'static str> =
                ::core::option::Option::Some($tok);
        }

        impl $crate::ToManaged for ::std::sync::Arc<$native> {
            fn to_managed(
                self,
                domain: &$crate::Domain,
            ) -> ::core::result::Result<$crate::ManagedValue, $crate::ConversionError> {
                let class = domain.class_by_full_name($tok).ok_or_else(|| {
                    $crate::ConversionError::UnregisteredClass {
                        token: $tok.to_string(),
                    }
                })?;
                let instance = class.new_uninitialized();
                $crate::ObjectWrapper::create(&instance, self).map_err(|err| {
                    $crate::ConversionError::Failed {
                        message: err.to_string(),
                    }
                })?;
                ::core::result::Result::Ok($crate::ManagedValue::Object(instance.handle()))
            }
        }

        impl $crate::FromManaged for ::std::sync::Arc<$native> {
            fn from_managed(
                value: &$crate::ManagedValue,
                domain: &$crate::Domain,
            ) -> ::core::result::Result<Self, $crate::ConversionError> {
                match value {
                    $crate::ManagedValue::Object(handle) => {
                        let instance = $crate::Object::from_handle(domain.clone(), *handle);
                        $crate::ObjectWrapper::extract(&instance)
                    }
                    $crate::ManagedValue::Null => {
                        ::core::result::Result::Err($crate::ConversionError::NullValue {
                            target_type: $tok,
                        })
                    }
                    other => {
                        ::core::result::Result::Err($crate::ConversionError::TypeMismatch {
                            expected: $tok,
                            actual: other.type_name(),
                        })
                    }
                }
            }
        }
    };
}
