//! Typed method thunks.
//!
//! A [`MethodInvoker`] binds one resolved method handle to a native call
//! signature. Calls marshal the argument tuple, invoke through the host
//! runtime, and unmarshal the result; an unhandled managed exception comes
//! back as a structured [`BridgeError::Managed`] failure.

use std::marker::PhantomData;

use log::trace;

use crate::convert::FromManaged;
use crate::error::BridgeError;
use crate::marshal::ArgPack;
use crate::runtime::class::Class;
use crate::runtime::method::Method;
use crate::runtime::object::Object;

/// A statically-typed callable bound to one resolved managed method.
///
/// Immutable and reusable: one invoker may be called any number of times;
/// nothing is cached between calls. Calls must happen on a thread attached
/// to the host runtime - the invoker does not attach threads.
pub struct MethodInvoker<Args, Ret> {
    method: Method,
    _marker: PhantomData<fn(Args) -> Ret>,
}

impl<Args, Ret> MethodInvoker<Args, Ret>
where
    Args: ArgPack,
    Ret: FromManaged,
{
    /// Bind an already-resolved method handle.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            _marker: PhantomData,
        }
    }

    /// The bound method handle.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Invoke the method.
    ///
    /// `instance` is `None` for static methods. The receiver is validated
    /// (presence and liveness) before any argument is packed, so an
    /// `InvalidInstance` failure performs no invoke and no conversion side
    /// effects.
    pub fn call(&self, instance: Option<&Object>, args: Args) -> Result<Ret, BridgeError> {
        if self.method.is_static() {
            if instance.is_some() {
                return Err(BridgeError::InvalidInstance {
                    reason: "static method invoked with an instance",
                });
            }
        } else {
            let receiver = instance.ok_or(BridgeError::InvalidInstance {
                reason: "instance method invoked without an instance",
            })?;
            if !receiver.valid() {
                return Err(BridgeError::InvalidInstance {
                    reason: "object reference is not live",
                });
            }
        }

        let domain = self.method.declaring_class().domain().clone();
        let packed = args.pack(&domain)?;
        let result = self.method.invoke(instance, &packed)?;
        Ret::from_managed(&result, &domain).map_err(BridgeError::from)
    }
}

impl<Args, Ret> Clone for MethodInvoker<Args, Ret> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Args, Ret> std::fmt::Debug for MethodInvoker<Args, Ret> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodInvoker({})", self.method.full_name())
    }
}

/// Resolve a method by name and bind it to the native signature
/// `fn(Args) -> Ret`.
///
/// The argument-type signature is derived from `Args`. When every argument
/// type has a registered managed name the method is resolved by exact
/// description; otherwise resolution falls back to name + parameter count.
/// The fallback cannot distinguish overloads sharing an arity - callers
/// with such overloads must disambiguate by resolving the method handle
/// themselves via [`Class::method_by_desc`].
pub fn make_method_invoker<Args, Ret>(
    class: &Class,
    name: &str,
) -> Result<MethodInvoker<Args, Ret>, BridgeError>
where
    Args: ArgPack,
    Ret: FromManaged,
{
    let (signature, all_types_known) = Args::signature();
    let method = if all_types_known {
        class.method_by_desc(&format!("{name}({signature})"))?
    } else {
        trace!(
            "signature for `{}::{name}` not fully derivable, resolving by arity {}",
            class.full_name(),
            Args::ARITY
        );
        class.method_by_arity(name, Args::ARITY)?
    };
    Ok(MethodInvoker::new(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManagedException;
    use crate::internal_call::InternalCallRegistry;
    use crate::runtime::domain::Domain;
    use crate::runtime::{AssemblyBuilder, ClassBuilder, MethodAttributes};
    use crate::value::ManagedValue;
    use std::sync::Arc;

    fn calc_domain() -> Domain {
        let domain = Domain::new("invoker-tests", Arc::new(InternalCallRegistry::new()));
        let class = ClassBuilder::new("Tests", "Calc")
            .field("acc", ManagedValue::Int(0))
            .method("AddTo(int)", MethodAttributes::empty(), |_, obj, args| {
                let obj = obj.expect("instance method");
                let current = obj.field_raw("acc")?.as_int().unwrap_or(0);
                let addend = args[0].as_int().unwrap_or(0);
                obj.set_field_raw("acc", ManagedValue::Int(current + addend))?;
                Ok(ManagedValue::Int(current + addend))
            })
            .method("Magic()", MethodAttributes::STATIC, |_, _, _| {
                Ok(ManagedValue::Int(99))
            })
            .method("Fail()", MethodAttributes::empty(), |_, _, _| {
                Err(ManagedException::new("System.Exception", "managed boom"))
            })
            .build();
        domain
            .load(AssemblyBuilder::new("calc").class(class).build())
            .unwrap();
        domain
    }

    fn calc_class(domain: &Domain) -> crate::runtime::Class {
        domain.class_by_full_name("Tests.Calc").unwrap()
    }

    #[test]
    fn instance_call_marshals_and_returns() {
        let domain = calc_domain();
        let class = calc_class(&domain);
        let obj = class.new_instance().unwrap();

        let add = make_method_invoker::<(i32,), i32>(&class, "AddTo").unwrap();
        assert_eq!(add.call(Some(&obj), (5,)).unwrap(), 5);
        // Reusable; state advanced by the managed body.
        assert_eq!(add.call(Some(&obj), (7,)).unwrap(), 12);
    }

    #[test]
    fn static_call_takes_no_instance() {
        let domain = calc_domain();
        let class = calc_class(&domain);

        let magic = make_method_invoker::<(), i32>(&class, "Magic").unwrap();
        assert_eq!(magic.call(None, ()).unwrap(), 99);

        let obj = class.new_instance().unwrap();
        let err = magic.call(Some(&obj), ()).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInstance { .. }));
    }

    #[test]
    fn missing_instance_fails_before_invoke() {
        let domain = calc_domain();
        let class = calc_class(&domain);

        let add = make_method_invoker::<(i32,), i32>(&class, "AddTo").unwrap();
        let err = add.call(None, (1,)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInstance { .. }));
    }

    #[test]
    fn dead_instance_fails_before_invoke() {
        let domain = calc_domain();
        let class = calc_class(&domain);
        let obj = class.new_instance().unwrap();
        domain.free_object(&obj);

        let add = make_method_invoker::<(i32,), i32>(&class, "AddTo").unwrap();
        let err = add.call(Some(&obj), (1,)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidInstance {
                reason: "object reference is not live"
            }
        ));
    }

    #[test]
    fn managed_exception_is_translated() {
        let domain = calc_domain();
        let class = calc_class(&domain);
        let obj = class.new_instance().unwrap();

        let fail = make_method_invoker::<(), ()>(&class, "Fail").unwrap();
        let err = fail.call(Some(&obj), ()).unwrap_err();
        match err {
            BridgeError::Managed(exc) => {
                assert_eq!(exc.type_name, "System.Exception");
                assert_eq!(exc.message, "managed boom");
            }
            other => panic!("expected managed exception, got {other:?}"),
        }
    }

    #[test]
    fn unknown_method_is_lookup_failure() {
        let domain = calc_domain();
        let class = calc_class(&domain);
        let err = make_method_invoker::<(), ()>(&class, "Nope").unwrap_err();
        assert!(matches!(err, BridgeError::MethodNotFound { .. }));
    }
}
