//! Resolved method handles and the generic invoke path.

use std::sync::Arc;

use crate::error::{BridgeError, ManagedException};
use crate::runtime::class::{Class, MethodAttributes, MethodDef, MethodImpl};
use crate::runtime::object::Object;
use crate::signature::MethodDesc;
use crate::value::ManagedValue;

/// Resolved handle to a method of a loaded class.
///
/// Identity is (declaring class, name, parameter signature). Resolution
/// happens once at lookup time; the handle is immutable and may be invoked
/// any number of times.
#[derive(Clone)]
pub struct Method {
    class: Class,
    def: Arc<MethodDef>,
}

impl Method {
    pub(crate) fn new(class: Class, def: Arc<MethodDef>) -> Self {
        Self { class, def }
    }

    pub fn name(&self) -> &str {
        &self.def.desc.name
    }

    pub fn desc(&self) -> &MethodDesc {
        &self.def.desc
    }

    /// Full declaration name, `Ns.Class::Name(tok,tok)`. For extern
    /// methods this is also the internal-call registry key.
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.class.full_name(), self.def.desc)
    }

    pub fn is_static(&self) -> bool {
        self.def.attrs.contains(MethodAttributes::STATIC)
    }

    pub fn attributes(&self) -> MethodAttributes {
        self.def.attrs
    }

    pub fn arity(&self) -> usize {
        self.def.desc.arity()
    }

    pub fn declaring_class(&self) -> &Class {
        &self.class
    }

    /// Generic invoke through the host runtime.
    ///
    /// Validates the receiver (staticness and liveness) before dispatch.
    /// An unhandled managed exception comes back as
    /// [`BridgeError::Managed`]; a native failure while servicing an
    /// extern method has already been translated into a managed exception
    /// by the bridge and surfaces the same way.
    pub fn invoke(
        &self,
        instance: Option<&Object>,
        args: &[ManagedValue],
    ) -> Result<ManagedValue, BridgeError> {
        if self.is_static() {
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

        if args.len() != self.arity() {
            return Err(BridgeError::Managed(ManagedException::new(
                "System.Reflection.TargetParameterCountException",
                format!(
                    "{} expects {} arguments, got {}",
                    self.full_name(),
                    self.arity(),
                    args.len()
                ),
            )));
        }

        match &self.def.body {
            MethodImpl::Managed(body) => {
                body(self.class.domain(), instance, args).map_err(BridgeError::Managed)
            }
            MethodImpl::InternalCall => self
                .class
                .domain()
                .dispatch_internal_call(self, instance, args),
        }
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Method({})", self.full_name())
    }
}
