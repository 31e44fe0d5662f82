//! Class metadata: definitions, the builder used to declare them, and the
//! resolved handles the reflection surface hands out.
//!
//! A [`ClassDef`] is pure metadata plus opaque method bodies. Managed
//! bodies are closures supplied by the embedder; extern methods have no
//! body here - their implementation is bound in the internal-call registry
//! and resolved at dispatch time.

use std::sync::Arc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::error::{BridgeError, ManagedException};
use crate::runtime::domain::Domain;
use crate::runtime::method::Method;
use crate::runtime::object::Object;
use crate::signature::MethodDesc;
use crate::value::ManagedValue;

bitflags! {
    /// CLR-style member attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAttributes: u8 {
        const STATIC = 1;
        const VIRTUAL = 1 << 1;
        /// Compiler-named accessor (property getters/setters, ctors)
        const SPECIAL_NAME = 1 << 2;
    }
}

/// A managed method body: an opaque closure standing in for managed code.
pub type MethodBodyFn = Arc<
    dyn Fn(&Domain, Option<&Object>, &[ManagedValue]) -> Result<ManagedValue, ManagedException>
        + Send
        + Sync,
>;

pub(crate) enum MethodImpl {
    /// Body supplied at class-definition time
    Managed(MethodBodyFn),
    /// Extern declaration; implementation comes from the internal-call registry
    InternalCall,
}

pub(crate) struct MethodDef {
    pub(crate) desc: MethodDesc,
    pub(crate) attrs: MethodAttributes,
    pub(crate) body: MethodImpl,
}

pub(crate) struct FieldDef {
    pub(crate) name: String,
    pub(crate) is_static: bool,
    pub(crate) default: ManagedValue,
}

pub(crate) struct PropertyDef {
    pub(crate) name: String,
    pub(crate) is_static: bool,
    pub(crate) getter: Option<Arc<MethodDef>>,
    pub(crate) setter: Option<Arc<MethodDef>>,
}

/// Identifier of a class within its domain's class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ClassId(pub(crate) u32);

/// Declared metadata of a managed class.
pub struct ClassDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) valuetype: bool,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) fields: Vec<Arc<FieldDef>>,
    pub(crate) properties: Vec<Arc<PropertyDef>>,
}

impl ClassDef {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Builder for declaring a managed class.
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            def: ClassDef {
                namespace: namespace.into(),
                name: name.into(),
                valuetype: false,
                methods: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
            },
        }
    }

    pub fn valuetype(mut self) -> Self {
        self.def.valuetype = true;
        self
    }

    pub fn field(mut self, name: impl Into<String>, default: ManagedValue) -> Self {
        self.def.fields.push(Arc::new(FieldDef {
            name: name.into(),
            is_static: false,
            default,
        }));
        self
    }

    pub fn static_field(mut self, name: impl Into<String>, default: ManagedValue) -> Self {
        self.def.fields.push(Arc::new(FieldDef {
            name: name.into(),
            is_static: true,
            default,
        }));
        self
    }

    /// Declare a method with a managed body. `desc` is the textual method
    /// description, e.g. `"Scale(single)"`.
    pub fn method<F>(mut self, desc: &str, attrs: MethodAttributes, body: F) -> Self
    where
        F: Fn(&Domain, Option<&Object>, &[ManagedValue]) -> Result<ManagedValue, ManagedException>
            + Send
            + Sync
            + 'static,
    {
        self.def.methods.push(Arc::new(MethodDef {
            desc: MethodDesc::parse(desc),
            attrs,
            body: MethodImpl::Managed(Arc::new(body)),
        }));
        self
    }

    /// Declare an extern method whose implementation is an internal call.
    /// The binding under `Ns.Class::desc` must exist before the assembly
    /// containing this class is loaded.
    pub fn extern_method(mut self, desc: &str, attrs: MethodAttributes) -> Self {
        self.def.methods.push(Arc::new(MethodDef {
            desc: MethodDesc::parse(desc),
            attrs,
            body: MethodImpl::InternalCall,
        }));
        self
    }

    /// Declare a constructor with a managed body. `params` is the comma
    /// separated parameter token list, e.g. `"single,single"`.
    pub fn ctor<F>(self, params: &str, body: F) -> Self
    where
        F: Fn(&Domain, Option<&Object>, &[ManagedValue]) -> Result<ManagedValue, ManagedException>
            + Send
            + Sync
            + 'static,
    {
        let desc = format!(".ctor({params})");
        self.method(&desc, MethodAttributes::SPECIAL_NAME, body)
    }

    /// Declare an extern constructor (implementation bound as an internal
    /// call, the usual shape for wrapper classes).
    pub fn extern_ctor(self, params: &str) -> Self {
        let desc = format!(".ctor({params})");
        self.extern_method(&desc, MethodAttributes::SPECIAL_NAME)
    }

    /// Declare an instance property. `token` names the property type in
    /// the host runtime's vocabulary; the accessors are stored as
    /// zero/one-argument special-name methods.
    pub fn property<G>(
        self,
        name: &str,
        token: &str,
        getter: G,
        setter: Option<MethodBodyFn>,
    ) -> Self
    where
        G: Fn(&Domain, Option<&Object>, &[ManagedValue]) -> Result<ManagedValue, ManagedException>
            + Send
            + Sync
            + 'static,
    {
        self.property_inner(name, token, MethodAttributes::SPECIAL_NAME, Arc::new(getter), setter)
    }

    /// Declare a static property.
    pub fn static_property<G>(
        self,
        name: &str,
        token: &str,
        getter: G,
        setter: Option<MethodBodyFn>,
    ) -> Self
    where
        G: Fn(&Domain, Option<&Object>, &[ManagedValue]) -> Result<ManagedValue, ManagedException>
            + Send
            + Sync
            + 'static,
    {
        self.property_inner(
            name,
            token,
            MethodAttributes::SPECIAL_NAME | MethodAttributes::STATIC,
            Arc::new(getter),
            setter,
        )
    }

    fn property_inner(
        mut self,
        name: &str,
        token: &str,
        attrs: MethodAttributes,
        getter: MethodBodyFn,
        setter: Option<MethodBodyFn>,
    ) -> Self {
        let is_static = attrs.contains(MethodAttributes::STATIC);
        let getter = Arc::new(MethodDef {
            desc: MethodDesc::new(format!("get_{name}"), Vec::new()),
            attrs,
            body: MethodImpl::Managed(getter),
        });
        let setter = setter.map(|body| {
            Arc::new(MethodDef {
                desc: MethodDesc::new(format!("set_{name}"), vec![token.to_string()]),
                attrs,
                body: MethodImpl::Managed(body),
            })
        });
        self.def.properties.push(Arc::new(PropertyDef {
            name: name.to_string(),
            is_static,
            getter: Some(getter),
            setter,
        }));
        self
    }

    pub fn build(self) -> ClassDef {
        self.def
    }
}

/// Resolved handle to a class in a loaded assembly.
///
/// Resolution happens once; the handle is cheap to clone and reused across
/// invocations. It is only meaningful against the domain it was resolved
/// from.
#[derive(Clone)]
pub struct Class {
    pub(crate) domain: Domain,
    pub(crate) id: ClassId,
    pub(crate) def: Arc<ClassDef>,
}

impl Class {
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn namespace(&self) -> &str {
        &self.def.namespace
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn full_name(&self) -> String {
        self.def.full_name()
    }

    pub fn is_valuetype(&self) -> bool {
        self.def.valuetype
    }

    /// Resolve a method by exact description, e.g. `"Scale(single)"`.
    pub fn method_by_desc(&self, desc: &str) -> Result<Method, BridgeError> {
        let wanted = MethodDesc::parse(desc);
        self.all_method_defs()
            .find(|def| def.desc == wanted)
            .map(|def| Method::new(self.clone(), def))
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: self.full_name(),
                desc: wanted.to_string(),
            })
    }

    /// Resolve a method by name and parameter count.
    ///
    /// This is the fallback used when a signature cannot be derived. If
    /// overloads share an arity the first declared match wins; callers
    /// with such overloads must resolve by description instead.
    pub fn method_by_arity(&self, name: &str, argc: usize) -> Result<Method, BridgeError> {
        self.all_method_defs()
            .find(|def| def.desc.name == name && def.desc.arity() == argc)
            .map(|def| Method::new(self.clone(), def))
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: self.full_name(),
                desc: format!("{name}/{argc}"),
            })
    }

    pub fn field(&self, name: &str) -> Result<Field, BridgeError> {
        self.def
            .fields
            .iter()
            .find(|def| def.name == name)
            .map(|def| Field {
                class: self.clone(),
                def: Arc::clone(def),
            })
            .ok_or_else(|| BridgeError::FieldNotFound {
                class: self.full_name(),
                name: name.to_string(),
            })
    }

    pub fn property(&self, name: &str) -> Result<Property, BridgeError> {
        self.def
            .properties
            .iter()
            .find(|def| def.name == name)
            .map(|def| Property {
                class: self.clone(),
                def: Arc::clone(def),
            })
            .ok_or_else(|| BridgeError::PropertyNotFound {
                class: self.full_name(),
                name: name.to_string(),
            })
    }

    /// Enumerate declared methods (accessor methods of properties included,
    /// as the runtime's reflection surface reports them).
    pub fn methods(&self) -> Vec<Method> {
        self.all_method_defs()
            .map(|def| Method::new(self.clone(), def))
            .collect()
    }

    pub fn fields(&self) -> Vec<Field> {
        self.def
            .fields
            .iter()
            .map(|def| Field {
                class: self.clone(),
                def: Arc::clone(def),
            })
            .collect()
    }

    pub fn properties(&self) -> Vec<Property> {
        self.def
            .properties
            .iter()
            .map(|def| Property {
                class: self.clone(),
                def: Arc::clone(def),
            })
            .collect()
    }

    /// Allocate an instance and run its zero-argument constructor if one
    /// is declared.
    pub fn new_instance(&self) -> Result<Object, BridgeError> {
        let instance = self.new_uninitialized();
        if let Ok(ctor) = self.method_by_arity(".ctor", 0) {
            ctor.invoke(Some(&instance), &[])?;
        }
        Ok(instance)
    }

    /// Allocate an instance and run the constructor matching the argument
    /// count (how the runtime services `new T(args)` from managed code).
    pub fn new_instance_with(&self, args: &[ManagedValue]) -> Result<Object, BridgeError> {
        if args.is_empty() {
            return self.new_instance();
        }
        let ctor = self.method_by_arity(".ctor", args.len())?;
        let instance = self.new_uninitialized();
        ctor.invoke(Some(&instance), args)?;
        Ok(instance)
    }

    /// Allocate an instance without running any constructor. Instance
    /// fields start at their declared defaults.
    pub fn new_uninitialized(&self) -> Object {
        let mut fields = FxHashMap::default();
        for field in &self.def.fields {
            if !field.is_static {
                fields.insert(field.name.clone(), field.default.clone());
            }
        }
        self.domain.alloc_object(self.id, fields)
    }

    /// Read a boxed static field value.
    pub fn static_field_raw(&self, name: &str) -> Result<ManagedValue, BridgeError> {
        self.domain.static_field(self, name)
    }

    /// Store a boxed static field value.
    pub fn set_static_field_raw(
        &self,
        name: &str,
        value: ManagedValue,
    ) -> Result<(), BridgeError> {
        self.domain.set_static_field(self, name, value)
    }

    fn all_method_defs(&self) -> impl Iterator<Item = Arc<MethodDef>> + '_ {
        self.def.methods.iter().cloned().chain(
            self.def
                .properties
                .iter()
                .flat_map(|prop| prop.getter.iter().chain(prop.setter.iter()).cloned()),
        )
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("full_name", &self.full_name())
            .field("valuetype", &self.is_valuetype())
            .finish()
    }
}

/// Resolved handle to a declared field.
#[derive(Clone)]
pub struct Field {
    pub(crate) class: Class,
    pub(crate) def: Arc<FieldDef>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    pub fn declaring_class(&self) -> &Class {
        &self.class
    }

    pub fn full_declname(&self) -> String {
        format!("{}::{}", self.class.full_name(), self.def.name)
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field({})", self.full_declname())
    }
}

/// Resolved handle to a declared property.
#[derive(Clone)]
pub struct Property {
    pub(crate) class: Class,
    pub(crate) def: Arc<PropertyDef>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    pub fn declaring_class(&self) -> &Class {
        &self.class
    }

    pub fn full_declname(&self) -> String {
        format!("{}::{}", self.class.full_name(), self.def.name)
    }

    /// The property's getter, resolved as a zero-argument method.
    pub fn getter(&self) -> Option<Method> {
        self.def
            .getter
            .as_ref()
            .map(|def| Method::new(self.class.clone(), Arc::clone(def)))
    }

    /// The property's setter, resolved as a one-argument method.
    pub fn setter(&self) -> Option<Method> {
        self.def
            .setter
            .as_ref()
            .map(|def| Method::new(self.class.clone(), Arc::clone(def)))
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Property({})", self.full_declname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_def_full_name() {
        let def = ClassBuilder::new("Tests", "Vector2f").valuetype().build();
        assert_eq!(def.full_name(), "Tests.Vector2f");
        assert!(def.valuetype);

        let global = ClassBuilder::new("", "Loose").build();
        assert_eq!(global.full_name(), "Loose");
    }

    #[test]
    fn builder_collects_members() {
        let def = ClassBuilder::new("Tests", "Thing")
            .field("value", ManagedValue::Int(1))
            .static_field("counter", ManagedValue::Int(0))
            .method("Touch()", MethodAttributes::empty(), |_, _, _| {
                Ok(ManagedValue::Void)
            })
            .extern_method("Native(int)", MethodAttributes::empty())
            .property("Value", "int", |_, _, _| Ok(ManagedValue::Int(1)), None)
            .build();

        assert_eq!(def.fields.len(), 2);
        assert_eq!(def.methods.len(), 2);
        assert_eq!(def.properties.len(), 1);
        assert!(def.fields[1].is_static);
        assert!(matches!(def.methods[1].body, MethodImpl::InternalCall));
    }

    #[test]
    fn ctor_desc_is_special_name() {
        let def = ClassBuilder::new("Tests", "Thing")
            .ctor("single,single", |_, _, _| Ok(ManagedValue::Void))
            .build();
        assert_eq!(def.methods[0].desc.name, ".ctor");
        assert_eq!(def.methods[0].desc.arity(), 2);
        assert!(def.methods[0].attrs.contains(MethodAttributes::SPECIAL_NAME));
    }

    #[test]
    fn property_accessors_are_methods() {
        let def = ClassBuilder::new("Tests", "Thing")
            .property(
                "Score",
                "int",
                |_, _, _| Ok(ManagedValue::Int(3)),
                Some(Arc::new(|_, _, _| Ok(ManagedValue::Void))),
            )
            .build();
        let prop = &def.properties[0];
        let getter = prop.getter.as_ref().unwrap();
        let setter = prop.setter.as_ref().unwrap();
        assert_eq!(getter.desc.to_string(), "get_Score()");
        assert_eq!(setter.desc.to_string(), "set_Score(int)");
        assert_eq!(setter.desc.arity(), 1);
    }
}
