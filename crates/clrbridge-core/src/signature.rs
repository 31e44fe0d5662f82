//! Signature derivation and qualified-name handling.
//!
//! The host runtime resolves methods by a textual description,
//! `Name(tok,tok)`, where each token names a parameter type the way the
//! runtime's reflection lookup understands it (`single`, `int`,
//! `Tests.Vector2f`, ...). This module derives those descriptions from
//! native call signatures at compile time and parses/formats the qualified
//! names (`Ns.Class::Name(tok,tok)`) used as internal-call registry keys.

/// Compile-time name of a native type as the host runtime's reflection
/// lookup understands it.
///
/// `None` means the type converts fine but has no registered managed name;
/// any signature mentioning it is derived as unknown and method resolution
/// falls back to name + arity.
pub trait TypeToken {
    const TOKEN: Option<&'static str>;
}

macro_rules! impl_type_token {
    ($($ty:ty => $tok:literal),* $(,)?) => {
        $(
            impl TypeToken for $ty {
                const TOKEN: Option<&'static str> = Some($tok);
            }
        )*
    };
}

impl_type_token! {
    bool => "bool",
    i8 => "sbyte",
    i16 => "int16",
    i32 => "int",
    i64 => "long",
    u8 => "byte",
    u16 => "uint16",
    u32 => "uint",
    u64 => "ulong",
    f32 => "single",
    f64 => "double",
    String => "string",
    &str => "string",
}

impl TypeToken for () {
    const TOKEN: Option<&'static str> = Some("void");
}

/// Join parameter tokens into an argument-signature string.
///
/// Returns `(signature, all_types_known)`. When any token is `None` the
/// string is unusable and the caller must resolve by arity instead.
pub fn derive_signature(tokens: &[Option<&'static str>]) -> (String, bool) {
    let mut out = String::new();
    let mut known = true;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Some(tok) => {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(tok);
            }
            None => known = false,
        }
    }
    if !known {
        out.clear();
    }
    (out, known)
}

/// A method description: name plus parameter tokens.
///
/// Textual form is `Name(tok,tok)`; a bare `Name` parses as name-only
/// (no parameter list), which resolution treats as arity-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDesc {
    pub name: String,
    pub params: Vec<String>,
}

impl MethodDesc {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Parse `Name(tok,tok)`, `Name()`, or a bare `Name`.
    pub fn parse(desc: &str) -> Self {
        match desc.split_once('(') {
            Some((name, rest)) => {
                let inner = rest.strip_suffix(')').unwrap_or(rest);
                let params = inner
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                Self::new(name.trim(), params)
            }
            None => Self::new(desc.trim(), Vec::new()),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl std::fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(","))
    }
}

/// A fully qualified method name: declaring class path plus description.
///
/// Textual form is `Ns.Class::Name(tok,tok)` - the key format of the
/// internal-call registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub class_path: String,
    pub desc: MethodDesc,
}

impl QualifiedName {
    pub fn new(class_path: impl Into<String>, desc: MethodDesc) -> Self {
        Self {
            class_path: class_path.into(),
            desc,
        }
    }

    /// Parse `Ns.Class::Name(tok,tok)`. Returns `None` if the `::`
    /// separator is missing.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (class_path, desc) = qualified.split_once("::")?;
        Some(Self::new(class_path.trim(), MethodDesc::parse(desc)))
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.class_path, self.desc)
    }
}
