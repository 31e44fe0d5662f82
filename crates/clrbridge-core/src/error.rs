//! Unified error types for the bridge.
//!
//! The hierarchy is layered the same way the call paths are:
//!
//! ```text
//! BridgeError (top-level, what native callers see)
//! ├── Conversion(ConversionError)   - value conversion failures
//! ├── *NotFound                     - reflection lookup failures
//! ├── InvalidInstance               - dead or mismatched object reference
//! ├── Managed(ManagedException)     - translated managed exception
//! └── InternalCall(InternalCallError) - bind/verify failures
//! ```
//!
//! `NativeError` is the adapter-side error for internal calls: it never
//! reaches native callers directly, it is translated into a
//! [`ManagedException`] before re-entering the managed world.

use thiserror::Error;

/// Errors that can occur when converting between native and managed values.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// Value carried a different managed representation than expected
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Null reference converted to a non-nullable native type
    #[error("null reference cannot be converted to {target_type}")]
    NullValue { target_type: &'static str },

    /// Integer narrowing failed
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: &'static str },

    /// A name-based lookup found no class registered under the token
    #[error("no managed class registered under token `{token}`")]
    UnregisteredClass { token: String },

    /// Wrapper extraction before the handle field was ever stored
    #[error("wrapper instance of `{class}` holds no native handle")]
    NotInitialized { class: &'static str },

    /// Generic conversion failure
    #[error("conversion failed: {message}")]
    Failed { message: String },
}

/// Errors raised while a native function services a managed call.
///
/// These stay on the native side of the internal-call bridge; dispatch
/// translates them into a [`ManagedException`] so the managed caller can
/// handle the failure like any other exception.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Argument or return value conversion failed
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Instance extern invoked without a receiver
    #[error("instance internal call invoked without a receiver")]
    MissingInstance,

    /// Argument index out of bounds
    #[error("argument index {index} out of bounds (call has {count} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// Native function reported failure
    #[error("native function failed: {message}")]
    Failed { message: String },

    /// Native function panicked while servicing the call
    #[error("native function panicked: {message}")]
    Panic { message: String },
}

impl NativeError {
    /// Translate into the exception the managed caller observes.
    ///
    /// Type names follow the host runtime's conventions so managed-side
    /// handlers can discriminate on them.
    pub fn into_managed_exception(self) -> ManagedException {
        let type_name = match &self {
            NativeError::Conversion(_) => "System.ArgumentException",
            NativeError::MissingInstance => "System.NullReferenceException",
            NativeError::ArgumentIndexOutOfBounds { .. } => "System.ArgumentException",
            NativeError::Failed { .. } => "System.Exception",
            NativeError::Panic { .. } => "System.ExecutionEngineException",
        };
        ManagedException::new(type_name, self.to_string())
    }
}

/// Errors in the internal-call binding lifecycle.
#[derive(Debug, Clone, Error)]
pub enum InternalCallError {
    /// Binding name is not of the form `Ns.Class::Name(tok,tok)`
    #[error("malformed internal call name `{name}` (expected `Ns.Class::Name(params)`)")]
    InvalidName { name: String },

    /// A callable is already bound under this qualified name
    #[error("internal call `{name}` is already bound")]
    AlreadyBound { name: String },

    /// An extern method declaration has no bound callable
    #[error("no internal call bound for `{name}`")]
    NotBound { name: String },

    /// Bound callable arity does not match the extern declaration
    #[error("internal call `{name}` bound with {bound} parameters, declaration has {declared}")]
    ArityMismatch {
        name: String,
        bound: usize,
        declared: usize,
    },
}

/// An exception raised inside managed code, translated to a structured
/// (type name, message) pair. Raw exception objects never cross the
/// boundary in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedException {
    pub type_name: String,
    pub message: String,
}

impl ManagedException {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ManagedException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

// Lets managed method bodies propagate host failures with `?`.
impl From<BridgeError> for ManagedException {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Managed(e) => e,
            BridgeError::InvalidInstance { .. } => {
                ManagedException::new("System.NullReferenceException", err.to_string())
            }
            BridgeError::Conversion(_) => {
                ManagedException::new("System.InvalidCastException", err.to_string())
            }
            other => ManagedException::new("System.Exception", other.to_string()),
        }
    }
}

/// Top-level bridge error, surfaced synchronously to the native caller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Value conversion failed
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// No assembly loaded under this name
    #[error("assembly `{name}` not found")]
    AssemblyNotFound { name: String },

    /// Type lookup failed
    #[error("class `{name}` not found")]
    ClassNotFound { name: String },

    /// Method lookup failed (by description or by name + arity)
    #[error("method `{desc}` not found on `{class}`")]
    MethodNotFound { class: String, desc: String },

    /// Field lookup failed
    #[error("field `{name}` not found on `{class}`")]
    FieldNotFound { class: String, name: String },

    /// Property lookup failed
    #[error("property `{name}` not found on `{class}`")]
    PropertyNotFound { class: String, name: String },

    /// A class is already defined in this domain
    #[error("class `{name}` is already defined")]
    DuplicateClass { name: String },

    /// Instance accessor used on a static member, or the reverse
    #[error("member `{member}` staticness mismatch: {reason}")]
    StaticMismatch {
        member: String,
        reason: &'static str,
    },

    /// Operating on a non-live or mismatched object reference
    #[error("invalid instance: {reason}")]
    InvalidInstance { reason: &'static str },

    /// An unhandled managed exception crossed into native code
    #[error("managed exception: {0}")]
    Managed(ManagedException),

    /// Internal-call binding or verification failure
    #[error("internal call error: {0}")]
    InternalCall(#[from] InternalCallError),
}
