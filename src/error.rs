//! Error types for container and resolution operations

use thiserror::Error;

/// Broad classification of container errors.
///
/// Every [`ContainerError`] variant belongs to exactly one kind, which
/// callers can match on when the precise variant does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Registry lookups and sub-container selection failures
    Binding,
    /// A binding or produced instance violates its declared interface
    Definition,
    /// An operation is invalid for the record's current lifecycle state
    State,
    /// A formal parameter or target type could not be resolved
    Resolution,
}

/// Errors raised by binding, lookup, and dependency-resolution operations
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// Interface is not bound in the container
    #[error("Unknown interface: {interface}")]
    UnknownInterface { interface: String },

    /// A direct binding's concrete type does not satisfy its interface
    #[error("Concrete type {concrete} does not satisfy interface {interface}")]
    ConcreteMismatch { concrete: String, interface: String },

    /// A produced or assigned instance does not satisfy the declared interface
    #[error("Instance does not satisfy interface {interface}")]
    InstanceMismatch { interface: String },

    /// Singleton-only operation invoked on a non-singleton record
    #[error("Service {interface} is not defined as singleton and can not hold an instance")]
    NotSingleton { interface: String },

    /// Singleton record has no cached instance yet
    #[error("Service {interface} has no instance yet")]
    NoInstance { interface: String },

    /// Mutation attempted on a protected (read-only) record
    #[error("Service {interface} is read-only and can not be modified")]
    ReadOnly { interface: String },

    /// Singleton cache slot is already populated
    #[error("Service {interface} already holds an instance")]
    InstanceAlreadySet { interface: String },

    /// No resolution rule matched a formal parameter
    #[error("Can not resolve parameter: {name}")]
    UnresolvedParameter { name: String },

    /// Target type is unknown to the reflector or has no usable constructor
    #[error("Can not instantiate type: {type_name}")]
    NotInstantiable { type_name: String },

    /// A resolved argument could not be downcast to the requested type
    #[error("Argument {index} is not of type {expected}")]
    ArgumentType { index: usize, expected: &'static str },
}

impl ContainerError {
    /// Classify this error into one of the four broad kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownInterface { .. } => ErrorKind::Binding,
            Self::ConcreteMismatch { .. } | Self::InstanceMismatch { .. } => ErrorKind::Definition,
            Self::NotSingleton { .. }
            | Self::NoInstance { .. }
            | Self::ReadOnly { .. }
            | Self::InstanceAlreadySet { .. } => ErrorKind::State,
            Self::UnresolvedParameter { .. }
            | Self::NotInstantiable { .. }
            | Self::ArgumentType { .. } => ErrorKind::Resolution,
        }
    }

    /// Create an UnknownInterface error
    #[inline]
    pub fn unknown_interface(interface: impl Into<String>) -> Self {
        Self::UnknownInterface {
            interface: interface.into(),
        }
    }

    /// Create a ConcreteMismatch error
    #[inline]
    pub fn concrete_mismatch(concrete: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::ConcreteMismatch {
            concrete: concrete.into(),
            interface: interface.into(),
        }
    }

    /// Create an InstanceMismatch error
    #[inline]
    pub fn instance_mismatch(interface: impl Into<String>) -> Self {
        Self::InstanceMismatch {
            interface: interface.into(),
        }
    }

    /// Create a NotSingleton error
    #[inline]
    pub fn not_singleton(interface: impl Into<String>) -> Self {
        Self::NotSingleton {
            interface: interface.into(),
        }
    }

    /// Create a NoInstance error
    #[inline]
    pub fn no_instance(interface: impl Into<String>) -> Self {
        Self::NoInstance {
            interface: interface.into(),
        }
    }

    /// Create a ReadOnly error
    #[inline]
    pub fn read_only(interface: impl Into<String>) -> Self {
        Self::ReadOnly {
            interface: interface.into(),
        }
    }

    /// Create an UnresolvedParameter error
    #[inline]
    pub fn unresolved_parameter(name: impl Into<String>) -> Self {
        Self::UnresolvedParameter { name: name.into() }
    }

    /// Create a NotInstantiable error
    #[inline]
    pub fn not_instantiable(type_name: impl Into<String>) -> Self {
        Self::NotInstantiable {
            type_name: type_name.into(),
        }
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;
