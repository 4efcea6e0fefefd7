//! Type-erased values, parameter bindings, and resolved argument lists
//!
//! Instances produced by the container are shared as `Arc<dyn Any + Send + Sync>`
//! so that records of any concrete type fit one registry. Downcasts back to
//! concrete types are always checked, since values cross the user boundary.

use crate::{ContainerError, Result};
use ahash::RandomState;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased, shared service instance or parameter value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wrap a concrete value for use as an instance, binding, or default.
///
/// # Examples
///
/// ```rust
/// use girder_di::value;
///
/// let port = value(8080u16);
/// assert!(port.downcast_ref::<u16>().is_some());
/// ```
#[inline]
pub fn value<T: Injectable>(v: T) -> Value {
    Arc::new(v)
}

/// Marker trait for types that can flow through the container.
///
/// Automatically implemented for all `Send + Sync + 'static` types;
/// you never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for diagnostics
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

impl<T: Send + Sync + 'static> Injectable for T {}

/// Key of a pre-supplied parameter binding: by declared name or by
/// ordinal position in the signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterKey {
    /// Matches a formal parameter by its declared name
    Name(String),
    /// Matches a formal parameter by its zero-based position
    Position(usize),
}

/// A set of pre-supplied parameter values, keyed by name or position.
///
/// Used both as the bindings stored on a service record and as the
/// caller-supplied overrides passed to `make`/`call`/`build`.
///
/// # Examples
///
/// ```rust
/// use girder_di::Parameters;
///
/// let params = Parameters::new()
///     .with("path", "/var/log/app.log".to_string())
///     .at(1, 3usize);
///
/// assert!(params.named("path").is_some());
/// assert!(params.positional(1).is_some());
/// ```
#[derive(Clone, Default)]
pub struct Parameters {
    entries: HashMap<ParameterKey, Value, RandomState>,
}

impl Parameters {
    /// Create an empty parameter set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value to a parameter name.
    #[inline]
    pub fn with<T: Injectable>(self, name: &str, v: T) -> Self {
        self.with_value(name, value(v))
    }

    /// Bind an already-erased value to a parameter name.
    #[inline]
    pub fn with_value(mut self, name: &str, v: Value) -> Self {
        self.entries.insert(ParameterKey::Name(name.to_string()), v);
        self
    }

    /// Bind a value to an ordinal position.
    #[inline]
    pub fn at<T: Injectable>(self, position: usize, v: T) -> Self {
        self.at_value(position, value(v))
    }

    /// Bind an already-erased value to an ordinal position.
    #[inline]
    pub fn at_value(mut self, position: usize, v: Value) -> Self {
        self.entries.insert(ParameterKey::Position(position), v);
        self
    }

    /// Look up a binding by parameter name.
    #[inline]
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.entries.get(&ParameterKey::Name(name.to_string()))
    }

    /// Look up a binding by ordinal position.
    #[inline]
    pub fn positional(&self, position: usize) -> Option<&Value> {
        self.entries.get(&ParameterKey::Position(position))
    }

    /// Overlay this set on top of stored bindings.
    ///
    /// Keys already present here win over `bound`; keys only present in
    /// `bound` are carried in. Returns the merged set.
    pub fn merge_bound(mut self, bound: &Parameters) -> Parameters {
        for (key, v) in &bound.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(v));
        }
        self
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no bindings are present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameters")
            .field("len", &self.len())
            .finish()
    }
}

/// An ordered list of resolved argument values, one per formal parameter.
///
/// Handed to factory callbacks and type constructors; accessors downcast
/// back to concrete types with a checked cast.
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    /// Create an argument list from resolved values in declaration order.
    #[inline]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Downcast the argument at `index` to `T`.
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>> {
        let erased = self.values.get(index).ok_or(ContainerError::ArgumentType {
            index,
            expected: std::any::type_name::<T>(),
        })?;

        Arc::clone(erased)
            .downcast::<T>()
            .map_err(|_| ContainerError::ArgumentType {
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Raw erased value at `index`, if present.
    #[inline]
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.len())
            .finish()
    }
}
