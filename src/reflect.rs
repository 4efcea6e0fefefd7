//! Reflective collaborator: parameter descriptors, callables, and the type registry
//!
//! The resolver never inspects Rust types directly. It consumes three
//! capabilities through the [`Reflect`] trait: enumerating a constructor's
//! formal parameters, constructing a named type from an ordered argument
//! list, and asking whether a value or type satisfies a named interface.
//! [`TypeRegistry`] is the default implementation, fed by applications
//! describing their types with [`TypeSpec`].

use crate::values::{Arguments, Injectable, Value, value};
use crate::{ContainerError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Normalize an interface identifier: case-insensitive, with leading and
/// trailing `::` path separators trimmed, so that two spellings of the
/// same interface collide to one key.
pub(crate) fn normalize_interface(interface: &str) -> String {
    interface
        .trim_start_matches("::")
        .trim_end_matches("::")
        .to_ascii_lowercase()
}

// =============================================================================
// Parameter descriptors
// =============================================================================

/// Description of one formal parameter of a constructor or callable:
/// name, optional declared type, optionality, and default value.
///
/// Ordinal position is the descriptor's index in its signature.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    type_name: Option<String>,
    optional: bool,
    default: Option<Value>,
}

impl Parameter {
    /// A required parameter with no declared type.
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: None,
            optional: false,
            default: None,
        }
    }

    /// An optional parameter carrying its declared default value.
    pub fn optional<T: Injectable>(name: &str, default: T) -> Self {
        Self::optional_value(name, value(default))
    }

    /// An optional parameter with an already-erased default value.
    pub fn optional_value(name: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            type_name: None,
            optional: true,
            default: Some(default),
        }
    }

    /// Declare the parameter's type, making it eligible for type-directed
    /// resolution.
    pub fn typed(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    /// The declared parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type, if any.
    #[inline]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Whether the parameter is optional.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The declared default value, present for optional parameters.
    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("optional", &self.optional)
            .finish()
    }
}

// =============================================================================
// Callable
// =============================================================================

type CallableFn = Arc<dyn Fn(Arguments) -> Result<Value> + Send + Sync>;

/// A callback paired with its formal parameter list.
///
/// Rust closures carry no introspectable signature, so a `Callable`
/// declares its parameters explicitly; the resolver reads them exactly
/// as it reads a constructor signature.
///
/// # Examples
///
/// ```rust
/// use girder_di::{Callable, Parameter};
///
/// struct Greeting(String);
///
/// let callable = Callable::new(|args| {
///     let name = args.get::<String>(0)?;
///     Ok(Greeting(format!("hello {name}")))
/// })
/// .parameter(Parameter::required("name"));
///
/// assert_eq!(callable.parameters().len(), 1);
/// ```
#[derive(Clone)]
pub struct Callable {
    parameters: Vec<Parameter>,
    func: CallableFn,
}

impl Callable {
    /// Wrap a callback producing a concrete value.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            func: Arc::new(move |args| f(args).map(|v| Arc::new(v) as Value)),
        }
    }

    /// Wrap a callback that already produces an erased [`Value`].
    pub fn erased<F>(f: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            func: Arc::new(f),
        }
    }

    /// Append a formal parameter descriptor (declaration order).
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The declared formal parameter list.
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Invoke the callback with resolved arguments.
    #[inline]
    pub fn invoke(&self, args: Arguments) -> Result<Value> {
        (self.func)(args)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

// =============================================================================
// Reflect capability
// =============================================================================

/// The reflective capability consumed by the resolver.
///
/// Implementations answer, for named types: what are the constructor's
/// formal parameters, how is an instance constructed from an ordered
/// argument list, and do values/types satisfy a named interface.
pub trait Reflect: Send + Sync {
    /// Constructor signature of a named type.
    ///
    /// `None` when the type is unknown or has no usable constructor.
    fn signature(&self, type_name: &str) -> Option<Vec<Parameter>>;

    /// Construct an instance of a named type from resolved arguments.
    fn construct(&self, type_name: &str, args: Arguments) -> Result<Value>;

    /// Whether a value satisfies a named interface.
    fn satisfies(&self, v: &Value, interface: &str) -> bool;

    /// Whether a named concrete type is assignable to a named interface.
    fn assignable(&self, concrete: &str, interface: &str) -> bool;

    /// Runtime type name of a value, when known to this reflector.
    fn runtime_type_name(&self, v: &Value) -> Option<String>;
}

// =============================================================================
// Type registry
// =============================================================================

type ConstructFn = Arc<dyn Fn(Arguments) -> Result<Value> + Send + Sync>;

/// Fluent description of one type for the registry.
///
/// # Examples
///
/// ```rust
/// use girder_di::{Parameter, TypeRegistry, TypeSpec};
///
/// struct FileLogger { path: String }
///
/// let types = TypeRegistry::new();
/// types.register(
///     TypeSpec::of::<FileLogger>("FileLogger")
///         .implements("Logger")
///         .parameter(Parameter::required("path"))
///         .constructor(|args| {
///             Ok(FileLogger { path: args.get::<String>(0)?.as_ref().clone() })
///         }),
/// );
/// ```
pub struct TypeSpec {
    name: String,
    type_id: Option<TypeId>,
    implements: Vec<String>,
    parameters: Vec<Parameter>,
    constructor: Option<ConstructFn>,
}

impl TypeSpec {
    /// Describe a concrete type `T` under the given name.
    pub fn of<T: Injectable>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_id: Some(TypeId::of::<T>()),
            implements: Vec::new(),
            parameters: Vec::new(),
            constructor: None,
        }
    }

    /// Describe an abstract interface: known to the registry but never
    /// instantiable.
    pub fn interface(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_id: None,
            implements: Vec::new(),
            parameters: Vec::new(),
            constructor: None,
        }
    }

    /// Declare an interface this type satisfies.
    pub fn implements(mut self, interface: &str) -> Self {
        self.implements.push(normalize_interface(interface));
        self
    }

    /// Append a constructor parameter descriptor (declaration order).
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Provide the constructor. A spec without one describes a type that
    /// is known but not instantiable.
    pub fn constructor<T, F>(mut self, f: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move |args| f(args).map(|v| Arc::new(v) as Value)));
        self
    }
}

struct TypeEntry {
    name: String,
    key: String,
    implements: Vec<String>,
    parameters: Vec<Parameter>,
    constructor: Option<ConstructFn>,
}

/// Default [`Reflect`] implementation: a concurrent registry of type
/// descriptions indexed by normalized name and by `TypeId`.
pub struct TypeRegistry {
    by_name: DashMap<String, Arc<TypeEntry>, RandomState>,
    by_id: DashMap<TypeId, Arc<TypeEntry>, RandomState>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            by_name: DashMap::with_hasher(RandomState::new()),
            by_id: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a type description. Re-registering a name overwrites.
    pub fn register(&self, spec: TypeSpec) {
        let entry = Arc::new(TypeEntry {
            key: normalize_interface(&spec.name),
            name: spec.name,
            implements: spec.implements,
            parameters: spec.parameters,
            constructor: spec.constructor,
        });

        #[cfg(feature = "logging")]
        debug!(
            target: "girder_di",
            type_name = entry.name.as_str(),
            instantiable = entry.constructor.is_some(),
            implements = entry.implements.len(),
            "Registering type description"
        );

        if let Some(id) = spec.type_id {
            self.by_id.insert(id, Arc::clone(&entry));
        }
        self.by_name.insert(entry.key.clone(), entry);
    }

    /// Whether a type name is known to the registry.
    pub fn knows(&self, type_name: &str) -> bool {
        self.by_name.contains_key(&normalize_interface(type_name))
    }

    /// Number of registered type descriptions.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no types are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn entry(&self, type_name: &str) -> Option<Arc<TypeEntry>> {
        self.by_name
            .get(&normalize_interface(type_name))
            .map(|e| Arc::clone(&e))
    }

    fn entry_of(&self, v: &Value) -> Option<Arc<TypeEntry>> {
        self.by_id.get(&v.as_ref().type_id()).map(|e| Arc::clone(&e))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflect for TypeRegistry {
    fn signature(&self, type_name: &str) -> Option<Vec<Parameter>> {
        let entry = self.entry(type_name)?;
        entry.constructor.is_some().then(|| entry.parameters.clone())
    }

    fn construct(&self, type_name: &str, args: Arguments) -> Result<Value> {
        let entry = self
            .entry(type_name)
            .ok_or_else(|| ContainerError::not_instantiable(type_name))?;
        let constructor = entry
            .constructor
            .as_ref()
            .ok_or_else(|| ContainerError::not_instantiable(type_name))?;

        constructor(args)
    }

    fn satisfies(&self, v: &Value, interface: &str) -> bool {
        let key = normalize_interface(interface);
        match self.entry_of(v) {
            Some(entry) => entry.key == key || entry.implements.contains(&key),
            None => false,
        }
    }

    fn assignable(&self, concrete: &str, interface: &str) -> bool {
        let ckey = normalize_interface(concrete);
        let ikey = normalize_interface(interface);
        if ckey == ikey {
            return true;
        }
        match self.by_name.get(&ckey) {
            Some(entry) => entry.implements.contains(&ikey),
            None => false,
        }
    }

    fn runtime_type_name(&self, v: &Value) -> Option<String> {
        self.entry_of(v).map(|entry| entry.name.clone())
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .finish()
    }
}
