//! Service records: the binding of an interface to its concrete implementation
//!
//! A record carries the binding target, lifecycle metadata (singleton flag,
//! parameter bindings, enforced optional parameters) and the lazily
//! populated singleton cache slot. Two binding kinds share one record type,
//! tagged by [`Concrete`]; [`ProtectedRecord`] wraps any record behind the
//! same contract while rejecting every mutation.

use crate::reflect::{Callable, Reflect};
use crate::values::{Parameters, Value};
use crate::{ContainerError, Result};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "logging")]
use tracing::trace;

/// The concrete side of a binding.
#[derive(Clone, Debug)]
pub enum Concrete {
    /// A type name to instantiate through the reflector
    Type(String),
    /// A callable invoked to produce instances
    Factory(Callable),
}

/// The contract shared by all service records.
///
/// Mutators return `Err` on protected records; read accessors always
/// succeed apart from [`Service::instance`], which requires a populated
/// singleton cache.
pub trait Service: Send + Sync + std::fmt::Debug {
    /// The interface this record serves.
    fn interface(&self) -> &str;

    /// The binding target.
    fn concrete(&self) -> &Concrete;

    /// Set or clear the singleton flag.
    fn singleton(&self, flag: bool) -> Result<()>;

    /// Whether built instances are cached and reused.
    fn is_singleton(&self) -> bool;

    /// Replace the parameter-binding set wholesale.
    fn with_parameters(&self, parameters: Parameters) -> Result<()>;

    /// The current parameter bindings.
    fn parameters(&self) -> Parameters;

    /// Replace the enforced optional-parameter name set wholesale.
    fn enforce_parameters(&self, names: &[&str]) -> Result<()>;

    /// The enforced optional-parameter names.
    fn enforced_parameters(&self) -> Vec<String>;

    /// The cached singleton instance.
    fn instance(&self) -> Result<Value>;

    /// True only when the record is singleton and the cache is populated.
    fn has_instance(&self) -> bool;

    /// Cache an instance, validating it against the record's interface.
    fn with_instance(&self, object: Value) -> Result<()>;

    /// Whether this record rejects mutation.
    fn is_protected(&self) -> bool {
        false
    }
}

/// A mutable service record: direct or factory binding plus lifecycle state.
pub struct ServiceRecord {
    interface: String,
    concrete: Concrete,
    singleton: AtomicBool,
    parameters: Mutex<Parameters>,
    enforced: Mutex<Vec<String>>,
    instance: OnceCell<Value>,
    reflect: Arc<dyn Reflect>,
}

impl ServiceRecord {
    /// Create a direct binding of `interface` to a concrete type name.
    ///
    /// `None` binds the interface to itself. A named concrete must be
    /// assignable to the interface.
    pub fn direct(
        interface: &str,
        concrete: Option<&str>,
        reflect: Arc<dyn Reflect>,
    ) -> Result<Self> {
        let concrete_name = concrete.unwrap_or(interface);
        if !reflect.assignable(concrete_name, interface) {
            return Err(ContainerError::concrete_mismatch(concrete_name, interface));
        }

        Ok(Self {
            interface: interface.to_string(),
            concrete: Concrete::Type(concrete_name.to_string()),
            singleton: AtomicBool::new(false),
            parameters: Mutex::new(Parameters::new()),
            enforced: Mutex::new(Vec::new()),
            instance: OnceCell::new(),
            reflect,
        })
    }

    /// Create a direct binding from an already-built instance.
    ///
    /// The record is forced into singleton mode, the instance is cached
    /// immediately, and the declared concrete becomes the instance's
    /// runtime type name.
    pub fn with_existing(
        interface: &str,
        existing: Value,
        reflect: Arc<dyn Reflect>,
    ) -> Result<Self> {
        if !reflect.satisfies(&existing, interface) {
            return Err(ContainerError::instance_mismatch(interface));
        }

        let concrete_name = reflect
            .runtime_type_name(&existing)
            .unwrap_or_else(|| interface.to_string());

        let record = Self {
            interface: interface.to_string(),
            concrete: Concrete::Type(concrete_name),
            singleton: AtomicBool::new(true),
            parameters: Mutex::new(Parameters::new()),
            enforced: Mutex::new(Vec::new()),
            instance: OnceCell::new(),
            reflect,
        };
        let _ = record.instance.set(existing);

        Ok(record)
    }

    /// Create a factory binding of `interface` to a callable.
    pub fn factory(interface: &str, callable: Callable, reflect: Arc<dyn Reflect>) -> Self {
        Self {
            interface: interface.to_string(),
            concrete: Concrete::Factory(callable),
            singleton: AtomicBool::new(false),
            parameters: Mutex::new(Parameters::new()),
            enforced: Mutex::new(Vec::new()),
            instance: OnceCell::new(),
            reflect,
        }
    }
}

impl Service for ServiceRecord {
    #[inline]
    fn interface(&self) -> &str {
        &self.interface
    }

    #[inline]
    fn concrete(&self) -> &Concrete {
        &self.concrete
    }

    fn singleton(&self, flag: bool) -> Result<()> {
        self.singleton.store(flag, Ordering::Release);
        Ok(())
    }

    #[inline]
    fn is_singleton(&self) -> bool {
        self.singleton.load(Ordering::Acquire)
    }

    fn with_parameters(&self, parameters: Parameters) -> Result<()> {
        *self.parameters.lock().unwrap() = parameters;
        Ok(())
    }

    fn parameters(&self) -> Parameters {
        self.parameters.lock().unwrap().clone()
    }

    fn enforce_parameters(&self, names: &[&str]) -> Result<()> {
        *self.enforced.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        Ok(())
    }

    fn enforced_parameters(&self) -> Vec<String> {
        self.enforced.lock().unwrap().clone()
    }

    fn instance(&self) -> Result<Value> {
        if !self.is_singleton() {
            return Err(ContainerError::not_singleton(&self.interface));
        }
        self.instance
            .get()
            .cloned()
            .ok_or_else(|| ContainerError::no_instance(&self.interface))
    }

    fn has_instance(&self) -> bool {
        self.is_singleton() && self.instance.get().is_some()
    }

    fn with_instance(&self, object: Value) -> Result<()> {
        if !self.is_singleton() {
            return Err(ContainerError::not_singleton(&self.interface));
        }
        if !self.reflect.satisfies(&object, &self.interface) {
            return Err(ContainerError::instance_mismatch(&self.interface));
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "girder_di",
            service = self.interface.as_str(),
            "Caching singleton instance"
        );

        self.instance
            .set(object)
            .map_err(|_| ContainerError::InstanceAlreadySet {
                interface: self.interface.clone(),
            })
    }
}

impl std::fmt::Debug for ServiceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRecord")
            .field("interface", &self.interface)
            .field("concrete", &self.concrete)
            .field("singleton", &self.is_singleton())
            .field("cached", &self.instance.get().is_some())
            .finish()
    }
}

/// A read-only decorator over another service record.
///
/// Forwards every read, rejects every mutation, and snapshots the wrapped
/// record's cached instance at wrap time so protected reads stay stable.
pub struct ProtectedRecord {
    inner: Arc<dyn Service>,
    snapshot: Option<Value>,
}

impl ProtectedRecord {
    /// Wrap a record, snapshotting its cached instance if present.
    pub fn new(inner: Arc<dyn Service>) -> Self {
        let snapshot = if inner.has_instance() {
            inner.instance().ok()
        } else {
            None
        };
        Self { inner, snapshot }
    }
}

impl Service for ProtectedRecord {
    #[inline]
    fn interface(&self) -> &str {
        self.inner.interface()
    }

    #[inline]
    fn concrete(&self) -> &Concrete {
        self.inner.concrete()
    }

    fn singleton(&self, _flag: bool) -> Result<()> {
        Err(ContainerError::read_only(self.inner.interface()))
    }

    #[inline]
    fn is_singleton(&self) -> bool {
        self.inner.is_singleton()
    }

    fn with_parameters(&self, _parameters: Parameters) -> Result<()> {
        Err(ContainerError::read_only(self.inner.interface()))
    }

    fn parameters(&self) -> Parameters {
        self.inner.parameters()
    }

    fn enforce_parameters(&self, _names: &[&str]) -> Result<()> {
        Err(ContainerError::read_only(self.inner.interface()))
    }

    fn enforced_parameters(&self) -> Vec<String> {
        self.inner.enforced_parameters()
    }

    fn instance(&self) -> Result<Value> {
        if !self.inner.is_singleton() {
            return Err(ContainerError::not_singleton(self.inner.interface()));
        }
        self.snapshot
            .clone()
            .ok_or_else(|| ContainerError::no_instance(self.inner.interface()))
    }

    fn has_instance(&self) -> bool {
        self.inner.is_singleton() && self.snapshot.is_some()
    }

    fn with_instance(&self, _object: Value) -> Result<()> {
        Err(ContainerError::read_only(self.inner.interface()))
    }

    fn is_protected(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for ProtectedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedRecord")
            .field("interface", &self.inner.interface())
            .field("snapshot", &self.snapshot.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{TypeRegistry, TypeSpec};
    use crate::values::value;

    struct ConsoleLogger;

    fn reflect() -> Arc<dyn Reflect> {
        let types = TypeRegistry::new();
        types.register(
            TypeSpec::of::<ConsoleLogger>("ConsoleLogger")
                .implements("Logger")
                .constructor(|_| Ok(ConsoleLogger)),
        );
        Arc::new(types)
    }

    #[test]
    fn test_direct_binding_validates_concrete() {
        let r = reflect();

        assert!(ServiceRecord::direct("Logger", Some("ConsoleLogger"), Arc::clone(&r)).is_ok());
        assert!(ServiceRecord::direct("Logger", None, Arc::clone(&r)).is_ok());

        let err = ServiceRecord::direct("Clock", Some("ConsoleLogger"), r).unwrap_err();
        assert!(matches!(err, ContainerError::ConcreteMismatch { .. }));
    }

    #[test]
    fn test_existing_instance_promotes_to_singleton() {
        let record =
            ServiceRecord::with_existing("Logger", value(ConsoleLogger), reflect()).unwrap();

        assert!(record.is_singleton());
        assert!(record.has_instance());
        match record.concrete() {
            Concrete::Type(name) => assert_eq!(name, "ConsoleLogger"),
            Concrete::Factory(_) => panic!("expected a type concrete"),
        }
    }

    #[test]
    fn test_existing_instance_must_satisfy_interface() {
        let err = ServiceRecord::with_existing("Clock", value(ConsoleLogger), reflect())
            .unwrap_err();
        assert!(matches!(err, ContainerError::InstanceMismatch { .. }));
    }

    #[test]
    fn test_instance_requires_singleton_and_cache() {
        let record = ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap();

        assert!(matches!(
            record.instance().unwrap_err(),
            ContainerError::NotSingleton { .. }
        ));

        record.singleton(true).unwrap();
        assert!(matches!(
            record.instance().unwrap_err(),
            ContainerError::NoInstance { .. }
        ));

        record.with_instance(value(ConsoleLogger)).unwrap();
        assert!(record.has_instance());
        assert!(record.instance().is_ok());
    }

    #[test]
    fn test_with_instance_rejects_foreign_values() {
        let record = ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap();
        record.singleton(true).unwrap();

        let err = record.with_instance(value(17u32)).unwrap_err();
        assert!(matches!(err, ContainerError::InstanceMismatch { .. }));
    }

    #[test]
    fn test_cache_slot_populates_once() {
        let record = ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap();
        record.singleton(true).unwrap();

        record.with_instance(value(ConsoleLogger)).unwrap();
        let err = record.with_instance(value(ConsoleLogger)).unwrap_err();
        assert!(matches!(err, ContainerError::InstanceAlreadySet { .. }));
    }

    #[test]
    fn test_parameters_replace_wholesale() {
        let record = ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap();

        record
            .with_parameters(Parameters::new().with("path", "/tmp/a.log".to_string()))
            .unwrap();
        assert!(record.parameters().named("path").is_some());

        record
            .with_parameters(Parameters::new().with("level", 3u8))
            .unwrap();
        let current = record.parameters();
        assert!(current.named("path").is_none());
        assert!(current.named("level").is_some());
    }

    #[test]
    fn test_protected_rejects_all_mutation() {
        let inner = Arc::new(
            ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap(),
        );
        inner.singleton(true).unwrap();
        inner.with_instance(value(ConsoleLogger)).unwrap();

        let protected = ProtectedRecord::new(inner as Arc<dyn Service>);

        assert!(matches!(
            protected.singleton(false).unwrap_err(),
            ContainerError::ReadOnly { .. }
        ));
        assert!(matches!(
            protected.with_parameters(Parameters::new()).unwrap_err(),
            ContainerError::ReadOnly { .. }
        ));
        assert!(matches!(
            protected.enforce_parameters(&["x"]).unwrap_err(),
            ContainerError::ReadOnly { .. }
        ));
        assert!(matches!(
            protected.with_instance(value(ConsoleLogger)).unwrap_err(),
            ContainerError::ReadOnly { .. }
        ));

        // Reads still flow through.
        assert_eq!(protected.interface(), "Logger");
        assert!(protected.is_singleton());
        assert!(protected.has_instance());
        assert!(protected.instance().is_ok());
    }

    #[test]
    fn test_protected_snapshot_of_unbuilt_singleton_is_empty() {
        let inner = Arc::new(
            ServiceRecord::direct("Logger", Some("ConsoleLogger"), reflect()).unwrap(),
        );
        inner.singleton(true).unwrap();

        let protected = ProtectedRecord::new(inner as Arc<dyn Service>);

        assert!(!protected.has_instance());
        assert!(matches!(
            protected.instance().unwrap_err(),
            ContainerError::NoInstance { .. }
        ));
    }
}
