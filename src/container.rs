//! The inversion-of-control container
//!
//! Maps normalized interface names to service records, and doubles as a
//! dependency resolver: `make`/`call`/`build` consult the local registry
//! before falling back to ad-hoc self-bindings. `split` and `expel`
//! derive new containers whose carried records are protected from
//! further mutation.

use crate::reflect::{Callable, Reflect, normalize_interface};
use crate::resolver::{Resolver, ServiceSource};
use crate::service::{ProtectedRecord, Service, ServiceRecord};
use crate::values::{Parameters, Value};
use crate::{ContainerError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

type Registry = DashMap<String, Arc<dyn Service>, RandomState>;

/// Interface-keyed service container.
///
/// Interface keys are case-insensitive with leading/trailing `::`
/// trimmed, so two spellings of the same interface collide to one
/// binding. Binding an already-bound interface overwrites it; there is
/// no unbind.
///
/// # Examples
///
/// ```rust
/// use girder_di::{Container, Parameters, TypeRegistry, TypeSpec};
/// use std::sync::Arc;
///
/// struct Stamp(u64);
///
/// let types = TypeRegistry::new();
/// types.register(TypeSpec::of::<Stamp>("Stamp").constructor(|_| Ok(Stamp(7))));
///
/// let container = Container::new(Arc::new(types));
/// container.bind("Stamp").unwrap();
///
/// let stamp = container.make("Stamp", Parameters::new(), &[]).unwrap();
/// assert_eq!(stamp.downcast_ref::<Stamp>().unwrap().0, 7);
/// ```
#[derive(Clone)]
pub struct Container {
    services: Arc<Registry>,
    reflect: Arc<dyn Reflect>,
}

impl Container {
    /// Create an empty container over a reflective collaborator.
    pub fn new(reflect: Arc<dyn Reflect>) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "girder_di", "Creating new service container");

        Self {
            services: Arc::new(DashMap::with_hasher(RandomState::new())),
            reflect,
        }
    }

    /// New empty container sharing this one's reflector.
    fn derive(&self) -> Self {
        Self {
            services: Arc::new(DashMap::with_hasher(RandomState::new())),
            reflect: Arc::clone(&self.reflect),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Bind an interface to itself as a direct binding.
    pub fn bind(&self, interface: &str) -> Result<Arc<ServiceRecord>> {
        self.bind_direct(interface, None)
    }

    /// Bind an interface to a named concrete type as a direct binding.
    pub fn bind_type(&self, interface: &str, concrete: &str) -> Result<Arc<ServiceRecord>> {
        self.bind_direct(interface, Some(concrete))
    }

    /// Bind an interface to an already-built instance.
    ///
    /// The record is promoted to singleton with the instance cached.
    pub fn bind_instance(&self, interface: &str, instance: Value) -> Result<Arc<ServiceRecord>> {
        self.check_overwritable(interface)?;
        let record = Arc::new(ServiceRecord::with_existing(
            interface,
            instance,
            Arc::clone(&self.reflect),
        )?);
        self.store(interface, &record, "instance");
        Ok(record)
    }

    /// Bind an interface to a factory callable.
    pub fn factory(&self, interface: &str, callback: Callable) -> Result<Arc<ServiceRecord>> {
        self.check_overwritable(interface)?;
        let record = Arc::new(ServiceRecord::factory(
            interface,
            callback,
            Arc::clone(&self.reflect),
        ));
        self.store(interface, &record, "factory");
        Ok(record)
    }

    fn bind_direct(&self, interface: &str, concrete: Option<&str>) -> Result<Arc<ServiceRecord>> {
        self.check_overwritable(interface)?;
        let record = Arc::new(ServiceRecord::direct(
            interface,
            concrete,
            Arc::clone(&self.reflect),
        )?);
        self.store(interface, &record, "direct");
        Ok(record)
    }

    /// Refuse to overwrite a protected record.
    fn check_overwritable(&self, interface: &str) -> Result<()> {
        match self.services.get(&normalize_interface(interface)) {
            Some(existing) if existing.is_protected() => {
                Err(ContainerError::read_only(interface))
            }
            _ => Ok(()),
        }
    }

    fn store(&self, interface: &str, record: &Arc<ServiceRecord>, _kind: &'static str) {
        #[cfg(feature = "logging")]
        debug!(
            target: "girder_di",
            interface = interface,
            binding = _kind,
            service_count = self.services.len() + 1,
            "Registering service binding"
        );

        self.services.insert(
            normalize_interface(interface),
            Arc::clone(record) as Arc<dyn Service>,
        );
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get the service record bound to an interface.
    pub fn get(&self, interface: &str) -> Result<Arc<dyn Service>> {
        self.services
            .get(&normalize_interface(interface))
            .map(|r| Arc::clone(&r))
            .ok_or_else(|| ContainerError::unknown_interface(interface))
    }

    /// Whether a single interface is bound.
    #[inline]
    pub fn contains(&self, interface: &str) -> bool {
        self.services.contains_key(&normalize_interface(interface))
    }

    /// Whether every listed interface is bound. An empty list is
    /// vacuously true.
    pub fn has(&self, interfaces: &[&str]) -> bool {
        interfaces.iter().all(|i| self.contains(i))
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Derive a container carrying the selected interfaces as protected
    /// records.
    ///
    /// An empty selection selects every bound interface. Every selected
    /// interface must be bound; otherwise nothing is derived and the
    /// first unknown interface is reported.
    pub fn split(&self, interfaces: &[&str]) -> Result<Container> {
        let selected: Vec<String> = if interfaces.is_empty() {
            self.services.iter().map(|e| e.key().clone()).collect()
        } else {
            interfaces.iter().map(|i| normalize_interface(i)).collect()
        };

        for key in &selected {
            if !self.services.contains_key(key) {
                return Err(ContainerError::unknown_interface(key.clone()));
            }
        }

        let derived = self.derive();
        for key in &selected {
            if let Some(record) = self.services.get(key) {
                derived.services.insert(
                    key.clone(),
                    Arc::new(ProtectedRecord::new(Arc::clone(&record))) as Arc<dyn Service>,
                );
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "girder_di",
            selected = selected.len(),
            "Split protected sub-container from registry"
        );

        Ok(derived)
    }

    /// Derive a container carrying every bound interface *not* listed,
    /// each as a protected record.
    ///
    /// With an empty list this protects the entire registry, mirroring
    /// `split` with no selection. Unknown names subtract nothing.
    pub fn expel(&self, interfaces: &[&str]) -> Container {
        let excluded: Vec<String> = interfaces.iter().map(|i| normalize_interface(i)).collect();

        let derived = self.derive();
        for entry in self.services.iter() {
            if !excluded.contains(entry.key()) {
                derived.services.insert(
                    entry.key().clone(),
                    Arc::new(ProtectedRecord::new(Arc::clone(entry.value()))) as Arc<dyn Service>,
                );
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "girder_di",
            excluded = excluded.len(),
            carried = derived.services.len(),
            "Expelled interfaces into protected sub-container"
        );

        derived
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Produce an instance for an interface name.
    ///
    /// Bound interfaces resolve through their records; unbound interfaces
    /// fall back to an ad-hoc self-binding.
    pub fn make(&self, interface: &str, parameters: Parameters, enforced: &[&str]) -> Result<Value> {
        Resolver::new(self).make(interface, parameters, enforced)
    }

    /// Invoke a callable with its declared parameters resolved.
    pub fn call(
        &self,
        callable: &Callable,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        Resolver::new(self).call(callable, parameters, enforced)
    }

    /// Produce an instance for an explicit service record.
    pub fn build(
        &self,
        service: &dyn Service,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        Resolver::new(self).build(service, parameters, enforced)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of bound interfaces.
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True when nothing is bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Normalized keys of every bound interface.
    pub fn interfaces(&self) -> Vec<String> {
        self.services.iter().map(|e| e.key().clone()).collect()
    }

    /// The reflective collaborator backing this container.
    #[inline]
    pub fn reflector(&self) -> &Arc<dyn Reflect> {
        &self.reflect
    }
}

impl ServiceSource for Container {
    fn reflect(&self) -> &Arc<dyn Reflect> {
        &self.reflect
    }

    fn resolve_interface(&self, interface: &str) -> Result<Arc<dyn Service>> {
        if let Some(record) = self.services.get(&normalize_interface(interface)) {
            return Ok(Arc::clone(&record));
        }
        let record = ServiceRecord::direct(interface, None, Arc::clone(&self.reflect))?;
        Ok(Arc::new(record))
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .finish()
    }
}
