//! Dependency resolution engine
//!
//! [`Resolver`] is stateless logic over a [`ServiceSource`]: it turns an
//! interface name, callable, or service record into a realized instance,
//! recursively consulting the source for interface-typed dependencies.
//! Arguments are resolved lazily, one formal parameter at a time, so a
//! failure at parameter *k* aborts before parameter *k+1* is touched.

use crate::reflect::{Callable, Parameter, Reflect};
use crate::service::{Concrete, Service, ServiceRecord};
use crate::values::{Arguments, Parameters, Value};
use crate::{ContainerError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// The interface-to-record resolution step consumed by [`Resolver`].
///
/// The default implementation resolves any interface to an ad-hoc direct
/// binding of the interface to itself; a registry-backed source checks
/// its bindings first and falls back to the ad-hoc record.
pub trait ServiceSource: Send + Sync {
    /// The reflective collaborator used for signatures, construction,
    /// and interface-satisfaction checks.
    fn reflect(&self) -> &Arc<dyn Reflect>;

    /// Resolve an interface name to a service record.
    fn resolve_interface(&self, interface: &str) -> Result<Arc<dyn Service>> {
        let record = ServiceRecord::direct(interface, None, Arc::clone(self.reflect()))?;
        Ok(Arc::new(record))
    }
}

/// Stateless resolution engine borrowing a [`ServiceSource`].
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    source: &'a dyn ServiceSource,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a source.
    #[inline]
    pub fn new(source: &'a dyn ServiceSource) -> Self {
        Self { source }
    }

    /// Produce an instance for an interface name.
    ///
    /// Resolves the interface through the source, then [`build`]s the
    /// record. Caller-supplied `parameters` override the record's stored
    /// bindings per key; `enforced` names optional interface-typed
    /// parameters that must be auto-resolved rather than defaulted.
    ///
    /// Recursion depth is bounded only by the dependency graph; cyclic
    /// interface dependencies recurse until the stack is exhausted.
    ///
    /// [`build`]: Resolver::build
    pub fn make(&self, interface: &str, parameters: Parameters, enforced: &[&str]) -> Result<Value> {
        #[cfg(feature = "logging")]
        trace!(
            target: "girder_di",
            interface = interface,
            "Resolving interface to an instance"
        );

        let service = self.source.resolve_interface(interface)?;
        self.build(service.as_ref(), parameters, enforced)
    }

    /// Invoke a callable with every declared parameter resolved.
    pub fn call(
        &self,
        callable: &Callable,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        let args = self
            .resolve_parameters(callable.parameters(), parameters, enforced)
            .collect::<Result<Vec<_>>>()?;
        callable.invoke(Arguments::new(args))
    }

    /// Produce an instance for a service record.
    pub fn build(
        &self,
        service: &dyn Service,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        if service.has_instance() {
            #[cfg(feature = "logging")]
            trace!(
                target: "girder_di",
                service = service.interface(),
                "Returning cached singleton instance"
            );
            return service.instance();
        }

        let merged = parameters.merge_bound(&service.parameters());

        let mut enforced_names = service.enforced_parameters();
        for name in enforced {
            if !enforced_names.iter().any(|n| n == name) {
                enforced_names.push((*name).to_string());
            }
        }
        let enforced_refs: Vec<&str> = enforced_names.iter().map(String::as_str).collect();

        let instance = match service.concrete() {
            Concrete::Factory(callable) => self.call(callable, merged, &enforced_refs)?,
            Concrete::Type(type_name) => self.instantiate(type_name, merged, &enforced_refs)?,
        };

        if !self.source.reflect().satisfies(&instance, service.interface()) {
            return Err(ContainerError::instance_mismatch(service.interface()));
        }

        if service.is_singleton() {
            match service.with_instance(Arc::clone(&instance)) {
                Ok(()) => {}
                // Lost a concurrent first build; the cached winner stands.
                Err(ContainerError::InstanceAlreadySet { .. }) => return service.instance(),
                Err(e) => return Err(e),
            }
        }

        Ok(instance)
    }

    /// Instantiate a named type, resolving its constructor's parameters.
    fn instantiate(
        &self,
        type_name: &str,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        let signature = self
            .source
            .reflect()
            .signature(type_name)
            .ok_or_else(|| ContainerError::not_instantiable(type_name))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "girder_di",
            type_name = type_name,
            parameters = signature.len(),
            "Instantiating concrete type"
        );

        let args = self
            .resolve_parameters(&signature, parameters, enforced)
            .collect::<Result<Vec<_>>>()?;
        self.source
            .reflect()
            .construct(type_name, Arguments::new(args))
    }

    /// Lazily resolve a formal parameter list.
    fn resolve_parameters(
        &self,
        descriptors: &[Parameter],
        parameters: Parameters,
        enforced: &[&str],
    ) -> ArgumentStream<'a> {
        ArgumentStream {
            resolver: *self,
            descriptors: descriptors.to_vec(),
            parameters,
            enforced: enforced.iter().map(|n| (*n).to_string()).collect(),
            position: 0,
        }
    }
}

/// Lazy, ordered sequence of resolved argument values.
///
/// Each `next()` resolves exactly one formal parameter through the
/// precedence chain: named binding, positional binding, required
/// type-directed resolution, enforced optional type-directed resolution,
/// declared default, error.
pub(crate) struct ArgumentStream<'a> {
    resolver: Resolver<'a>,
    descriptors: Vec<Parameter>,
    parameters: Parameters,
    enforced: Vec<String>,
    position: usize,
}

impl ArgumentStream<'_> {
    fn resolve_one(&self, current: &Parameter, position: usize) -> Result<Value> {
        // Named bindings win over everything else.
        if let Some(v) = self.parameters.named(current.name()) {
            return Ok(Arc::clone(v));
        }

        if let Some(v) = self.parameters.positional(position) {
            return Ok(Arc::clone(v));
        }

        if let Some(type_name) = current.type_name() {
            if !current.is_optional() {
                return self.resolver.make(type_name, Parameters::new(), &[]);
            }
            if self.enforced.iter().any(|n| n == current.name()) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "girder_di",
                    parameter = current.name(),
                    type_name = type_name,
                    "Auto-resolving enforced optional parameter"
                );
                return self.resolver.make(type_name, Parameters::new(), &[]);
            }
        }

        if current.is_optional() {
            if let Some(v) = current.default() {
                return Ok(Arc::clone(v));
            }
        }

        Err(ContainerError::unresolved_parameter(current.name()))
    }
}

impl Iterator for ArgumentStream<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.descriptors.get(self.position)?.clone();
        let position = self.position;
        self.position += 1;
        Some(self.resolve_one(&current, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{TypeRegistry, TypeSpec};
    use crate::values::value;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[allow(dead_code)]
    struct Connection {
        id: u32,
    }
    #[allow(dead_code)]
    struct Repo {
        conn: Arc<Connection>,
    }
    struct Clock;

    struct BareSource {
        reflect: Arc<dyn Reflect>,
    }

    impl ServiceSource for BareSource {
        fn reflect(&self) -> &Arc<dyn Reflect> {
            &self.reflect
        }
    }

    static CONNECTIONS: AtomicU32 = AtomicU32::new(0);

    fn source() -> BareSource {
        let types = TypeRegistry::new();
        types.register(
            TypeSpec::of::<Connection>("Connection").constructor(|_| {
                Ok(Connection {
                    id: CONNECTIONS.fetch_add(1, Ordering::SeqCst),
                })
            }),
        );
        types.register(
            TypeSpec::of::<Repo>("Repo")
                .parameter(Parameter::required("conn").typed("Connection"))
                .constructor(|args| {
                    Ok(Repo {
                        conn: args.get::<Connection>(0)?,
                    })
                }),
        );
        types.register(TypeSpec::of::<Clock>("Clock").constructor(|_| Ok(Clock)));
        BareSource {
            reflect: Arc::new(types),
        }
    }

    #[test]
    fn test_make_ad_hoc_self_binding() {
        let source = source();
        let resolver = Resolver::new(&source);

        let instance = resolver.make("Clock", Parameters::new(), &[]).unwrap();
        assert!(instance.downcast_ref::<Clock>().is_some());
    }

    #[test]
    fn test_make_unknown_type_is_not_instantiable() {
        let source = source();
        let resolver = Resolver::new(&source);

        let err = resolver.make("Ghost", Parameters::new(), &[]).unwrap_err();
        assert!(matches!(err, ContainerError::NotInstantiable { .. }));
    }

    #[test]
    fn test_required_typed_parameter_recurses() {
        let source = source();
        let resolver = Resolver::new(&source);

        let repo = resolver.make("Repo", Parameters::new(), &[]).unwrap();
        assert!(repo.downcast_ref::<Repo>().is_some());
    }

    #[test]
    fn test_named_binding_beats_positional() {
        let source = source();
        let resolver = Resolver::new(&source);

        let callable = Callable::new(|args| args.get::<String>(0).map(|s| s.as_ref().clone()))
            .parameter(Parameter::required("who"));

        let params = Parameters::new()
            .with("who", "named".to_string())
            .at(0, "positional".to_string());
        let out = resolver.call(&callable, params, &[]).unwrap();
        assert_eq!(out.downcast_ref::<String>().unwrap(), "named");
    }

    #[test]
    fn test_positional_binding_used_without_name_match() {
        let source = source();
        let resolver = Resolver::new(&source);

        let callable = Callable::new(|args| args.get::<u32>(0).map(|v| *v))
            .parameter(Parameter::required("count"));

        let out = resolver
            .call(&callable, Parameters::new().at(0, 9u32), &[])
            .unwrap();
        assert_eq!(*out.downcast_ref::<u32>().unwrap(), 9);
    }

    #[test]
    fn test_enforced_optional_overrides_default() {
        let source = source();
        let resolver = Resolver::new(&source);

        let callable = Callable::new(|args| {
            Ok(args.raw(0).and_then(|v| v.downcast_ref::<Connection>()).is_some())
        })
        .parameter(Parameter::optional_value("conn", value(())).typed("Connection"));

        // Not enforced: the declared default is used.
        let defaulted = resolver
            .call(&callable, Parameters::new(), &[])
            .unwrap();
        assert!(!defaulted.downcast_ref::<bool>().unwrap());

        // Enforced: the optional parameter is auto-resolved anyway.
        let enforced = resolver
            .call(&callable, Parameters::new(), &["conn"])
            .unwrap();
        assert!(*enforced.downcast_ref::<bool>().unwrap());
    }

    #[test]
    fn test_unresolvable_parameter_is_named() {
        let source = source();
        let resolver = Resolver::new(&source);

        let callable =
            Callable::new(|_| Ok(())).parameter(Parameter::required("mystery"));

        let err = resolver.call(&callable, Parameters::new(), &[]).unwrap_err();
        match err {
            ContainerError::UnresolvedParameter { name } => assert_eq!(name, "mystery"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_aborts_before_later_parameters() {
        static TOUCHED: AtomicU32 = AtomicU32::new(0);

        struct SideEffect;

        let types = TypeRegistry::new();
        types.register(TypeSpec::of::<SideEffect>("SideEffect").constructor(|_| {
            TOUCHED.fetch_add(1, Ordering::SeqCst);
            Ok(SideEffect)
        }));
        let source = BareSource {
            reflect: Arc::new(types),
        };
        let resolver = Resolver::new(&source);

        let callable = Callable::new(|_| Ok(()))
            .parameter(Parameter::required("missing"))
            .parameter(Parameter::required("effect").typed("SideEffect"));

        let err = resolver.call(&callable, Parameters::new(), &[]).unwrap_err();
        assert!(matches!(err, ContainerError::UnresolvedParameter { .. }));
        assert_eq!(TOUCHED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_build_validates_produced_instance() {
        let source = source();
        let resolver = Resolver::new(&source);

        // A factory that lies about its return contract.
        let record = ServiceRecord::factory(
            "Connection",
            Callable::new(|_| Ok("not a connection".to_string())),
            Arc::clone(source.reflect()),
        );

        let err = resolver
            .build(&record, Parameters::new(), &[])
            .unwrap_err();
        assert!(matches!(err, ContainerError::InstanceMismatch { .. }));
    }

    #[test]
    fn test_singleton_build_caches_once() {
        let source = source();
        let resolver = Resolver::new(&source);

        let record =
            ServiceRecord::direct("Connection", None, Arc::clone(source.reflect())).unwrap();
        record.singleton(true).unwrap();

        let a = resolver.build(&record, Parameters::new(), &[]).unwrap();
        let b = resolver.build(&record, Parameters::new(), &[]).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(record.has_instance());
    }

    #[test]
    fn test_transient_build_produces_fresh_instances() {
        let source = source();
        let resolver = Resolver::new(&source);

        let record =
            ServiceRecord::direct("Connection", None, Arc::clone(source.reflect())).unwrap();

        let a = resolver.build(&record, Parameters::new(), &[]).unwrap();
        let b = resolver.build(&record, Parameters::new(), &[]).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!record.has_instance());
    }

    #[test]
    fn test_record_bindings_merge_under_caller_parameters() {
        let types = TypeRegistry::new();
        types.register(TypeSpec::of::<String>("Echo").constructor(|_| Ok(String::new())));
        let source = BareSource {
            reflect: Arc::new(types),
        };
        let resolver = Resolver::new(&source);

        let record = ServiceRecord::factory(
            "Echo",
            Callable::new(|args| args.get::<String>(0).map(|s| s.as_ref().clone()))
                .parameter(Parameter::required("text")),
            Arc::clone(source.reflect()),
        );
        record
            .with_parameters(Parameters::new().with("text", "bound".to_string()))
            .unwrap();

        let from_binding = resolver.build(&record, Parameters::new(), &[]).unwrap();
        assert_eq!(from_binding.downcast_ref::<String>().unwrap(), "bound");

        let overridden = resolver
            .build(
                &record,
                Parameters::new().with("text", "caller".to_string()),
                &[],
            )
            .unwrap();
        assert_eq!(overridden.downcast_ref::<String>().unwrap(), "caller");
    }

    #[test]
    fn test_record_enforced_names_apply_on_build() {
        let types = TypeRegistry::new();
        types.register(
            TypeSpec::of::<Connection>("Connection").constructor(|_| {
                Ok(Connection {
                    id: CONNECTIONS.fetch_add(1, Ordering::SeqCst),
                })
            }),
        );
        types.register(TypeSpec::of::<bool>("Probe").constructor(|_| Ok(false)));
        let source = BareSource {
            reflect: Arc::new(types),
        };
        let resolver = Resolver::new(&source);

        let record = ServiceRecord::factory(
            "Probe",
            Callable::new(|args| {
                Ok(args.raw(0).and_then(|v| v.downcast_ref::<Connection>()).is_some())
            })
            .parameter(Parameter::optional_value("conn", value(())).typed("Connection")),
            Arc::clone(source.reflect()),
        );
        record.enforce_parameters(&["conn"]).unwrap();

        let out = resolver.build(&record, Parameters::new(), &[]).unwrap();
        assert!(*out.downcast_ref::<bool>().unwrap());
    }
}
