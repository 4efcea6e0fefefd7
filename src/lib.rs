//! # Girder DI - Interface-Keyed Inversion of Control for Rust
//!
//! A dependency injection container that binds abstract interface names to
//! concrete implementations, instantiates them with their dependencies
//! resolved automatically, and optionally caches single shared instances.
//!
//! ## Features
//!
//! - 🔑 **Interface-keyed** - Bindings are addressed by name, case-insensitive
//!   and `::`-prefix tolerant
//! - 🏭 **Direct and factory bindings** - Bind a type name, a pre-built
//!   instance, or a callable that produces instances
//! - 🔄 **Recursive resolution** - Constructor and callable parameters are
//!   resolved by name, position, declared type, or default value
//! - ♻️ **Singletons on demand** - Flip any record into caching mode; the
//!   first successful build populates the cache exactly once
//! - 🔒 **Protected sub-containers** - `split`/`expel` derive containers
//!   whose records reject all further mutation
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! ```rust
//! use girder_di::prelude::*;
//!
//! struct FileLogger {
//!     path: String,
//! }
//!
//! // Describe types once; the resolver consults these descriptions the way
//! // a reflective runtime would consult real signatures.
//! let types = TypeRegistry::new();
//! types.register(
//!     TypeSpec::of::<FileLogger>("FileLogger")
//!         .implements("Logger")
//!         .parameter(Parameter::optional("path", "app.log".to_string()))
//!         .constructor(|args| {
//!             Ok(FileLogger {
//!                 path: args.get::<String>(0)?.as_ref().clone(),
//!             })
//!         }),
//! );
//!
//! let container = Container::new(Arc::new(types));
//! container.bind_type("Logger", "FileLogger").unwrap();
//!
//! let logger = container.make("Logger", Parameters::new(), &[]).unwrap();
//! assert_eq!(logger.downcast_ref::<FileLogger>().unwrap().path, "app.log");
//! ```
//!
//! ## Service Lifecycle
//!
//! ```rust
//! use girder_di::prelude::*;
//!
//! struct Clock;
//!
//! let types = TypeRegistry::new();
//! types.register(TypeSpec::of::<Clock>("Clock").constructor(|_| Ok(Clock)));
//!
//! let container = Container::new(Arc::new(types));
//!
//! // Transient by default: a fresh instance per make
//! let record = container.bind("Clock").unwrap();
//! let a = container.make("Clock", Parameters::new(), &[]).unwrap();
//! let b = container.make("Clock", Parameters::new(), &[]).unwrap();
//! assert!(!Arc::ptr_eq(&a, &b));
//!
//! // Singleton: the first build is cached and reused
//! record.singleton(true).unwrap();
//! let c = container.make("Clock", Parameters::new(), &[]).unwrap();
//! let d = container.make("Clock", Parameters::new(), &[]).unwrap();
//! assert!(Arc::ptr_eq(&c, &d));
//! ```
//!
//! ## Protected Sub-Containers
//!
//! ```rust
//! use girder_di::prelude::*;
//!
//! struct Clock;
//!
//! let types = TypeRegistry::new();
//! types.register(TypeSpec::of::<Clock>("Clock").constructor(|_| Ok(Clock)));
//!
//! let container = Container::new(Arc::new(types));
//! container.bind("Clock").unwrap();
//!
//! // Every record carried into the split is read-only
//! let split = container.split(&[]).unwrap();
//! let record = split.get("Clock").unwrap();
//! assert!(record.singleton(true).is_err());
//! ```

mod container;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod reflect;
mod resolver;
mod service;
mod values;

pub use container::*;
pub use error::*;
pub use reflect::*;
pub use resolver::*;
pub use service::*;
pub use values::*;

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, Callable, Concrete, Container, ContainerError, ErrorKind, Injectable,
        Parameter, Parameters, ProtectedRecord, Reflect, Resolver, Result, Service,
        ServiceRecord, ServiceSource, TypeRegistry, TypeSpec, Value, value,
    };
    pub use std::sync::Arc;
}
