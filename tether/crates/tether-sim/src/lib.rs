//! # Tether Sim - Simulated Managed Host
//!
//! An in-process garbage-collected runtime implementing
//! [`tether_core::HostRuntime`]. It exists so the bridge can be driven
//! end to end without embedding a real virtual machine:
//!
//! - a heap of managed objects with fields and inter-object links
//! - local, strong and weak references with the usual resolution rules
//! - a stop-the-world mark-from-roots collector that finalizes native
//!   counterparts through their back-pointers
//! - per-thread pending failures, optionally enforced strictly
//! - a method table for proxied calls
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_core::{ClassInfo, PersistenceMode, Tether};
//! use tether_sim::SimHost;
//!
//! let host = Arc::new(SimHost::new());
//! let tether = Tether::new(Arc::clone(&host));
//! tether
//!     .classes()
//!     .register(ClassInfo::new("app.Widget", PersistenceMode::Persistent))
//!     .unwrap();
//!
//! let managed = host.allocate("app.Widget");
//! let object = tether.wrap("app.Widget", &managed).unwrap();
//! drop(managed);
//!
//! {
//!     let _owner = object.acquire_shared_owner().unwrap();
//!     assert_eq!(host.collect().collected, 0);
//! }
//!
//! let report = host.collect();
//! assert_eq!(report.finalized, 1);
//! assert!(object.is_destroyed());
//! ```

pub mod config;
pub mod error;
pub mod heap;
pub mod host;
pub mod value;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use heap::{LocalRef, ManagedCell, ManagedId, StrongRef, WeakRef};
pub use host::{CollectionReport, HostStats, SimHost, SimMethod};
pub use value::{SimFailure, SimValue};
