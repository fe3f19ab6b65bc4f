//! # Tether - Native Objects Bound to a Garbage-Collected Host
//!
//! Tether keeps a native object and its counterpart in a managed,
//! garbage-collected runtime alive for exactly as long as either side needs
//! them, without leaking reference cycles between the two.
//!
//! ## Overview
//!
//! - **Dual-Reference Holder**: each [`NativeObject`] holds one managed
//!   reference, weak or strong, and flips between them as native interest
//!   comes and goes
//! - **Shared-Ownership Factory**: [`SharedOwner`] values for one object
//!   share a group and a single release action
//! - **Persistence Modes**: [`PersistenceMode`] decides whether the managed
//!   collector or the last native owner destroys the object
//! - **Pending Failures**: release actions never run host calls with a
//!   managed failure pending and never lose one
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether_core::{PersistenceMode, Tether};
//!
//! let tether = Tether::new(host.clone());
//! tether.register_class("app.Widget")?;
//!
//! let object = tether.construct("app.Widget", PersistenceMode::Persistent, &managed)?;
//! {
//!     // Managed side is pinned while the owner lives
//!     let owner = object.acquire_shared_owner()?;
//!     owner.call_method("refresh", vec![])?;
//! }
//! // Back to weak: the collector may now reclaim both halves
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────── Native ─────────────────────────────┐
//! │                                                                   │
//! │   SharedOwner ──┐                                                 │
//! │   SharedOwner ──┼──► owner group ──► NativeObject                 │
//! │   SharedOwner ──┘    (one release)     │ retain_count             │
//! │                                        │ Mutex<ManagedRef>        │
//! └────────────────────────────────────────┼──────────────────────────┘
//!                                          │ weak / strong handle
//! ┌────────────────────────────────────────┼───── Managed ────────────┐
//! │                                        ▼                          │
//! │                               managed object ── back-pointer ──┐  │
//! │                                        ▲                       │  │
//! │                       collector ───────┘   finalize() ◄────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`handle`] - host runtime contract and pending-failure guard
//! - [`object`] - dual-reference holder
//! - [`owner`] - shared-ownership factory
//! - [`class`] - class registry
//! - [`invoke`] - method proxy
//! - [`bridge`] - bridge context
//! - [`config`], [`error`], [`mode`], [`stats`]

pub mod bridge;
pub mod class;
pub mod config;
pub mod error;
pub mod handle;
pub mod invoke;
pub mod mode;
pub mod object;
pub mod owner;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::Tether;
pub use class::{canonical_name, ClassInfo, ClassRegistry, MethodSpec};
pub use config::{TetherConfig, DEFAULT_RETAIN_LIMIT};
pub use error::{Result, TetherError};
pub use handle::{HostRuntime, PendingFailureScope};
pub use mode::PersistenceMode;
pub use object::{HandleState, NativeObject, ObjectId};
pub use owner::SharedOwner;
pub use stats::ObjectStats;

#[doc(hidden)]
pub use log as __log;
