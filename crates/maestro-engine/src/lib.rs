//! The Maestro orchestration engine.
//!
//! Coordinates work across remotely-discovered A2A test agents: a
//! continuously-refreshed [`AgentRegistry`] behind an exclusivity
//! [`Gate`], the background [`Discovery`] loop, the per-task
//! submit→poll→terminal [`Dispatcher`], the label-based fan-out/fan-in
//! machinery, and the three trigger-facing workflows on [`Engine`].

pub mod discovery;
pub mod dispatch;
pub mod engine;
pub mod fanout;
pub mod gate;
pub mod registry;

pub use discovery::{Discovery, DiscoveryConfig};
pub use dispatch::{Dispatcher, TaskHandle};
pub use engine::{Engine, EngineConfig};
pub use gate::Gate;
pub use registry::AgentRegistry;
