//! ECS Components and Registries
//!
//! Components for machines, observers, and carriers, plus the registry
//! resource that owns per-machine attention state.

pub mod machine;
pub mod observer;
pub mod registry;

pub use machine::{GroupId, Position, Trackable, UnitNumber};
pub use observer::{Carrier, Connected, Display, Observer, ViewRect};
pub use registry::{MachineRecord, MachineRegistry};
