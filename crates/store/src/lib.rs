//! Store implementations for SignalScope.

pub mod fixture;
pub mod noop;
pub mod profiles;
pub mod triggers;

pub use fixture::{Fixture, FixtureStores};
pub use noop::{NoopLikes, NoopProfiles};
pub use profiles::{InMemoryLikes, InMemoryProfiles};
pub use triggers::{InMemoryTriggerStore, TriggerSource};
