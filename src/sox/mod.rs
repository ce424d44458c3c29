//! Typed handles over libsox
//!
//! Every handle borrows the [`Sox`] guard that initialised the library.

pub mod chain;
pub mod effect;
pub mod runtime;
pub mod stream;

pub use chain::{EffectsChain, FlowControl, FlowOutcome};
pub use effect::{Effect, EffectFlags, EffectHandler, EffectSpec};
pub use runtime::{is_initialized, Sox};
pub use stream::{InputStream, OutputStream, ReadOptions, WriteOptions};
