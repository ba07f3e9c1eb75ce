//! Calendar projection: plan tasks to dated event tuples. Text-format
//! serialization (ICS and friends) is delegated to external tooling.

pub mod handlers;
pub mod projector;
