//! Pipeline orchestration: the submit-attempt sequence and the keyed lock
//! registry that serializes per-user mastery updates and per-plan adaptive
//! applies.

pub mod locks;
pub mod submit;
