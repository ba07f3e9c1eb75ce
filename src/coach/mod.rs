//! Daily coaching: briefings, task status transitions, rescheduling,
//! carry-over and overdue redistribution.

pub mod briefing;
pub mod handlers;
pub mod prompts;
pub mod schedule;
