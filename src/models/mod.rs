pub mod calendar;
pub mod document;
pub mod mastery;
pub mod plan;
pub mod practice;
pub mod skill;
pub mod user;
