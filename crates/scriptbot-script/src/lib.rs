//! Scriptbot: Script Authoring & Interpretation bounded context.
//!
//! Responsible for validating bot scripts, advancing end users through
//! them, capturing their answers, and projecting those answers into a
//! report.

pub mod application;
pub mod domain;
