//! Domain model for the Script Authoring & Interpretation context.

pub mod aggregates;
pub mod commands;
pub mod graph;
pub mod interpreter;
pub mod participant;
pub mod report;
pub mod repository;
pub mod script;
