//! Scriptbot Core: shared domain abstractions.
//!
//! This crate defines the error taxonomy and the small traits that every
//! other crate depends on. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
