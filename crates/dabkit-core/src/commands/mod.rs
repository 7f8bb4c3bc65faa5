//! High-level commands for dabkit operations.
//!
//! These chain the lower-level session and workspace calls into the flows
//! frontends expose as a single action.

pub mod lifecycle;

pub use lifecycle::{
    LifecycleCommand, LifecycleOptions, LifecycleReport, LifecycleStep, Source, StepResult,
};
