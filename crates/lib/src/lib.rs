//! cadence-lib: Build invocation lifecycle for Cadence
//!
//! This crate provides the pieces a transport needs to serve one build request:
//! - `StartParameters`: what the caller asked for
//! - `BuildModel`: the configured projects and tasks
//! - `BuildController`: drives configuration, task execution and completion hooks
//! - `TaskGraph`: dependency ordering for the tasks selected by an invocation

pub mod configure;
pub mod consts;
pub mod execute;
pub mod invocation;
pub mod model;
pub mod params;
pub mod util;

pub use invocation::{BuildController, BuildControllerBuilder, BuildFailure, InvocationError, Phase};
pub use params::{BuildAction, CancellationToken, StartParameters};
