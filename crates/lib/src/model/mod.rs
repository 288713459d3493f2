//! The build model.
//!
//! A [`BuildModel`] is the configured state of one build: its projects and
//! their tasks, the extension values contributed by the build file and the
//! effective parameters. It is produced by a configuration builder and owned
//! by exactly one invocation.

mod types;

pub use types::*;
