//! Names and defaults shared across cadence.

pub const APP_NAME: &str = "cadence";

/// Build file looked up in the project directory when none is given.
pub const DEFAULT_BUILD_FILE: &str = "cadence.json";

/// Environment variable overriding the build file path.
pub const ENV_BUILD_FILE: &str = "CADENCE_BUILD_FILE";

/// Environment variable overriding the executor parallelism.
pub const ENV_PARALLELISM: &str = "CADENCE_PARALLELISM";

/// Environment variable overriding the shell used for task commands.
pub const ENV_SHELL: &str = "CADENCE_SHELL";

/// Separator between project and task name in a task path.
pub const TASK_PATH_SEPARATOR: char = ':';
