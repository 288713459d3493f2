//! Test utilities for cadence-lib.
//!
//! Cross-platform shell snippets for tests that execute task commands
//! through the default shell (`/bin/sh -c` on Unix, PowerShell on Windows).

/// Returns a command that creates an empty file in the working directory.
#[cfg(unix)]
pub fn touch_cmd(filename: &str) -> String {
  format!("touch '{}'", filename)
}

#[cfg(windows)]
pub fn touch_cmd(filename: &str) -> String {
  format!("New-Item -ItemType File -Path '{}' -Force | Out-Null", filename)
}

/// Returns a command that exits with the given code.
pub fn fail_cmd(code: i32) -> String {
  format!("exit {}", code)
}

/// Returns a command that fails unless `var` is set to `yes`.
#[cfg(unix)]
pub fn require_env_cmd(var: &str) -> String {
  format!("test \"${}\" = yes", var)
}

#[cfg(windows)]
pub fn require_env_cmd(var: &str) -> String {
  format!("if ($env:{} -ne 'yes') {{ exit 1 }}", var)
}
