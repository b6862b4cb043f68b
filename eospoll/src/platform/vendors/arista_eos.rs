//! Arista EOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # user mode
//! switch#                            # privileged mode
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! [admin@switch ~]$                  # bash shell (su-style prompt)
//! ```
//!
//! Errors are classified from the device output itself. Some `% Error:` lines
//! are informational (idempotent deletes and creates, DNS misses, inactive
//! features) and are deliberately not treated as failures.

use crate::platform::PlatformDefinition;

/// Platform name used in logs and definitions.
pub const PLATFORM_NAME: &str = "arista_eos";

/// `hostname(ctx)(ctx)(ctx)#` with at most three parenthetical contexts.
pub const CLI_PROMPT: &str = r"[\r\n]?[\w+\-\.:/\[\]]+(?:\([^\)]+\)){0,3}(?:>|#) ?$";

/// `[user@host dir]$` style prompt of the EOS bash shell.
pub const SHELL_PROMPT: &str = r"\[\w+@[\w\-\.]+(?: [^\]]+)\] ?[>#$] ?$";

/// `% Error:` lines containing these are informational.
pub const BENIGN_ERRORS: [&str; 4] = [
    "does not exist",
    "already exists",
    "Host not found",
    "not active",
];

/// Create the Arista EOS platform definition.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt_pattern(CLI_PROMPT)?
        .with_prompt_pattern(SHELL_PROMPT)?
        .with_error_pattern_excluding(r"% ?Error: [^\n]*\n", &BENIGN_ERRORS)?
        .with_error_pattern(r"% ?Bad secret")?
        .with_error_pattern(r"(?i)invalid input")?
        .with_error_pattern(r"(?i)(?:incomplete|ambiguous) command")?
        .with_error_pattern(r"(?i)connection timed out")?
        .with_error_pattern(r"'[^']*' +returned error code: ?\d+")?
        .with_initial_prompt(r"\[y/n\]:", "y")?
        .with_escalate("enable", r"(?i)[\r\n]?password: ?$")?
        .with_deescalate("disable")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
        .with_terminal_size(32767, 24))
}
