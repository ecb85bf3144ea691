//! Process exit codes

pub const EXIT_SUCCESS: i32 = 0;

/// Invalid configuration, unreadable files or cache failures.
pub const EXIT_ERROR: i32 = 1;

/// A startup check rejected the runtime environment.
pub const EXIT_INITIALIZATION: i32 = 2;
