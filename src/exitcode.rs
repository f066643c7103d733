//! Exit codes (BSD sysexits.h subset)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error, including out-of-range arguments
pub const USAGE: i32 = 64;

/// Malformed records, duplicates under strict mode, cycles, failed checks
pub const DATAERR: i32 = 65;

/// Cannot open input
pub const NOINPUT: i32 = 66;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
