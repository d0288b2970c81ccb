//! CLI Exit Code Registry
//!
//! Single source of truth for `oxldut` exit codes. Scripts and schedulers
//! rely on them, so codes are never renumbered.
//!
//! | Code | Meaning                                                       |
//! |------|---------------------------------------------------------------|
//! | 0    | Run completed (row-level failures do not change this)         |
//! | 1    | `--strict-exit` and at least one row failed or conflicted     |
//! | 2    | Usage error (bad or conflicting arguments)                    |
//! | 3    | Input file missing or unreadable                              |
//! | 4    | Run aborted (malformed row under `abort`, or source error)    |
//! | 5    | Invalid config file                                           |
//! | 6    | Cannot build the catalog client or write the report          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant with the next free number
//! 2. Document what triggers it
//! 3. Update the table above

/// Run completed.
pub const EXIT_SUCCESS: u8 = 0;

/// `--strict-exit` was given and some rows failed or hit duplicate uids.
pub const EXIT_ROW_FAILURES: u8 = 1;

/// Bad arguments. Matches clap's own exit code for parse errors.
pub const EXIT_USAGE: u8 = 2;

/// The `--csv`/`--xml` file does not exist or cannot be read.
pub const EXIT_INPUT: u8 = 3;

/// Processing stopped before the end of the source.
pub const EXIT_ABORTED: u8 = 4;

/// Config file missing (when named explicitly), unparsable or invalid.
pub const EXIT_CONFIG: u8 = 5;

/// HTTP client construction failed, or `--output` could not be written.
pub const EXIT_RUNTIME: u8 = 6;
