//! Verbosity-gated diagnostics for the planner.
//!
//! Nothing is formatted when the verbosity is below the macro's level.
//! - 0: SILENT
//! - 1: CHANGES (selected alternative, leveling shifts, missing resource data)
//! - 2: CHECKS (per-alternative scores, skipped candidates)
//! - 3: DEBUG (per-day ledger decisions)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!("[siteplan] {}", format_args!($($arg)*));
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!("[siteplan]   {}", format_args!($($arg)*));
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!("[siteplan]     {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_silent_macros_do_not_panic() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "shift {} by {}", "a", 2);
        log_checks!(verbosity, "check {}", 1);
        log_debug!(verbosity, "ledger {}", 3);
    }
}
