// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging macros for the tProcessor crates.
//!
//! Records go to the `log` facade under a `tproc.rust::<module path>` target.
//! The embedding application installs the logger.

use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use log as _log;

#[doc(hidden)]
#[macro_export]
macro_rules! __emit {
    ($level:ident, $($fmt:tt)+) => {
        $crate::_log::$level!(
            target: concat!("tproc.rust::", module_path!()),
            $($fmt)+
        )
    };
}

#[macro_export]
macro_rules! info {
    ($($fmt:tt)+) => {
        $crate::__emit!(info, $($fmt)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($($fmt:tt)+) => {
        $crate::__emit!(warn, $($fmt)+)
    };
}

/// Info-level record that is only emitted after `init_logging(true)`.
///
/// Used for the derived per-channel timing tables, the sequence end time and
/// the final program listing.
#[macro_export]
macro_rules! diagnostic {
    ($($fmt:tt)+) => {
        if $crate::is_diagnostics_enabled() {
            $crate::__emit!(info, $($fmt)+)
        }
    };
}

static DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Acquire)
}

/// Turn diagnostic records on or off for the whole process.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS.store(with_diagnostics, Ordering::Release);
}
