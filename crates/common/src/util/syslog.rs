//! # Syslog Module
//!
//! The `syslog` module manages syslog logging for applications hosting a PAM conversation. It
//! initializes the syslog logger and provides macros for logging messages with additional
//! context.
//!
//! ## Overview
//!
//! `init_log` installs a `syslog::BasicLogger` as the global `log` logger once per process and
//! stores a pre-formatted prefix in `PRE_LOG`. The `log_debug`, `log_info`, `log_warn` and
//! `log_error` macros only emit once that prefix is set. When the host already installed a
//! logger, the prefix is set all the same and the lines go to that logger.
//!
//! The conversation bridge never logs message texts, and answers are never logged at all.
//! `Credentials` forwards informational and error messages from PAM modules as they are.
//!
//! ## License
//!
//! pamconv
//! Copyright (C) 2023 github.com/34N0
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <http://www.gnu.org/licenses/>.

use pam::{PamResult, PamResultCode};
use std::sync::OnceLock;
use sysinfo::{Pid, System};
use syslog::{BasicLogger, Facility, Formatter3164};

use crate::config::Config;

/// Constants
const MODULE_NAME: &str = "pamconv";

/// Prefix of every log line, set by the first `init_log` call.
pub static PRE_LOG: OnceLock<String> = OnceLock::new();

static LOG_INIT: OnceLock<PamResult<()>> = OnceLock::new();

/// Initializes syslog logging.
///
/// This function should be called once by the hosting application to set up the syslog
/// logger. The first call does the work, concurrent callers wait for it and every later call
/// returns its outcome. The log level is taken from `config` and `context` is added to the
/// prefix of every line, e.g. `pamconv(login)`.
///
/// A logger installed by the host beforehand is kept and used.
///
/// # Errors
///
/// Returns `PAM_SYSTEM_ERR` when the syslog socket cannot be opened.
pub fn init_log(config: &Config, context: &str) -> PamResult<()> {
    *LOG_INIT.get_or_init(|| {
        PRE_LOG.get_or_init(|| pre_log(context));
        install_syslog(config)
    })
}

fn install_syslog(config: &Config) -> PamResult<()> {
    let formatter = Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: process_name(),
        pid: 0,
    };

    let logger = match syslog::unix(formatter) {
        Err(_) => return Err(PamResultCode::PAM_SYSTEM_ERR),
        Ok(logger) => logger,
    };

    match log::set_boxed_logger(Box::new(BasicLogger::new(logger))) {
        Ok(()) => log::set_max_level(config.log_level),
        Err(_) => crate::log_debug!("keeping the logger installed by the host"),
    }
    Ok(())
}

fn pre_log(context: &str) -> String {
    format!("{MODULE_NAME}({context})")
}

fn process_name() -> String {
    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();
    sys.refresh_process(pid);

    sys.process(pid)
        .map_or("unknown-process".to_string(), |p| p.name().to_string())
}

/// Macro for logging debug messages.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if let Some(pre_log) = $crate::util::syslog::PRE_LOG.get() {
            log::debug!("{}: {}", pre_log, format_args!($($arg)*));
        }
    };
}

/// Macro for logging informational messages.
///
/// This macro logs messages at the "info" level using the syslog logger.
///
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if let Some(pre_log) = $crate::util::syslog::PRE_LOG.get() {
            log::info!("{}: {}", pre_log, format_args!($($arg)*));
        }
    };
}

/// Macro for logging warnings.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if let Some(pre_log) = $crate::util::syslog::PRE_LOG.get() {
            log::warn!("{}: {}", pre_log, format_args!($($arg)*));
        }
    };
}

/// Macro for logging error messages.
///
/// This macro logs messages at the "error" level using the syslog logger.
///
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if let Some(pre_log) = $crate::util::syslog::PRE_LOG.get() {
            log::error!("{}: {}", pre_log, format_args!($($arg)*));
        }
    };
}
