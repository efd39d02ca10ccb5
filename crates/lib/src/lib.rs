//! # `PamConv` Library
//!
//! `pamconv` answers the conversation callbacks of the PAM library with Rust handlers.
//!
//! libpam drives a conversation by calling an application supplied C function once per batch of
//! messages and expects an array of `malloc`ed answers in return. This crate provides that
//! function, keeps track of which handler belongs to which transaction and takes care of every
//! buffer crossing the boundary: answers collected for a failed conversation are zeroed before
//! they are freed.
//!
//! ## Usage
//!
//! ```
//! use pamconv::{registry, Conv, Credentials, PAM_PROMPT_ECHO_OFF};
//!
//! let registration = registry::register(Credentials::new("alice", "hunter2"));
//! let conv = registration.conv();
//!
//! // `&conv` is what gets passed to `pam_start`. A PAM module would then call:
//! let answer = Conv::new(&conv).send(PAM_PROMPT_ECHO_OFF, "Password: ")?;
//! assert_eq!(answer.as_deref().map(String::as_str), Some("hunter2"));
//! # Ok::<(), pamconv::PamResultCode>(())
//! ```
//!
//! Native code starting transactions itself can build the descriptor with the exported
//! `init_pam_conv` symbol.
//!
//! ## Configuration
//!
//! [`init`] reads `/etc/security/pamconv.conf` by default and sets up syslog logging.
//!
//! ```toml
//! [Configuration]
//! service = "login"
//! log_level = "info"
//! ```
//!
//! - `service`: PAM service a transaction is started for.
//! - `log_level`: Most verbose level forwarded to syslog.
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

use libc::c_long;
use std::ptr;

pub use common::config::Config;
pub use common::handler::{ConversationHandler, Credentials, Style};
pub use common::registry::{self, Registration, RegistryResponder};
#[cfg(feature = "libpam")]
pub use common::transaction::Transaction;
pub use pam::conv::{self, Conv, PamConv, PamMessage, PamResponse, Responder};
pub use pam::items::ItemType;
pub use pam::{
    CorrelationHandle, PamFlag, PamMessageStyle, PamResult, PamResultCode, PAM_BINARY_PROMPT,
    PAM_ERROR_MSG, PAM_MAX_NUM_MSG, PAM_PROMPT_ECHO_OFF, PAM_PROMPT_ECHO_ON, PAM_RADIO_TYPE,
    PAM_TEXT_INFO,
};

use common::log_info;

/// Loads the configuration and initializes syslog logging.
///
/// `config_path` overrides the default `/etc/security/pamconv.conf`. The loaded configuration
/// is returned even when logging cannot be set up.
///
/// # Errors
///
/// Returns the loaded configuration together with `PAM_SYSTEM_ERR` when the syslog logger
/// cannot be installed. The caller may carry on without logging.
pub fn init(config_path: Option<&str>) -> Result<Config, (Config, PamResultCode)> {
    let config = Config::load_file(config_path);

    match common::util::syslog::init_log(&config, &config.service) {
        Ok(()) => {
            log_info!("logging initialized at level {}", config.log_level);
            Ok(config)
        }
        Err(code) => Err((config, code)),
    }
}

/// Writes a conversation descriptor for `handle` into `conv`.
///
/// The descriptor routes every message to the handler registered under `handle` in
/// [`registry`]. A null `conv` is ignored.
///
/// # Safety
///
/// `conv` must be null or valid for writing a `PamConv`.
#[no_mangle]
#[allow(clippy::cast_sign_loss)]
pub unsafe extern "C" fn init_pam_conv(conv: *mut PamConv, handle: c_long) {
    if conv.is_null() {
        return;
    }
    unsafe { ptr::write(conv, PamConv::new::<RegistryResponder>(handle as CorrelationHandle)) };
}
