//! # `PamConv` Common Crate
//!
//! The `common` crate provides the application side of a PAM conversation: the handlers that
//! answer messages, the registry that maps correlation handles to those handlers, configuration
//! and syslog logging.
//!
//! # Modules
//!
//! ## `config`
//!
//! The `config` module loads the TOML configuration file. It includes a `Config` struct with the
//! PAM service name and the log level.
//!
//! ## `handler`
//!
//! The `handler` module defines the `ConversationHandler` trait, the typed message `Style` and a
//! ready-made `Credentials` handler.
//!
//! ## `registry`
//!
//! The `registry` module is the indirection table between the integer handle that travels
//! through libpam and the handler it stands for. Its `RegistryResponder` is what the
//! conversation bridge calls for every message.
//!
//! ## `transaction`
//!
//! Only with the `libpam` feature. Starts and drives a PAM transaction whose conversation is
//! answered by a registered handler.
//!
//! ## `util::syslog`
//!
//! Initializes syslog logging and provides the `log_*` macros.
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

pub mod config;
pub mod handler;
pub mod registry;
#[cfg(feature = "libpam")]
pub mod transaction;
pub mod util;
