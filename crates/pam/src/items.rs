//! # PAM items module
//!
//! This module defines the `ItemType` enum.
//!
//! An item is a piece of data stored in a PAM transaction, such as the service name, the user
//! being authenticated, or the tty. The application reads and writes items with
//! `pam_get_item` and `pam_set_item`, identifying each one by its `ItemType`.
//!
//! ## License
//!
//! Copyright 2023 34n0
//!
//! Use of this source code is governed by an MIT-style
//! license that can be found in the LICENSE file or at
//! https://opensource.org/licenses/MIT.

use libc::c_int;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ItemType {
    /// The service name
    Service = 1,
    /// The user name
    User = 2,
    /// The tty name
    Tty = 3,
    /// The remote host name
    Rhost = 4,
    /// The `pam_conv` structure
    Conv = 5,
    /// The authentication token (password)
    Authtok = 6,
    /// The old authentication token
    Oldauthtok = 7,
    /// The remote user name
    Ruser = 8,
    /// The prompt for getting a username
    UserPrompt = 9,
}

impl ItemType {
    #[must_use]
    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    /// Items whose value is a NUL-terminated string.
    #[must_use]
    pub fn is_string(self) -> bool {
        !matches!(self, ItemType::Conv)
    }
}
