//! # PAM Module
//!
//! This is the main module of the PAM library. It provides the data structures and constants
//! shared by the application side of the Pluggable Authentication Modules (PAM) API.
//!
//! The main types provided by this module are:
//! - `PamResultCode`: An enum representing the possible result codes that can be returned by
//!   PAM functions and by a conversation function.
//! - `PamMessageStyle`: The style tag of a conversation message.
//! - `PamFlag`: The flags that can be passed to the PAM application functions.
//! - `CorrelationHandle`: The pointer wide integer that travels through a conversation as
//!   its opaque user data.
//!
//! The conversation bridge itself lives in [`conv`]. When the `libpam` feature is enabled,
//! [`ffi`] declares the libpam application functions.
//!
//!  ## License
//!
//! Copyright 2023 34n0
//!
//! Use of this source code is governed by an MIT-style
//! license that can be found in the LICENSE file or at
//! https://opensource.org/licenses/MIT.

pub mod conv;
pub mod items;
pub mod macros;

use libc::{c_int, c_uint};

pub type PamFlag = c_uint;
pub type PamMessageStyle = c_int;

/// Opaque value threaded through a conversation as `appdata_ptr`.
pub type CorrelationHandle = usize;

/// Linux-PAM ceiling on the number of messages in one conversation call.
pub const PAM_MAX_NUM_MSG: c_int = 32;

pub const PAM_PROMPT_ECHO_OFF: PamMessageStyle = 1;
pub const PAM_PROMPT_ECHO_ON: PamMessageStyle = 2;
pub const PAM_ERROR_MSG: PamMessageStyle = 3;
pub const PAM_TEXT_INFO: PamMessageStyle = 4;
/// yes/no/maybe conditionals (Linux-PAM extension)
pub const PAM_RADIO_TYPE: PamMessageStyle = 5;
/// Linux-PAM extension
pub const PAM_BINARY_PROMPT: PamMessageStyle = 7;

pub const PAM_NONE: PamFlag = 0;
pub const PAM_SILENT: PamFlag = 0x8000;
pub const PAM_DISALLOW_NULL_AUTHTOK: PamFlag = 0x0001;
pub const PAM_ESTABLISH_CRED: PamFlag = 0x0002;
pub const PAM_DELETE_CRED: PamFlag = 0x0004;
pub const PAM_REINITIALIZE_CRED: PamFlag = 0x0008;
pub const PAM_REFRESH_CRED: PamFlag = 0x0010;
pub const PAM_CHANGE_EXPIRED_AUTHTOK: PamFlag = 0x0020;

#[allow(non_camel_case_types, dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum PamResultCode {
    PAM_SUCCESS = 0,
    PAM_OPEN_ERR = 1,
    PAM_SYMBOL_ERR = 2,
    PAM_SERVICE_ERR = 3,
    PAM_SYSTEM_ERR = 4,
    PAM_BUF_ERR = 5,
    PAM_PERM_DENIED = 6,
    PAM_AUTH_ERR = 7,
    PAM_CRED_INSUFFICIENT = 8,
    PAM_AUTHINFO_UNAVAIL = 9,
    PAM_USER_UNKNOWN = 10,
    PAM_MAXTRIES = 11,
    PAM_NEW_AUTHTOK_REQD = 12,
    PAM_ACCT_EXPIRED = 13,
    PAM_SESSION_ERR = 14,
    PAM_CRED_UNAVAIL = 15,
    PAM_CRED_EXPIRED = 16,
    PAM_CRED_ERR = 17,
    PAM_NO_MODULE_DATA = 18,
    PAM_CONV_ERR = 19,
    PAM_AUTHTOK_ERR = 20,
    PAM_AUTHTOK_RECOVERY_ERR = 21,
    PAM_AUTHTOK_LOCK_BUSY = 22,
    PAM_AUTHTOK_DISABLE_AGING = 23,
    PAM_TRY_AGAIN = 24,
    PAM_IGNORE = 25,
    PAM_ABORT = 26,
    PAM_AUTHTOK_EXPIRED = 27,
    PAM_MODULE_UNKNOWN = 28,
    PAM_BAD_ITEM = 29,
    PAM_CONV_AGAIN = 30,
    PAM_INCOMPLETE = 31,
}

impl PamResultCode {
    /// Maps a raw status returned by libpam onto `PamResultCode`.
    ///
    /// Values outside the Linux-PAM range map to `PAM_SYSTEM_ERR`.
    #[must_use]
    #[allow(clippy::enum_glob_use)]
    pub fn from_raw(code: c_int) -> Self {
        use PamResultCode::*;

        match code {
            0 => PAM_SUCCESS,
            1 => PAM_OPEN_ERR,
            2 => PAM_SYMBOL_ERR,
            3 => PAM_SERVICE_ERR,
            5 => PAM_BUF_ERR,
            6 => PAM_PERM_DENIED,
            7 => PAM_AUTH_ERR,
            8 => PAM_CRED_INSUFFICIENT,
            9 => PAM_AUTHINFO_UNAVAIL,
            10 => PAM_USER_UNKNOWN,
            11 => PAM_MAXTRIES,
            12 => PAM_NEW_AUTHTOK_REQD,
            13 => PAM_ACCT_EXPIRED,
            14 => PAM_SESSION_ERR,
            15 => PAM_CRED_UNAVAIL,
            16 => PAM_CRED_EXPIRED,
            17 => PAM_CRED_ERR,
            18 => PAM_NO_MODULE_DATA,
            19 => PAM_CONV_ERR,
            20 => PAM_AUTHTOK_ERR,
            21 => PAM_AUTHTOK_RECOVERY_ERR,
            22 => PAM_AUTHTOK_LOCK_BUSY,
            23 => PAM_AUTHTOK_DISABLE_AGING,
            24 => PAM_TRY_AGAIN,
            25 => PAM_IGNORE,
            26 => PAM_ABORT,
            27 => PAM_AUTHTOK_EXPIRED,
            28 => PAM_MODULE_UNKNOWN,
            29 => PAM_BAD_ITEM,
            30 => PAM_CONV_AGAIN,
            31 => PAM_INCOMPLETE,
            _ => PAM_SYSTEM_ERR,
        }
    }
}

pub type PamResult<T> = Result<T, PamResultCode>;

/// Opaque type, used as a pointer when making pam API calls.
///
/// `pam_start` hands out a pointer to this type. The same pointer must be given
/// as an argument to every later call of the transaction, up to `pam_end`.
#[repr(C)]
pub struct PamHandle {
    _data: [u8; 0],
}

/// Raw libpam application API.
///
/// Statuses are returned as plain `c_int` and mapped with [`PamResultCode::from_raw`]
/// by the caller.
#[cfg(feature = "libpam")]
pub mod ffi {
    use libc::{c_char, c_int, c_void};

    use crate::conv::PamConv;
    use crate::PamHandle;

    #[link(name = "pam")]
    extern "C" {
        pub fn pam_start(
            service_name: *const c_char,
            user: *const c_char,
            pam_conversation: *const PamConv,
            pamh: *mut *mut PamHandle,
        ) -> c_int;
        pub fn pam_end(pamh: *mut PamHandle, pam_status: c_int) -> c_int;
        pub fn pam_authenticate(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_setcred(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_acct_mgmt(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_chauthtok(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_open_session(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_close_session(pamh: *mut PamHandle, flags: c_int) -> c_int;
        pub fn pam_set_item(pamh: *mut PamHandle, item_type: c_int, item: *const c_void) -> c_int;
        pub fn pam_get_item(
            pamh: *const PamHandle,
            item_type: c_int,
            item: *mut *const c_void,
        ) -> c_int;
        pub fn pam_strerror(pamh: *mut PamHandle, errnum: c_int) -> *const c_char;
        pub fn pam_putenv(pamh: *mut PamHandle, name_value: *const c_char) -> c_int;
        pub fn pam_getenv(pamh: *mut PamHandle, name: *const c_char) -> *const c_char;
        pub fn pam_getenvlist(pamh: *mut PamHandle) -> *mut *mut c_char;
    }
}
