//! # Transaction Module
//!
//! The `transaction` module starts and drives a PAM transaction through the system libpam.
//! It is only built with the `libpam` feature.
//!
//! ## Overview
//!
//! `Transaction::start` registers the conversation handler, builds the conversation descriptor
//! for its handle and calls `pam_start`. The descriptor is boxed, because libpam keeps a
//! pointer to it for the whole transaction. Dropping the transaction calls `pam_end` with the
//! last status and then releases the handler.
//!
//! ```no_run
//! use common::handler::Credentials;
//! use common::transaction::Transaction;
//!
//! let mut tx = Transaction::start("login", Some("alice"), Credentials::new("alice", "hunter2"))?;
//! tx.authenticate(pam::PAM_NONE)?;
//! tx.acct_mgmt(pam::PAM_NONE)?;
//! # Ok::<(), pam::PamResultCode>(())
//! ```
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

use libc::{c_char, c_int, c_void};
use pam::conv::PamConv;
use pam::ffi;
use pam::items::ItemType;
use pam::{PamFlag, PamHandle, PamResult, PamResultCode};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::ptr;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::handler::ConversationHandler;
use crate::registry::{self, Registration};
use crate::{log_error, log_info};

const SUCCESS: c_int = PamResultCode::PAM_SUCCESS as c_int;

/// The application's handle for a PAM transaction.
pub struct Transaction {
    handle: *mut PamHandle,
    status: c_int,
    // libpam points at this descriptor until pam_end.
    _conv: Box<PamConv>,
    registration: Registration,
}

impl Transaction {
    /// Starts a transaction for `service`, answering its conversation with `handler`.
    ///
    /// `user` may be `None` (or empty) to let the modules ask for it.
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_start`, or `PAM_BUF_ERR` when `service` or `user` contains a
    /// NUL byte.
    pub fn start<H: ConversationHandler + 'static>(
        service: &str,
        user: Option<&str>,
        handler: H,
    ) -> PamResult<Transaction> {
        let service_c = CString::new(service).map_err(|_| PamResultCode::PAM_BUF_ERR)?;
        let user_c = user
            .filter(|user| !user.is_empty())
            .map(CString::new)
            .transpose()
            .map_err(|_| PamResultCode::PAM_BUF_ERR)?;

        let registration = registry::register(handler);
        let conv = Box::new(registration.conv());

        let mut handle: *mut PamHandle = ptr::null_mut();
        let status = unsafe {
            ffi::pam_start(
                service_c.as_ptr(),
                user_c.as_ref().map_or(ptr::null(), |user| user.as_ptr()),
                &*conv,
                &mut handle,
            )
        };

        if status != SUCCESS {
            log_error!(
                "{:?}: cannot start transaction for service {}",
                PamResultCode::from_raw(status),
                service
            );
            if !handle.is_null() {
                unsafe { ffi::pam_end(handle, status) };
            }
            return Err(PamResultCode::from_raw(status));
        }

        log_info!(
            "started transaction {} for service {}",
            registration.handle(),
            service
        );

        Ok(Transaction {
            handle,
            status,
            _conv: conv,
            registration,
        })
    }

    /// Starts a transaction for the service named in `config`.
    ///
    /// # Errors
    ///
    /// See [`Transaction::start`].
    pub fn start_with_config<H: ConversationHandler + 'static>(
        config: &Config,
        user: Option<&str>,
        handler: H,
    ) -> PamResult<Transaction> {
        Transaction::start(&config.service, user, handler)
    }

    /// Status of the last libpam call.
    #[must_use]
    pub fn status(&self) -> PamResultCode {
        PamResultCode::from_raw(self.status)
    }

    /// Human readable description of the last status, from `pam_strerror`.
    #[must_use]
    pub fn describe(&self) -> String {
        let text = unsafe { ffi::pam_strerror(self.handle, self.status) };
        if text.is_null() {
            format!("{:?}", self.status())
        } else {
            unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
        }
    }

    fn check(&mut self, status: c_int) -> PamResult<()> {
        self.status = status;
        if status == SUCCESS {
            Ok(())
        } else {
            Err(PamResultCode::from_raw(status))
        }
    }

    /// Authenticates the user.
    ///
    /// Valid flags: `PAM_SILENT`, `PAM_DISALLOW_NULL_AUTHTOK`
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_authenticate`.
    pub fn authenticate(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_authenticate(self.handle, raw_flags(flags)) };
        let result = self.check(status);
        if let Err(code) = result {
            log_info!(
                "{:?}: authentication failed in transaction {}",
                code,
                self.registration.handle()
            );
        }
        result
    }

    /// Establishes, maintains or deletes the credentials of the user.
    ///
    /// Valid flags: `PAM_ESTABLISH_CRED`, `PAM_DELETE_CRED`, `PAM_REINITIALIZE_CRED`,
    /// `PAM_REFRESH_CRED`
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_setcred`.
    pub fn set_cred(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_setcred(self.handle, raw_flags(flags)) };
        self.check(status)
    }

    /// Determines whether the account is valid.
    ///
    /// Valid flags: `PAM_SILENT`, `PAM_DISALLOW_NULL_AUTHTOK`
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_acct_mgmt`.
    pub fn acct_mgmt(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_acct_mgmt(self.handle, raw_flags(flags)) };
        self.check(status)
    }

    /// Changes the authentication token.
    ///
    /// Valid flags: `PAM_SILENT`, `PAM_CHANGE_EXPIRED_AUTHTOK`
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_chauthtok`.
    pub fn chauthtok(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_chauthtok(self.handle, raw_flags(flags)) };
        self.check(status)
    }

    /// Sets up a session for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_open_session`.
    pub fn open_session(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_open_session(self.handle, raw_flags(flags)) };
        self.check(status)
    }

    /// Closes a previously opened session.
    ///
    /// # Errors
    ///
    /// Returns the status of `pam_close_session`.
    pub fn close_session(&mut self, flags: PamFlag) -> PamResult<()> {
        let status = unsafe { ffi::pam_close_session(self.handle, raw_flags(flags)) };
        self.check(status)
    }

    /// Sets a string item. libpam keeps its own copy.
    ///
    /// # Errors
    ///
    /// Returns `PAM_BAD_ITEM` for `ItemType::Conv`, `PAM_BUF_ERR` when `value` contains a NUL
    /// byte, or the status of `pam_set_item`.
    pub fn set_item(&mut self, item: ItemType, value: &str) -> PamResult<()> {
        if !item.is_string() {
            return Err(PamResultCode::PAM_BAD_ITEM);
        }
        if value.as_bytes().contains(&0) {
            return Err(PamResultCode::PAM_BUF_ERR);
        }

        // Sized up front so the secret is never reallocated.
        let mut bytes = Zeroizing::new(Vec::with_capacity(value.len() + 1));
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);

        let status = unsafe {
            ffi::pam_set_item(self.handle, item.as_raw(), bytes.as_ptr().cast::<c_void>())
        };
        self.check(status)
    }

    /// Reads a string item.
    ///
    /// # Errors
    ///
    /// Returns `PAM_BAD_ITEM` for `ItemType::Conv`, or the status of `pam_get_item`.
    pub fn get_item(&mut self, item: ItemType) -> PamResult<Option<String>> {
        if !item.is_string() {
            return Err(PamResultCode::PAM_BAD_ITEM);
        }

        let mut value: *const c_void = ptr::null();
        let status = unsafe { ffi::pam_get_item(self.handle, item.as_raw(), &mut value) };
        self.check(status)?;

        Ok((!value.is_null()).then(|| {
            unsafe { CStr::from_ptr(value.cast::<c_char>()) }
                .to_string_lossy()
                .into_owned()
        }))
    }

    /// Adds, changes or deletes a PAM environment variable.
    ///
    /// `NAME=value` sets a variable, `NAME=` sets it to an empty value and `NAME` deletes it.
    ///
    /// # Errors
    ///
    /// Returns `PAM_BUF_ERR` when `name_value` contains a NUL byte, or the status of
    /// `pam_putenv`.
    pub fn put_env(&mut self, name_value: &str) -> PamResult<()> {
        let name_value = CString::new(name_value).map_err(|_| PamResultCode::PAM_BUF_ERR)?;
        let status = unsafe { ffi::pam_putenv(self.handle, name_value.as_ptr()) };
        self.check(status)
    }

    /// Retrieves a PAM environment variable.
    #[must_use]
    pub fn get_env(&self, name: &str) -> Option<String> {
        let name = CString::new(name).ok()?;
        let value = unsafe { ffi::pam_getenv(self.handle, name.as_ptr()) };
        (!value.is_null())
            .then(|| unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
    }

    /// Returns a copy of the PAM environment.
    ///
    /// # Errors
    ///
    /// Returns `PAM_BUF_ERR` when libpam cannot build the list.
    pub fn get_env_list(&mut self) -> PamResult<HashMap<String, String>> {
        let list = unsafe { ffi::pam_getenvlist(self.handle) };
        if list.is_null() {
            self.status = PamResultCode::PAM_BUF_ERR as c_int;
            return Err(PamResultCode::PAM_BUF_ERR);
        }

        let mut env = HashMap::new();
        let mut cursor = list;
        unsafe {
            while !(*cursor).is_null() {
                let entry = CStr::from_ptr(*cursor).to_string_lossy().into_owned();
                if let Some((name, value)) = entry.split_once('=') {
                    env.insert(name.to_string(), value.to_string());
                }
                libc::free((*cursor).cast());
                cursor = cursor.add(1);
            }
            libc::free(list.cast());
        }
        Ok(env)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        unsafe { ffi::pam_end(self.handle, self.status) };
    }
}

#[allow(clippy::cast_possible_wrap)]
fn raw_flags(flags: PamFlag) -> c_int {
    flags as c_int
}
