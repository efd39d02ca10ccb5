//! # Registry Module
//!
//! The `registry` module maps correlation handles to conversation handlers.
//!
//! ## Overview
//!
//! libpam calls the conversation function with nothing but an untyped `appdata_ptr`. Instead of
//! smuggling a pointer to a Rust object through it, the application registers its handler here
//! and passes the returned integer handle. The conversation bridge relays that handle to
//! `RegistryResponder`, which looks the handler up again.
//!
//! Handles start at 1 and are never reused while registered. `Registration` removes its entry
//! when dropped.
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

use libc::c_char;
use pam::conv::{PamConv, Responder};
use pam::{CorrelationHandle, PamMessageStyle, PamResult, PamResultCode};
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use zeroize::Zeroizing;

use crate::handler::{ConversationHandler, Style};
use crate::{log_debug, log_error};

struct Table {
    next: CorrelationHandle,
    handlers: BTreeMap<CorrelationHandle, Arc<dyn ConversationHandler>>,
}

static TABLE: Mutex<Table> = Mutex::new(Table {
    next: 1,
    handlers: BTreeMap::new(),
});

// Handlers run outside the lock, so a poisoned table is still consistent.
fn table() -> MutexGuard<'static, Table> {
    TABLE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adds `handler` to the registry and returns its handle.
///
/// The entry stays until [`unregister`] is called with the handle.
pub fn register_raw(handler: Arc<dyn ConversationHandler>) -> CorrelationHandle {
    let mut table = table();

    let mut handle = table.next;
    while handle == 0 || table.handlers.contains_key(&handle) {
        handle = handle.wrapping_add(1);
    }
    table.next = handle.wrapping_add(1);
    table.handlers.insert(handle, handler);

    log_debug!("registered conversation handler {}", handle);
    handle
}

/// Removes the handler registered under `handle`. Returns whether there was one.
pub fn unregister(handle: CorrelationHandle) -> bool {
    // The handler is dropped after the lock is released.
    let handler = table().handlers.remove(&handle);
    if handler.is_some() {
        log_debug!("unregistered conversation handler {}", handle);
    }
    handler.is_some()
}

/// Returns the handler registered under `handle`.
#[must_use]
pub fn lookup(handle: CorrelationHandle) -> Option<Arc<dyn ConversationHandler>> {
    table().handlers.get(&handle).cloned()
}

/// Number of registered handlers.
#[must_use]
pub fn len() -> usize {
    table().handlers.len()
}

/// Registers `handler` for as long as the returned `Registration` lives.
pub fn register<H: ConversationHandler + 'static>(handler: H) -> Registration {
    Registration {
        handle: register_raw(Arc::new(handler)),
    }
}

/// A registered handler. Dropping it unregisters the handler.
#[derive(Debug)]
pub struct Registration {
    handle: CorrelationHandle,
}

impl Registration {
    #[must_use]
    pub fn handle(&self) -> CorrelationHandle {
        self.handle
    }

    /// Conversation descriptor that routes every message to this handler.
    #[must_use]
    pub fn conv(&self) -> PamConv {
        PamConv::new::<RegistryResponder>(self.handle)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        unregister(self.handle);
    }
}

/// Responds to conversation messages with the handler registered under the handle.
///
/// Answers are copied into `malloc` memory, the allocator libpam frees responses with.
pub struct RegistryResponder;

impl Responder for RegistryResponder {
    fn respond(
        style: PamMessageStyle,
        msg: &CStr,
        handle: CorrelationHandle,
    ) -> PamResult<Option<NonNull<c_char>>> {
        let Some(handler) = lookup(handle) else {
            log_error!("PAM_CONV_ERR: no conversation handler {}", handle);
            return Err(PamResultCode::PAM_CONV_ERR);
        };

        let style = Style::try_from(style).map_err(|code| {
            log_error!("{:?}: unsupported message style {}", code, style);
            code
        })?;

        let answer = handler.respond(style, &msg.to_string_lossy())?;
        answer.map(|answer| into_native(&Zeroizing::new(answer))).transpose()
    }
}

/// Copies `answer` into a NUL-terminated `malloc` buffer.
fn into_native(answer: &str) -> PamResult<NonNull<c_char>> {
    let bytes = answer.as_bytes();
    if bytes.contains(&0) {
        return Err(PamResultCode::PAM_CONV_ERR);
    }

    let native = NonNull::new(unsafe { libc::malloc(bytes.len() + 1) }.cast::<c_char>())
        .ok_or(PamResultCode::PAM_BUF_ERR)?;

    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), native.as_ptr().cast::<u8>(), bytes.len());
        *native.as_ptr().add(bytes.len()) = 0;
    }
    Ok(native)
}
