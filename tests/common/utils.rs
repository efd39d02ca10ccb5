//! # Test Utilities Module
//!
//! The `utils` module drives a conversation descriptor the way libpam does: it lays out the
//! message pointer array in C form, calls the descriptor's function directly and reads back the
//! response array.
//!
//! ## Response Ownership
//!
//! On success the response array and every answer in it belong to the caller. `take_answers`
//! copies the answers out and frees all of it with `libc::free`, like libpam would.
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

use std::ffi::{CStr, CString};
use std::ptr;

use libc::c_int;
use pamconv::{PamConv, PamMessage, PamMessageStyle, PamResponse, PamResultCode};

/// Calls the conversation function of `conv` with `messages`, as libpam would.
pub fn call_raw(
    conv: &PamConv,
    messages: &[(PamMessageStyle, &str)],
) -> (PamResultCode, *mut PamResponse) {
    let texts: Vec<CString> = messages
        .iter()
        .map(|&(_, text)| CString::new(text).unwrap())
        .collect();
    let records: Vec<PamMessage> = messages
        .iter()
        .zip(&texts)
        .map(|(&(style, _), text)| PamMessage {
            msg_style: style,
            msg: text.as_ptr(),
        })
        .collect();
    let pointers: Vec<*const PamMessage> = records.iter().map(ptr::from_ref).collect();

    let mut resp: *mut PamResponse = ptr::null_mut();
    let code = unsafe {
        (conv.callback())(
            c_int::try_from(pointers.len()).unwrap(),
            pointers.as_ptr(),
            &mut resp,
            conv.handle() as *mut libc::c_void,
        )
    };
    (code, resp)
}

/// Copies the answers out of a response array and frees it.
pub fn take_answers(resp: *mut PamResponse, count: usize) -> Vec<Option<String>> {
    assert!(!resp.is_null());

    let answers = (0..count)
        .map(|i| unsafe {
            let entry = &*resp.add(i);
            assert_eq!(entry.resp_retcode, 0);
            if entry.resp.is_null() {
                return None;
            }
            let answer = CStr::from_ptr(entry.resp).to_string_lossy().into_owned();
            libc::free(entry.resp.cast());
            Some(answer)
        })
        .collect();

    unsafe { libc::free(resp.cast()) };
    answers
}
