//! # PAM conversation module
//!
//! This module provides the application side of the PAM conversation.
//!
//! The PAM conversation function is a callback provided by the application, which is used
//! by the PAM library to communicate with the user. This can include prompting for a password,
//! displaying error messages, or any other interaction with the user.
//!
//! The conversation function is provided to the PAM library by the application in the `pam_conv`
//! structure, which is passed to `pam_start`. Here that structure is [`PamConv`], its function
//! pointer is always the generic bridge [`converse`], and its `appdata_ptr` carries a
//! [`CorrelationHandle`] that the bridge relays, uninterpreted, to a [`Responder`].
//!
//! ## Memory ownership
//!
//! - Message texts belong to the caller and are only borrowed for the duration of one call.
//! - Every response text is allocated by the `Responder` with the allocator whose `free` the
//!   caller will use (`libc::malloc`/`libc::free` by default).
//! - On success the response array and all its texts belong to the caller.
//! - On failure the bridge zeroes and releases every text it collected and then the array
//!   itself. `*resp` is left null.
//!
//! [`Conv`] drives a descriptor the way a PAM module does, which is handy to exercise a
//! conversation without a PAM stack.
//!
//! ## License
//!
//! Copyright 2023 34n0
//!
//! Use of this source code is governed by an MIT-style
//! license that can be found in the LICENSE file or at
//! https://opensource.org/licenses/MIT.

use libc::{c_char, c_int, c_void};
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::{mem, slice};
use zeroize::{Zeroize, Zeroizing};

use crate::{CorrelationHandle, PamMessageStyle, PamResult, PamResultCode, PAM_MAX_NUM_MSG};

#[repr(C)]
#[derive(Debug)]
pub struct PamMessage {
    pub msg_style: PamMessageStyle,
    pub msg: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct PamResponse {
    pub resp: *mut c_char,
    pub resp_retcode: c_int, // Unused - always zero
}

/// Signature of a conversation function as libpam calls it.
pub type ConvFn = unsafe extern "C" fn(
    num_msg: c_int,
    msg: *const *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut c_void,
) -> PamResultCode;

/// The `pam_conv` structure handed to `pam_start`.
///
/// It pairs the bridge function with the correlation handle of one transaction and is never
/// mutated once built.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PamConv {
    conv: ConvFn,
    appdata_ptr: *mut c_void,
}

/// Answers conversation messages on behalf of the bridge.
///
/// `respond` is called once per message, in order. A returned buffer must come from the same
/// allocator that `release` hands memory back to, since on success the PAM library frees it
/// with its own `free`.
pub trait Responder {
    /// Produces the answer to one message.
    ///
    /// `Ok(None)` stands for "no reply", which is what display-only styles expect.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole conversation with `PAM_CONV_ERR`.
    fn respond(
        style: PamMessageStyle,
        msg: &CStr,
        handle: CorrelationHandle,
    ) -> PamResult<Option<NonNull<c_char>>>;

    /// Allocates a zero-initialised array of `count` responses, or returns null.
    ///
    /// # Safety
    ///
    /// The returned memory must be releasable with [`Responder::release`].
    unsafe fn alloc_responses(count: usize) -> *mut PamResponse {
        unsafe { libc::calloc(count, mem::size_of::<PamResponse>()).cast() }
    }

    /// Releases memory obtained from this responder.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Responder::alloc_responses`] or [`Responder::respond`] and must
    /// not be used afterwards.
    unsafe fn release(ptr: *mut c_void) {
        unsafe { libc::free(ptr) }
    }
}

impl PamConv {
    /// Builds a descriptor wired to [`converse`] for `R`, carrying `handle` as user data.
    #[must_use]
    pub fn new<R: Responder>(handle: CorrelationHandle) -> Self {
        PamConv {
            conv: converse::<R>,
            appdata_ptr: handle as *mut c_void,
        }
    }

    #[must_use]
    pub fn handle(&self) -> CorrelationHandle {
        self.appdata_ptr as CorrelationHandle
    }

    #[must_use]
    pub fn callback(&self) -> ConvFn {
        self.conv
    }
}

/// Writes a descriptor for `R` and `handle` into caller provided storage.
pub fn init_pam_conv<R: Responder>(conv: &mut PamConv, handle: CorrelationHandle) {
    *conv = PamConv::new::<R>(handle);
}

/// The conversation function registered with libpam.
///
/// Collects one answer per message from `R`, returning them in a response array owned by the
/// caller. Returns `PAM_CONV_ERR` when the message count is outside `1..=PAM_MAX_NUM_MSG`, when
/// `msg` or `resp` is null, or when `R` fails on any message. Returns `PAM_BUF_ERR` when the
/// response array cannot be allocated. On every error `*resp` is null and nothing stays
/// allocated.
///
/// # Safety
///
/// `msg` must point to `num_msg` pointers to valid messages whose texts are NUL-terminated
/// or null, and `resp` must be valid for a pointer write.
pub unsafe extern "C" fn converse<R: Responder>(
    num_msg: c_int,
    msg: *const *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut c_void,
) -> PamResultCode {
    if !resp.is_null() {
        unsafe { *resp = ptr::null_mut() };
    }

    if num_msg <= 0 || num_msg > PAM_MAX_NUM_MSG {
        log::debug!("conversation rejected: {num_msg} messages");
        return PamResultCode::PAM_CONV_ERR;
    }

    if msg.is_null() || resp.is_null() {
        log::warn!("conversation rejected: null message or response array");
        return PamResultCode::PAM_CONV_ERR;
    }

    let count = crate::pam_try!(usize::try_from(num_msg), PamResultCode::PAM_CONV_ERR);
    let handle = appdata_ptr as CorrelationHandle;

    let responses = unsafe { R::alloc_responses(count) };
    if responses.is_null() {
        log::error!("conversation aborted: cannot allocate {count} responses");
        return PamResultCode::PAM_BUF_ERR;
    }

    for i in 0..count {
        let message = unsafe { *msg.add(i) };
        let answer = if message.is_null() {
            Err(PamResultCode::PAM_CONV_ERR)
        } else {
            let message = unsafe { &*message };
            let text = if message.msg.is_null() {
                <&CStr>::default()
            } else {
                unsafe { CStr::from_ptr(message.msg) }
            };
            panic::catch_unwind(AssertUnwindSafe(|| {
                R::respond(message.msg_style, text, handle)
            }))
            .unwrap_or(Err(PamResultCode::PAM_CONV_ERR))
        };

        match answer {
            Ok(text) => unsafe {
                (*responses.add(i)).resp = text.map_or(ptr::null_mut(), NonNull::as_ptr);
            },
            Err(code) => {
                log::debug!("conversation aborted at message {}: {code:?}", i + 1);
                unsafe { discard_responses::<R>(responses, count) };
                return PamResultCode::PAM_CONV_ERR;
            }
        }
    }

    unsafe { *resp = responses };
    PamResultCode::PAM_SUCCESS
}

/// Zeroes and releases every collected text, then the array itself.
unsafe fn discard_responses<R: Responder>(responses: *mut PamResponse, count: usize) {
    let entries = unsafe { slice::from_raw_parts_mut(responses, count) };
    for entry in entries.iter_mut() {
        if !entry.resp.is_null() {
            unsafe {
                wipe_c_str(entry.resp);
                R::release(entry.resp.cast());
            }
            entry.resp = ptr::null_mut();
        }
    }

    unsafe {
        slice::from_raw_parts_mut(responses.cast::<u8>(), count * mem::size_of::<PamResponse>())
    }
    .zeroize();
    unsafe { R::release(responses.cast()) };
}

/// Overwrites a NUL-terminated buffer with zero bytes, up to its terminator.
///
/// # Safety
///
/// `text` must point to a writable, NUL-terminated buffer.
pub unsafe fn wipe_c_str(text: *mut c_char) {
    let len = unsafe { libc::strlen(text) };
    unsafe { slice::from_raw_parts_mut(text.cast::<u8>(), len) }.zeroize();
}

/// `Conv` drives a conversation descriptor the way a PAM module does.
///
/// Responses are copied out and then wiped and freed with `libc::free`, so it pairs with
/// responders that keep the default allocator.
pub struct Conv<'a>(&'a PamConv);

impl<'a> Conv<'a> {
    #[must_use]
    pub fn new(conv: &'a PamConv) -> Self {
        Conv(conv)
    }

    /// Sends a single message to the conversation function.
    ///
    /// This will typically result in the user seeing a message or a prompt.
    /// There are several message styles available:
    ///
    /// - `PAM_PROMPT_ECHO_OFF`
    /// - `PAM_PROMPT_ECHO_ON`
    /// - `PAM_ERROR_MSG`
    /// - `PAM_TEXT_INFO`
    /// - `PAM_RADIO_TYPE`
    /// - `PAM_BINARY_PROMPT`
    ///
    /// # Errors
    ///
    /// Returns the status of the conversation function when it is not `PAM_SUCCESS`, and
    /// `PAM_CONV_ERR` when `msg` contains a NUL byte.
    pub fn send(&self, style: PamMessageStyle, msg: &str) -> PamResult<Option<Zeroizing<String>>> {
        let mut answers = self.converse(&[(style, msg)])?;
        Ok(answers.pop().flatten())
    }

    /// Sends all `messages` in one conversation call and collects the answers by position.
    ///
    /// # Errors
    ///
    /// Returns the status of the conversation function when it is not `PAM_SUCCESS`, and
    /// `PAM_CONV_ERR` when a message contains a NUL byte.
    pub fn converse(
        &self,
        messages: &[(PamMessageStyle, &str)],
    ) -> PamResult<Vec<Option<Zeroizing<String>>>> {
        let texts = messages
            .iter()
            .map(|&(_, text)| CString::new(text))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| PamResultCode::PAM_CONV_ERR)?;

        let records: Vec<PamMessage> = messages
            .iter()
            .zip(&texts)
            .map(|(&(style, _), text)| PamMessage {
                msg_style: style,
                msg: text.as_ptr(),
            })
            .collect();
        let pointers: Vec<*const PamMessage> = records.iter().map(ptr::from_ref).collect();
        let num_msg = c_int::try_from(pointers.len()).map_err(|_| PamResultCode::PAM_CONV_ERR)?;

        let mut resp_ptr: *mut PamResponse = ptr::null_mut();
        let ret = unsafe {
            (self.0.conv)(
                num_msg,
                pointers.as_ptr(),
                &mut resp_ptr,
                self.0.appdata_ptr,
            )
        };

        if ret != PamResultCode::PAM_SUCCESS {
            return Err(ret);
        }
        if resp_ptr.is_null() {
            return Err(PamResultCode::PAM_CONV_ERR);
        }

        Ok(unsafe { take_responses(resp_ptr, pointers.len()) })
    }
}

/// Copies out and frees a response array handed over by a conversation function.
unsafe fn take_responses(
    responses: *mut PamResponse,
    count: usize,
) -> Vec<Option<Zeroizing<String>>> {
    let entries = unsafe { slice::from_raw_parts_mut(responses, count) };
    let answers = entries
        .iter_mut()
        .map(|entry| {
            // PamResponse.resp is null for styles that don't return user input like PAM_TEXT_INFO
            if entry.resp.is_null() {
                return None;
            }
            let answer = unsafe { CStr::from_ptr(entry.resp) }
                .to_string_lossy()
                .into_owned();
            unsafe {
                wipe_c_str(entry.resp);
                libc::free(entry.resp.cast());
            }
            entry.resp = ptr::null_mut();
            Some(Zeroizing::new(answer))
        })
        .collect();

    unsafe { libc::free(responses.cast()) };
    answers
}

// Unit Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PAM_ERROR_MSG, PAM_PROMPT_ECHO_OFF, PAM_PROMPT_ECHO_ON, PAM_TEXT_INFO};
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    thread_local! {
        // (style, text, handle) of every respond call on this thread
        static CALLS: RefCell<Vec<(PamMessageStyle, String, CorrelationHandle)>> =
            const { RefCell::new(Vec::new()) };
        // answers handed out by `Scripted`, consumed front to back
        static SCRIPT: RefCell<Vec<PamResult<Option<&'static str>>>> =
            const { RefCell::new(Vec::new()) };
        // address -> byte length of every live allocation made by `Scripted`
        static LIVE: RefCell<BTreeMap<usize, usize>> = const { RefCell::new(BTreeMap::new()) };
        // (length, all bytes zero) of every release made by `Scripted`
        static RELEASED: RefCell<Vec<(usize, bool)>> = const { RefCell::new(Vec::new()) };
        static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    }

    fn reset() {
        CALLS.with_borrow_mut(Vec::clear);
        SCRIPT.with_borrow_mut(Vec::clear);
        LIVE.with_borrow_mut(BTreeMap::clear);
        RELEASED.with_borrow_mut(Vec::clear);
        ALLOCATIONS.set(0);
    }

    fn record(style: PamMessageStyle, msg: &CStr, handle: CorrelationHandle) {
        CALLS.with_borrow_mut(|calls| {
            calls.push((style, msg.to_string_lossy().into_owned(), handle));
        });
    }

    fn calls() -> Vec<(PamMessageStyle, String, CorrelationHandle)> {
        CALLS.with_borrow(Clone::clone)
    }

    fn strdup(text: &CStr) -> NonNull<c_char> {
        NonNull::new(unsafe { libc::strdup(text.as_ptr()) }).expect("strdup failed")
    }

    /// Answers every prompt with a copy of its text and nothing for the other styles.
    struct Echo;

    impl Responder for Echo {
        fn respond(
            style: PamMessageStyle,
            msg: &CStr,
            handle: CorrelationHandle,
        ) -> PamResult<Option<NonNull<c_char>>> {
            record(style, msg, handle);
            match style {
                PAM_PROMPT_ECHO_ON | PAM_PROMPT_ECHO_OFF => Ok(Some(strdup(msg))),
                _ => Ok(None),
            }
        }
    }

    /// Plays back `SCRIPT` and tracks every allocation and release.
    struct Scripted;

    impl Scripted {
        fn load(script: Vec<PamResult<Option<&'static str>>>) {
            SCRIPT.set(script);
        }

        fn track(ptr: *mut c_void, len: usize) {
            LIVE.with_borrow_mut(|live| live.insert(ptr as usize, len));
            ALLOCATIONS.set(ALLOCATIONS.get() + 1);
        }

        fn live() -> usize {
            LIVE.with_borrow(BTreeMap::len)
        }

        fn released() -> Vec<(usize, bool)> {
            RELEASED.with_borrow(Clone::clone)
        }
    }

    impl Responder for Scripted {
        fn respond(
            style: PamMessageStyle,
            msg: &CStr,
            handle: CorrelationHandle,
        ) -> PamResult<Option<NonNull<c_char>>> {
            record(style, msg, handle);
            let next = SCRIPT.with_borrow_mut(|script| script.remove(0));
            match next? {
                Some(answer) => {
                    let answer = CString::new(answer).unwrap();
                    let copy = strdup(&answer);
                    Scripted::track(copy.as_ptr().cast(), answer.as_bytes().len());
                    Ok(Some(copy))
                }
                None => Ok(None),
            }
        }

        unsafe fn alloc_responses(count: usize) -> *mut PamResponse {
            let responses = unsafe { libc::calloc(count, mem::size_of::<PamResponse>()) };
            Scripted::track(responses, count * mem::size_of::<PamResponse>());
            responses.cast()
        }

        unsafe fn release(ptr: *mut c_void) {
            let len = LIVE
                .with_borrow_mut(|live| live.remove(&(ptr as usize)))
                .expect("release of untracked memory");
            let bytes = unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) };
            let zeroed = bytes.iter().all(|&b| b == 0);
            RELEASED.with_borrow_mut(|released| released.push((len, zeroed)));
            unsafe { libc::free(ptr) };
        }
    }

    /// Cannot allocate a response array.
    struct OutOfMemory;

    impl Responder for OutOfMemory {
        fn respond(
            style: PamMessageStyle,
            msg: &CStr,
            handle: CorrelationHandle,
        ) -> PamResult<Option<NonNull<c_char>>> {
            record(style, msg, handle);
            Ok(None)
        }

        unsafe fn alloc_responses(_count: usize) -> *mut PamResponse {
            ALLOCATIONS.set(ALLOCATIONS.get() + 1);
            ptr::null_mut()
        }
    }

    struct Panicking;

    impl Responder for Panicking {
        fn respond(
            _style: PamMessageStyle,
            _msg: &CStr,
            _handle: CorrelationHandle,
        ) -> PamResult<Option<NonNull<c_char>>> {
            panic!("handler blew up");
        }
    }

    /// Owns the C side of a batch of messages for direct calls into `converse`.
    struct Messages {
        _texts: Vec<CString>,
        records: Vec<PamMessage>,
    }

    impl Messages {
        fn new(messages: &[(PamMessageStyle, &str)]) -> Self {
            let texts: Vec<CString> = messages
                .iter()
                .map(|&(_, text)| CString::new(text).unwrap())
                .collect();
            let records = messages
                .iter()
                .zip(&texts)
                .map(|(&(style, _), text)| PamMessage {
                    msg_style: style,
                    msg: text.as_ptr(),
                })
                .collect();
            Messages {
                _texts: texts,
                records,
            }
        }

        fn pointers(&self) -> Vec<*const PamMessage> {
            self.records.iter().map(ptr::from_ref).collect()
        }
    }

    fn call(
        conv: &PamConv,
        num_msg: c_int,
        messages: &[*const PamMessage],
    ) -> (PamResultCode, *mut PamResponse) {
        let mut resp: *mut PamResponse = 0x1 as *mut PamResponse;
        let ret =
            unsafe { (conv.callback())(num_msg, messages.as_ptr(), &mut resp, conv.appdata_ptr) };
        (ret, resp)
    }

    fn read_answers(resp: *mut PamResponse, count: usize) -> Vec<Option<String>> {
        let entries = unsafe { slice::from_raw_parts(resp, count) };
        entries
            .iter()
            .map(|entry| {
                assert_eq!(entry.resp_retcode, 0);
                (!entry.resp.is_null())
                    .then(|| unsafe { CStr::from_ptr(entry.resp) }.to_string_lossy().into_owned())
            })
            .collect()
    }

    fn release_all<R: Responder>(resp: *mut PamResponse, count: usize) {
        let entries = unsafe { slice::from_raw_parts(resp, count) };
        for entry in entries {
            if !entry.resp.is_null() {
                unsafe { R::release(entry.resp.cast()) };
            }
        }
        unsafe { R::release(resp.cast()) };
    }

    #[test]
    fn test_rejects_out_of_bounds_counts() {
        reset();
        let conv = PamConv::new::<Scripted>(3);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_ON, "login:")]);
        let pointers = messages.pointers();

        for num_msg in [0, -1, c_int::MIN, PAM_MAX_NUM_MSG + 1, c_int::MAX] {
            let (ret, resp) = call(&conv, num_msg, &pointers);
            assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
            assert!(resp.is_null());
        }

        assert!(calls().is_empty());
        assert_eq!(ALLOCATIONS.get(), 0);
    }

    #[test]
    fn test_rejects_null_arrays() {
        reset();
        let conv = PamConv::new::<Scripted>(3);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_ON, "login:")]);
        let pointers = messages.pointers();
        let mut resp: *mut PamResponse = ptr::null_mut();

        let ret = unsafe { converse::<Scripted>(1, ptr::null(), &mut resp, conv.appdata_ptr) };
        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
        assert!(resp.is_null());

        let ret = unsafe {
            converse::<Scripted>(1, pointers.as_ptr(), ptr::null_mut(), conv.appdata_ptr)
        };
        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);

        assert!(calls().is_empty());
        assert_eq!(ALLOCATIONS.get(), 0);
    }

    #[test]
    fn test_allocation_failure_is_buffer_error() {
        reset();
        let conv = PamConv::new::<OutOfMemory>(9);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_OFF, "Password: ")]);

        let (ret, resp) = call(&conv, 1, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_BUF_ERR);
        assert!(resp.is_null());
        assert_eq!(ALLOCATIONS.get(), 1);
        assert!(calls().is_empty());
    }

    #[test]
    fn test_secret_prompt_round_trip() {
        reset();
        Scripted::load(vec![Ok(Some("hunter2"))]);
        let conv = PamConv::new::<Scripted>(42);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_OFF, "Password: ")]);

        let (ret, resp) = call(&conv, 1, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_SUCCESS);
        assert!(!resp.is_null());
        assert_eq!(read_answers(resp, 1), vec![Some("hunter2".to_string())]);
        assert_eq!(
            calls(),
            vec![(PAM_PROMPT_ECHO_OFF, "Password: ".to_string(), 42)]
        );

        release_all::<Scripted>(resp, 1);
        assert_eq!(Scripted::live(), 0);
    }

    #[test]
    fn test_every_count_up_to_the_ceiling() {
        reset();
        let conv = PamConv::new::<Echo>(1);

        for n in 1..=PAM_MAX_NUM_MSG {
            let texts: Vec<String> = (0..n).map(|i| format!("prompt {i}")).collect();
            let batch: Vec<(PamMessageStyle, &str)> = texts
                .iter()
                .map(|text| (PAM_PROMPT_ECHO_ON, text.as_str()))
                .collect();
            let messages = Messages::new(&batch);

            let (ret, resp) = call(&conv, n, &messages.pointers());
            assert_eq!(ret, PamResultCode::PAM_SUCCESS);

            let count = usize::try_from(n).unwrap();
            let expected: Vec<Option<String>> = texts.iter().cloned().map(Some).collect();
            assert_eq!(read_answers(resp, count), expected);
            release_all::<Echo>(resp, count);
        }

        let total: c_int = (1..=PAM_MAX_NUM_MSG).sum();
        assert_eq!(calls().len(), usize::try_from(total).unwrap());
    }

    #[test]
    fn test_display_styles_get_null_responses() {
        reset();
        let conv = PamConv::new::<Echo>(5);
        let messages = Messages::new(&[
            (PAM_TEXT_INFO, "Welcome"),
            (PAM_PROMPT_ECHO_ON, "login:"),
            (PAM_ERROR_MSG, "Caps lock is on"),
        ]);

        let (ret, resp) = call(&conv, 3, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_SUCCESS);
        assert_eq!(
            read_answers(resp, 3),
            vec![None, Some("login:".to_string()), None]
        );
        release_all::<Echo>(resp, 3);
    }

    #[test]
    fn test_failure_wipes_and_releases_collected_answers() {
        reset();
        Scripted::load(vec![Ok(Some("alice")), Err(PamResultCode::PAM_ABORT)]);
        let conv = PamConv::new::<Scripted>(7);
        let messages = Messages::new(&[
            (PAM_PROMPT_ECHO_ON, "login:"),
            (PAM_PROMPT_ECHO_OFF, "Password: "),
        ]);

        let (ret, resp) = call(&conv, 2, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
        assert!(resp.is_null());
        assert_eq!(Scripted::live(), 0);
        assert_eq!(
            Scripted::released(),
            vec![
                ("alice".len(), true),
                (2 * mem::size_of::<PamResponse>(), true)
            ]
        );
    }

    #[test]
    fn test_failure_stops_remaining_messages() {
        reset();
        Scripted::load(vec![
            Ok(Some("first")),
            Ok(None),
            Err(PamResultCode::PAM_CONV_ERR),
            Ok(Some("never")),
        ]);
        let conv = PamConv::new::<Scripted>(11);
        let messages = Messages::new(&[
            (PAM_PROMPT_ECHO_ON, "a"),
            (PAM_TEXT_INFO, "b"),
            (PAM_PROMPT_ECHO_OFF, "c"),
            (PAM_PROMPT_ECHO_OFF, "d"),
        ]);

        let (ret, resp) = call(&conv, 4, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
        assert!(resp.is_null());
        assert_eq!(calls().len(), 3);
        assert_eq!(Scripted::live(), 0);
        assert!(Scripted::released().iter().all(|&(_, zeroed)| zeroed));
    }

    #[test]
    fn test_null_message_entry_aborts() {
        reset();
        Scripted::load(vec![Ok(Some("bob"))]);
        let conv = PamConv::new::<Scripted>(2);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_ON, "login:")]);
        let mut pointers = messages.pointers();
        pointers.push(ptr::null());

        let (ret, resp) = call(&conv, 2, &pointers);

        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
        assert!(resp.is_null());
        assert_eq!(Scripted::live(), 0);
        assert_eq!(Scripted::released().len(), 2);
    }

    #[test]
    fn test_null_message_text_is_empty() {
        reset();
        let conv = PamConv::new::<Echo>(4);
        let record = PamMessage {
            msg_style: PAM_PROMPT_ECHO_ON,
            msg: ptr::null(),
        };
        let pointers = [ptr::from_ref(&record)];

        let (ret, resp) = call(&conv, 1, &pointers);

        assert_eq!(ret, PamResultCode::PAM_SUCCESS);
        assert_eq!(read_answers(resp, 1), vec![Some(String::new())]);
        release_all::<Echo>(resp, 1);
    }

    #[test]
    fn test_panicking_responder_is_conversation_error() {
        reset();
        let conv = PamConv::new::<Panicking>(8);
        let messages = Messages::new(&[(PAM_PROMPT_ECHO_ON, "login:")]);

        let (ret, resp) = call(&conv, 1, &messages.pointers());

        assert_eq!(ret, PamResultCode::PAM_CONV_ERR);
        assert!(resp.is_null());
    }

    #[test]
    fn test_initializer_is_pure() {
        reset();
        let first = PamConv::new::<Echo>(100);
        let mut second = PamConv::new::<Echo>(0);
        init_pam_conv::<Echo>(&mut second, 200);

        assert_eq!(first.callback() as usize, second.callback() as usize);
        assert_eq!(first.handle(), 100);
        assert_eq!(second.handle(), 200);
    }

    #[test]
    fn test_handle_is_relayed_unchanged() {
        reset();
        let handle = usize::MAX - 1;
        let conv = PamConv::new::<Echo>(handle);

        Conv::new(&conv).send(PAM_TEXT_INFO, "hello").unwrap();

        assert_eq!(calls(), vec![(PAM_TEXT_INFO, "hello".to_string(), handle)]);
    }

    #[test]
    fn test_conv_send_and_converse() {
        reset();
        let conv = PamConv::new::<Echo>(6);
        let conv = Conv::new(&conv);

        let answer = conv.send(PAM_PROMPT_ECHO_OFF, "Password: ").unwrap();
        assert_eq!(answer.as_deref().map(String::as_str), Some("Password: "));
        assert!(conv.send(PAM_TEXT_INFO, "Welcome").unwrap().is_none());

        let answers = conv
            .converse(&[(PAM_PROMPT_ECHO_ON, "login:"), (PAM_ERROR_MSG, "oops")])
            .unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].as_deref().map(String::as_str), Some("login:"));
        assert!(answers[1].is_none());
    }

    #[test]
    fn test_conv_reports_errors() {
        reset();
        let conv = PamConv::new::<Echo>(6);
        let conv = Conv::new(&conv);

        assert_eq!(conv.converse(&[]).unwrap_err(), PamResultCode::PAM_CONV_ERR);
        assert_eq!(
            conv.send(PAM_PROMPT_ECHO_ON, "nul\0byte").unwrap_err(),
            PamResultCode::PAM_CONV_ERR
        );

        let oom = PamConv::new::<OutOfMemory>(6);
        assert_eq!(
            Conv::new(&oom).send(PAM_TEXT_INFO, "hi").unwrap_err(),
            PamResultCode::PAM_BUF_ERR
        );
    }

    #[test]
    fn test_wipe_c_str() {
        reset();
        let mut buffer = b"s3cret\0".to_vec();
        unsafe { wipe_c_str(buffer.as_mut_ptr().cast()) };
        assert_eq!(buffer, vec![0; 7]);
    }
}
