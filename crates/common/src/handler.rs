//! # Handler Module
//!
//! The `handler` module defines what answers a PAM conversation on the application side.
//!
//! ## Overview
//!
//! A `ConversationHandler` receives every message of a conversation, one at a time, with its
//! `Style`. For prompts it returns the text to send back, for display-only styles it usually
//! returns `None`. Any error aborts the whole conversation.
//!
//! Plain closures with the matching signature are handlers too, and `Credentials` covers the
//! common user name + password case.
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

use pam::{
    PamMessageStyle, PamResult, PamResultCode, PAM_BINARY_PROMPT, PAM_ERROR_MSG,
    PAM_PROMPT_ECHO_OFF, PAM_PROMPT_ECHO_ON, PAM_RADIO_TYPE, PAM_TEXT_INFO,
};
use std::fmt;
use zeroize::Zeroizing;

use crate::{log_info, log_warn};

/// The kind of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Obtain a string without echoing any text (e.g. a password).
    PromptEchoOff,
    /// Obtain a string whilst echoing text (e.g. a user name).
    PromptEchoOn,
    /// Display an error message.
    ErrorMsg,
    /// Display some text.
    TextInfo,
    /// Obtain a yes/no answer (Linux-PAM).
    RadioType,
    /// Exchange binary data (Linux-PAM).
    BinaryPrompt,
}

impl Style {
    /// Whether a message of this style waits for an answer.
    #[must_use]
    pub fn expects_reply(self) -> bool {
        !matches!(self, Style::ErrorMsg | Style::TextInfo)
    }
}

impl TryFrom<PamMessageStyle> for Style {
    type Error = PamResultCode;

    fn try_from(style: PamMessageStyle) -> Result<Self, Self::Error> {
        match style {
            PAM_PROMPT_ECHO_OFF => Ok(Style::PromptEchoOff),
            PAM_PROMPT_ECHO_ON => Ok(Style::PromptEchoOn),
            PAM_ERROR_MSG => Ok(Style::ErrorMsg),
            PAM_TEXT_INFO => Ok(Style::TextInfo),
            PAM_RADIO_TYPE => Ok(Style::RadioType),
            PAM_BINARY_PROMPT => Ok(Style::BinaryPrompt),
            _ => Err(PamResultCode::PAM_CONV_ERR),
        }
    }
}

impl From<Style> for PamMessageStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::PromptEchoOff => PAM_PROMPT_ECHO_OFF,
            Style::PromptEchoOn => PAM_PROMPT_ECHO_ON,
            Style::ErrorMsg => PAM_ERROR_MSG,
            Style::TextInfo => PAM_TEXT_INFO,
            Style::RadioType => PAM_RADIO_TYPE,
            Style::BinaryPrompt => PAM_BINARY_PROMPT,
        }
    }
}

/// Answers the messages of a PAM conversation.
///
/// Handlers are shared through the registry and may be called from the thread of any
/// transaction they are registered for, hence `Send + Sync`.
pub trait ConversationHandler: Send + Sync {
    /// Receives a message style and a message string. For `PromptEchoOff` and `PromptEchoOn`
    /// the function should return the response string.
    ///
    /// # Errors
    ///
    /// Any error aborts the conversation; libpam then sees `PAM_CONV_ERR`.
    fn respond(&self, style: Style, msg: &str) -> PamResult<Option<String>>;
}

impl<F> ConversationHandler for F
where
    F: Fn(Style, &str) -> PamResult<Option<String>> + Send + Sync,
{
    fn respond(&self, style: Style, msg: &str) -> PamResult<Option<String>> {
        self(style, msg)
    }
}

/// Answers echoing prompts with a user name and silent prompts with a password.
///
/// Informational and error messages are logged and need no reply. Radio and binary prompts
/// are refused.
pub struct Credentials {
    user: String,
    password: Zeroizing<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(user: &str, password: &str) -> Self {
        Credentials {
            user: user.to_string(),
            password: Zeroizing::new(password.to_string()),
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConversationHandler for Credentials {
    fn respond(&self, style: Style, msg: &str) -> PamResult<Option<String>> {
        match style {
            Style::PromptEchoOn => Ok(Some(self.user.clone())),
            Style::PromptEchoOff => Ok(Some(self.password.to_string())),
            Style::TextInfo => {
                log_info!("PAM: {}", msg);
                Ok(None)
            }
            Style::ErrorMsg => {
                log_warn!("PAM: {}", msg);
                Ok(None)
            }
            Style::RadioType | Style::BinaryPrompt => Err(PamResultCode::PAM_CONV_ERR),
        }
    }
}
