//! Prebuilt claim request bytes.
//!
//! The whole HTTP/1.1 request is rendered ahead of time. Every payload ends
//! in `\r\n` and is split immediately before it: the head goes out first and
//! the two-byte tail completes the request at the target instant. Requests
//! with a JSON body carry the trailing `\r\n` inside the body (counted by
//! `Content-Length`) so the split point stays the same for every shape.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ClaimError, ClaimResult};

pub const TERMINATOR: &[u8] = b"\r\n";

const PROFILE_PATH: &str = "/minecraft/profile";
const RENAME_PATH: &str = "/minecraft/profile/name/";
const MAX_USERNAME_LEN: usize = 16;

/// Which request the claim sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestShape {
    /// `POST /minecraft/profile` with a `profileName` JSON body.
    CreateProfile,
    /// `PUT /minecraft/profile/name/{name}`.
    Rename,
    /// Same as [`RequestShape::Rename`] without the `Accept` header.
    RenameBare,
}

impl RequestShape {
    pub fn from_create_profile(create_profile: bool) -> Self {
        if create_profile {
            RequestShape::CreateProfile
        } else {
            RequestShape::Rename
        }
    }

    fn method(self) -> &'static str {
        match self {
            RequestShape::CreateProfile => "POST",
            RequestShape::Rename | RequestShape::RenameBare => "PUT",
        }
    }

    fn sends_accept(self) -> bool {
        !matches!(self, RequestShape::RenameBare)
    }
}

/// Fully rendered request plus the offset it is split at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPayload {
    bytes: Bytes,
    split: usize,
}

impl ClaimPayload {
    pub fn build(shape: RequestShape, host: &str, username: &str, bearer: &str) -> ClaimResult<Self> {
        validate_username(username)?;
        if bearer.is_empty() || bearer.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(ClaimError::InvalidHeader("authorization".into()));
        }
        if host.is_empty() || host.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(ClaimError::InvalidHeader("host".into()));
        }

        let path = match shape {
            RequestShape::CreateProfile => PROFILE_PATH.to_string(),
            RequestShape::Rename | RequestShape::RenameBare => format!("{RENAME_PATH}{username}"),
        };
        let body = match shape {
            RequestShape::CreateProfile => {
                let mut json = serde_json::to_vec(&serde_json::json!({ "profileName": username }))?;
                json.extend_from_slice(TERMINATOR);
                Some(json)
            }
            RequestShape::Rename | RequestShape::RenameBare => None,
        };

        let mut buf = BytesMut::with_capacity(256);
        put_line(&mut buf, &format!("{} {path} HTTP/1.1", shape.method()));
        put_line(&mut buf, &format!("Host: {host}"));
        put_line(&mut buf, &format!("Authorization: Bearer {bearer}"));
        if shape.sends_accept() {
            put_line(&mut buf, "Accept: application/json");
        }
        match body {
            Some(body) => {
                put_line(&mut buf, "Content-Type: application/json");
                put_line(&mut buf, &format!("Content-Length: {}", body.len()));
                buf.put_slice(TERMINATOR);
                buf.put_slice(&body);
            }
            None => buf.put_slice(TERMINATOR),
        }

        let bytes = buf.freeze();
        let split = bytes.len() - TERMINATOR.len();
        Ok(Self { bytes, split })
    }

    /// Everything except the final terminator.
    pub fn head(&self) -> &[u8] {
        &self.bytes[..self.split]
    }

    /// The terminator that completes the request.
    pub fn tail(&self) -> &[u8] {
        &self.bytes[self.split..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn put_line(buf: &mut BytesMut, line: &str) {
    buf.put_slice(line.as_bytes());
    buf.put_slice(TERMINATOR);
}

fn validate_username(username: &str) -> ClaimResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ClaimError::InputValidation(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !username.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(ClaimError::InputValidation(format!(
            "username {username:?} may only contain letters, digits, and underscores"
        )));
    }
    Ok(())
}
