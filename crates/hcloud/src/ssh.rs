//! SSH public key helpers.

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};
use thiserror::Error;

/// Errors for malformed SSH public keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SshKeyError {
    /// The key is not `<algorithm> <base64 blob> [comment]`.
    #[error("invalid ssh public key: {reason}")]
    InvalidKeyFormat {
        /// What is wrong with the key.
        reason: String,
    },
}

/// Compute the MD5 fingerprint of an OpenSSH public key, as printed by
/// `ssh-keygen -l -E md5` (without the `MD5:` prefix).
///
/// # Errors
/// Returns [`SshKeyError::InvalidKeyFormat`] if the key has no key blob or the
/// blob is not valid base64.
pub fn ssh_public_key_md5_fingerprint(value: &str) -> Result<String, SshKeyError> {
    let mut parts = value.split_whitespace();
    let blob = match (parts.next(), parts.next()) {
        (Some(_), Some(blob)) => blob,
        _ => {
            return Err(SshKeyError::InvalidKeyFormat {
                reason: "expected '<algorithm> <key> [comment]'".to_string(),
            })
        }
    };

    if !blob.is_ascii() {
        return Err(SshKeyError::InvalidKeyFormat {
            reason: "key data contains non-ASCII characters".to_string(),
        });
    }

    let raw = STANDARD
        .decode(blob)
        .map_err(|e| SshKeyError::InvalidKeyFormat {
            reason: e.to_string(),
        })?;

    let digest = Md5::digest(&raw);

    let mut fingerprint = String::with_capacity(digest.len() * 3);
    for (i, byte) in digest.iter().enumerate() {
        if i > 0 {
            fingerprint.push(':');
        }
        let _ = write!(fingerprint, "{byte:02x}");
    }
    Ok(fingerprint)
}
