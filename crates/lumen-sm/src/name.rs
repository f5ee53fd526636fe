//! Service name decoding and validation.
//!
//! Names arrive from the wire as a fixed 9-byte field: up to 8 name bytes
//! plus NUL padding. Decoding truncates at the first NUL *before* any size
//! check, so trailing padding never counts against the length; the NUL
//! check in `validate_service_name` can then only fire for names built
//! from non-wire sources. Both checks are kept on purpose.

use lumen_ipc::MAX_SERVICE_NAME_LEN;

use crate::error::SmError;

/// Decode a wire name field: truncate at the first NUL byte.
pub fn decode_service_name(buf: &[u8]) -> Vec<u8> {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf[..len].to_vec()
}

/// Validate a decoded service name.
///
/// Names are compared byte-for-byte; the only rules are 1-8 bytes of
/// length and no interior NUL.
pub fn validate_service_name(name: &[u8]) -> Result<(), SmError> {
    if name.is_empty() || name.len() > MAX_SERVICE_NAME_LEN {
        return Err(SmError::InvalidNameSize);
    }
    if name.contains(&0) {
        return Err(SmError::NameContainsNul);
    }
    Ok(())
}
