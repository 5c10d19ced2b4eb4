use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::InputError;

/// Decode a `data:<mime>;base64,<payload>` URL into raw image bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, InputError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| InputError::InvalidImage("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| InputError::InvalidImage("missing payload separator".into()))?;
    if !header.ends_with(";base64") {
        return Err(InputError::InvalidImage("payload is not base64".into()));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| InputError::InvalidImage(err.to_string()))?;
    if bytes.is_empty() {
        return Err(InputError::InvalidImage("empty payload".into()));
    }
    Ok(bytes)
}
