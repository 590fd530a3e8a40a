use crate::error::ApiError;

/// Polly's per-request synthesis limit, enforced before the provider is called
pub const MAX_TEXT_LENGTH: usize = 3000;

/// Validate the `text` query parameter of the audio relay
pub fn validate_speech_text(text: Option<&str>) -> Result<&str, ApiError> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ApiError::MissingText),
    };
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::TextTooLong(MAX_TEXT_LENGTH));
    }
    Ok(text)
}

/// Validate an E.164 phone number (e.g. +14155552671)
pub fn validate_phone_number(number: &str) -> Result<(), ApiError> {
    if is_e164(number) {
        Ok(())
    } else {
        Err(ApiError::InvalidPhoneNumber)
    }
}

/// `+`, a non-zero leading digit, 2 to 15 digits in total
fn is_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

/// Validate a Twilio call SID (`CA` followed by 32 alphanumerics)
pub fn validate_call_sid(sid: &str) -> Result<(), ApiError> {
    let valid = sid.len() == 34
        && sid.starts_with("CA")
        && sid.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidCallSid(sid.to_string()))
    }
}
