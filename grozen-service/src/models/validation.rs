//! Field validators shared by the flow schemas.

use chrono::{NaiveDate, NaiveTime};
use std::borrow::Cow;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// 24-hour `HH:MM` clock time.
pub fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    if value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok() {
        Ok(())
    } else {
        Err(error("clock_time", "Time must be in 24-hour HH:MM format"))
    }
}

/// Calendar date in `YYYY-MM-DD` form.
pub fn validate_calendar_date(value: &str) -> Result<(), ValidationError> {
    if value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(error("calendar_date", "Date must be in YYYY-MM-DD format"))
    }
}

/// Non-blank string (length rules alone accept whitespace).
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "Value cannot be blank"))
    } else {
        Ok(())
    }
}

/// `data:<mime>;base64,<payload>` image URI.
pub fn validate_image_data_uri(value: &str) -> Result<(), ValidationError> {
    match crate::utils::data_uri::parse_data_uri(value) {
        Ok(media) if media.mime_type.starts_with("image/") => Ok(()),
        Ok(_) => Err(error("data_uri_mime", "Data URI must contain an image")),
        Err(_) => Err(error(
            "data_uri",
            "Expected a base64 data URI of the form data:<mimetype>;base64,<encoded_data>",
        )),
    }
}
