//! Request payload validation for creating orders and changing their status.
//!
//! Payloads arrive as loose JSON so that every field problem can be reported
//! at once, keyed by field name.

use chrono::NaiveDate;
use common::{TravelOrderStatus, UserId};
use serde_json::{Map, Value};
use store::NewTravelOrder;

use crate::{DomainError, ValidationErrors};

/// Longest accepted `requester_name` / `destination`, in characters.
pub const MAX_TEXT_LENGTH: usize = 255;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates a create payload for `owner`.
///
/// `today` is the calendar date departure must not precede. A payload that
/// is not a JSON object is treated as empty.
pub fn validate_new_order(
    owner: UserId,
    payload: &Value,
    today: NaiveDate,
) -> Result<NewTravelOrder, DomainError> {
    let empty = Map::new();
    let fields = payload.as_object().unwrap_or(&empty);
    let mut errors = ValidationErrors::new();

    let requester_name = required_text(fields, "requester_name", &mut errors);
    let destination = required_text(fields, "destination", &mut errors);

    let departure_date = required_date(fields, "departure_date", &mut errors);
    if let Some(date) = departure_date
        && date < today
    {
        errors.add(
            "departure_date",
            "The departure date field must be a date after or equal to today.",
        );
    }

    let return_date = required_date(fields, "return_date", &mut errors);
    if let (Some(departure), Some(ret)) = (departure_date, return_date)
        && ret <= departure
    {
        errors.add(
            "return_date",
            "The return date field must be a date after departure date.",
        );
    }

    if fields.get("status").is_some_and(is_filled) {
        errors.add("status", "The status field is prohibited.");
    }

    errors.into_result()?;

    match (requester_name, destination, departure_date, return_date) {
        (Some(requester_name), Some(destination), Some(departure_date), Some(return_date)) => {
            Ok(NewTravelOrder {
                user_id: owner,
                requester_name,
                destination,
                departure_date,
                return_date,
            })
        }
        _ => Err(DomainError::validation(
            "payload",
            "The given data was invalid.",
        )),
    }
}

/// Validates a status-change payload. Only `approved` and `canceled` may be requested.
pub fn validate_status_change(payload: &Value) -> Result<TravelOrderStatus, DomainError> {
    let status = match payload.get("status") {
        None | Some(Value::Null) => {
            return Err(DomainError::validation(
                "status",
                "The status field is required.",
            ));
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(DomainError::validation(
                "status",
                "The status field is required.",
            ));
        }
        Some(Value::String(s)) => s.trim(),
        Some(_) => {
            return Err(DomainError::validation(
                "status",
                "The status field must be a string.",
            ));
        }
    };

    match status.parse::<TravelOrderStatus>() {
        Ok(target @ (TravelOrderStatus::Approved | TravelOrderStatus::Canceled)) => Ok(target),
        _ => Err(DomainError::validation(
            "status",
            "The selected status is invalid.",
        )),
    }
}

/// Returns true unless the value is null or a blank string.
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn required_text(
    fields: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match fields.get(field) {
        Some(value) if !is_filled(value) => {
            errors.add(field, format!("The {} field is required.", label(field)));
            None
        }
        None => {
            errors.add(field, format!("The {} field is required.", label(field)));
            None
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.chars().count() > MAX_TEXT_LENGTH {
                errors.add(
                    field,
                    format!(
                        "The {} field must not be greater than {} characters.",
                        label(field),
                        MAX_TEXT_LENGTH
                    ),
                );
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            errors.add(field, format!("The {} field must be a string.", label(field)));
            None
        }
    }
}

fn required_date(
    fields: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
    let raw = match fields.get(field) {
        Some(value) if is_filled(value) => value,
        _ => {
            errors.add(field, format!("The {} field is required.", label(field)));
            return None;
        }
    };

    let parsed = raw.as_str().and_then(parse_date);
    if parsed.is_none() {
        errors.add(
            field,
            format!("The {} field must match the format Y-m-d.", label(field)),
        );
    }
    parsed
}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}
