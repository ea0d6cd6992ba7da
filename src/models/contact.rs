use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{ Map, Value };
use std::collections::BTreeMap;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// A contact form submission that satisfied every field constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Per-field validation messages, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

struct LengthRule {
    field: &'static str,
    min: usize,
    max: usize,
    too_short: &'static str,
    too_long: &'static str,
}

const NAME: LengthRule = LengthRule {
    field: "name",
    min: 2,
    max: 100,
    too_short: "Name must be at least 2 characters",
    too_long: "Name is too long",
};

const SUBJECT: LengthRule = LengthRule {
    field: "subject",
    min: 3,
    max: 150,
    too_short: "Subject must be at least 3 characters",
    too_long: "Subject is too long",
};

const MESSAGE: LengthRule = LengthRule {
    field: "message",
    min: 10,
    max: 5000,
    too_short: "Message must be at least 10 characters",
    too_long: "Message is too long (max 5000 characters)",
};

const EMAIL_MAX: usize = 254;

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn trimmed_string(
    object: Option<&Map<String, Value>>,
    field: &'static str,
    errors: &mut FieldErrors
) -> Option<String> {
    match object.and_then(|o| o.get(field)) {
        None => {
            errors.push(field, "Required");
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => {
            errors.push(field, format!("Expected string, received {}", json_type_name(other)));
            None
        }
    }
}

fn check_length(value: Option<String>, rule: &LengthRule, errors: &mut FieldErrors) -> Option<String> {
    let value = value?;
    let len = value.chars().count();
    if len < rule.min {
        errors.push(rule.field, rule.too_short);
    }
    if len > rule.max {
        errors.push(rule.field, rule.too_long);
    }
    Some(value)
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_PATTERN.is_match(email)
}

fn check_email(value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    let value = value?;
    if !is_valid_email(&value) {
        errors.push("email", "Please enter a valid email address");
    }
    if value.chars().count() > EMAIL_MAX {
        errors.push("email", "Email is too long");
    }
    Some(value.to_lowercase())
}

/// Validates an untrusted JSON payload. Every check runs, so the error map lists
/// all failures at once.
pub fn validate_contact(payload: &Value) -> Result<ContactSubmission, FieldErrors> {
    let object = payload.as_object();
    let mut errors = FieldErrors::default();

    let name = check_length(trimmed_string(object, "name", &mut errors), &NAME, &mut errors);
    let email = check_email(trimmed_string(object, "email", &mut errors), &mut errors);
    let subject = check_length(trimmed_string(object, "subject", &mut errors), &SUBJECT, &mut errors);
    let message = check_length(trimmed_string(object, "message", &mut errors), &MESSAGE, &mut errors);

    match (name, email, subject, message) {
        (Some(name), Some(email), Some(subject), Some(message)) if errors.is_empty() =>
            Ok(ContactSubmission { name, email, subject, message }),
        _ => Err(errors),
    }
}
