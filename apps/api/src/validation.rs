//! Field validation shared by onboarding, profile resources and jobs.
//!
//! Field-level rules are declared with `validator` derives. Cross-field rules
//! (date ordering, URL schemes, ownership of file paths) run as schema
//! functions and report through [`rule`], which records the offending field so
//! errors come back with dotted paths such as `education[1].end_date`.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

const SCHEMA_KEY: &str = "__all__";
const FIELD_PARAM: &str = "field";

const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "api",
    "cofounds",
    "dashboard",
    "help",
    "jobs",
    "login",
    "logout",
    "portfolio",
    "recruiter",
    "settings",
    "signup",
    "support",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Builds a schema-level error attributed to `field`.
pub fn rule(field: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(field);
    err.message = Some(Cow::Borrowed(message));
    err.add_param(Cow::Borrowed(FIELD_PARAM), &field);
    err
}

/// Flattens nested `validator` errors into dotted field paths under `prefix`.
pub fn flatten_errors(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(prefix, errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (key, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let field = if *key == SCHEMA_KEY {
                        err.params
                            .get(FIELD_PARAM)
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .unwrap_or_default()
                    } else {
                        key.to_string()
                    };
                    out.push(FieldError::new(join(prefix, &field), describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&join(prefix, key), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{}[{index}]", join(prefix, key)), inner, out);
                }
            }
        }
    }
}

fn join(prefix: &str, field: &str) -> String {
    match (prefix.is_empty(), field.is_empty()) {
        (true, _) => field.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{field}"),
    }
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => format!("must be between {min} and {max} characters long"),
            (Some(min), None) => format!("must be at least {min} long"),
            (None, Some(max)) => format!("must be at most {max} long"),
            _ => "has an invalid length".to_string(),
        },
        "range" => "is out of range".to_string(),
        "url" => "must be a valid URL".to_string(),
        "email" => "must be a valid email address".to_string(),
        other => format!("is invalid ({other})"),
    }
}

/// Validates any `validator::Validate` value, prefixing field paths.
pub fn check<T: validator::Validate>(prefix: &str, value: &T) -> Vec<FieldError> {
    match value.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => flatten_errors(prefix, &errors),
    }
}

/// Validates each item of a list, producing `prefix[i].field` paths.
pub fn check_each<T: validator::Validate>(prefix: &str, items: &[T]) -> Vec<FieldError> {
    items
        .iter()
        .enumerate()
        .flat_map(|(i, item)| check(&format!("{prefix}[{i}]"), item))
        .collect()
}

pub fn is_http_url(raw: &str) -> bool {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// Optional URL fields: absent or blank is fine, anything else must be http(s).
pub fn is_optional_http_url(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(value) if value.trim().is_empty() => true,
        Some(value) => is_http_url(value),
    }
}

/// End dates must not precede start dates.
pub fn dates_ordered(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

/// Explains why a username is unusable, or `None` if the format is acceptable.
pub fn username_problem(username: &str) -> Option<&'static str> {
    let len = username.chars().count();
    if len < 3 {
        return Some("Username must be at least 3 characters long");
    }
    if len > 30 {
        return Some("Username must be at most 30 characters long");
    }
    if !username.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Some("Username must start with a lowercase letter");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Some("Username may only contain lowercase letters, digits, '_' and '-'");
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Some("This username is reserved");
    }
    None
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    match username_problem(username) {
        None => Ok(()),
        Some(message) => {
            let mut err = ValidationError::new("username");
            err.message = Some(Cow::Borrowed(message));
            Err(err)
        }
    }
}

pub fn validate_http_url(raw: &str) -> Result<(), ValidationError> {
    if is_http_url(raw) {
        Ok(())
    } else {
        let mut err = ValidationError::new("url");
        err.message = Some(Cow::Borrowed("must be an http(s) URL"));
        Err(err)
    }
}

pub fn validate_phone(raw: &str) -> Result<(), ValidationError> {
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
    let len = raw.chars().count();
    if allowed && (7..=20).contains(&len) && digits >= 7 {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some(Cow::Borrowed("must be 7-20 characters of digits, spaces, +, -, ( or )"));
        Err(err)
    }
}

/// Rejects text that is empty once trimmed.
pub fn validate_not_blank(raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("must not be blank"));
        Err(err)
    } else {
        Ok(())
    }
}

/// A stored file path is usable only inside the caller's own prefix.
pub fn path_owned_by(path: &str, user_id: Uuid) -> bool {
    crate::storage::paths::is_owned_by(path, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    #[validate(schema(function = "check_pair"))]
    struct Pair {
        #[validate(length(min = 1, max = 5))]
        name: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    }

    fn check_pair(pair: &Pair) -> Result<(), ValidationError> {
        if dates_ordered(pair.start, pair.end) {
            Ok(())
        } else {
            Err(rule("end", "must not be before start"))
        }
    }

    #[derive(Validate)]
    struct Wrapper {
        #[validate(nested)]
        pairs: Vec<Pair>,
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_schema_errors_use_recorded_field() {
        let pair = Pair {
            name: "ok".to_string(),
            start: date(2022, 1, 1),
            end: date(2021, 1, 1),
        };
        let errors = check("item", &pair);
        assert_eq!(errors, vec![FieldError::new("item.end", "must not be before start")]);
    }

    #[test]
    fn test_nested_list_paths() {
        let wrapper = Wrapper {
            pairs: vec![
                Pair {
                    name: "fine".to_string(),
                    start: None,
                    end: None,
                },
                Pair {
                    name: "far too long".to_string(),
                    start: None,
                    end: None,
                },
            ],
        };
        let errors = check("", &wrapper);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "pairs[1].name");
        assert!(errors[0].message.contains("between 1 and 5"));
    }

    #[test]
    fn test_check_each_prefixes_index() {
        let items = vec![Pair {
            name: String::new(),
            start: None,
            end: None,
        }];
        let errors = check_each("skills", &items);
        assert_eq!(errors[0].field, "skills[0].name");
    }

    #[test]
    fn test_http_urls() {
        assert!(is_http_url("https://github.com/cofounds"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("ftp://example.com/file"));
        assert!(!is_http_url("javascript:alert(1)"));
        assert!(!is_http_url("not a url"));
        assert!(is_optional_http_url(None));
        assert!(is_optional_http_url(Some("  ")));
        assert!(!is_optional_http_url(Some("github.com/me")));
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(username_problem("jane_doe-42"), None);
        assert!(username_problem("jd").is_some());
        assert!(username_problem("9lives").is_some());
        assert!(username_problem("Jane").is_some());
        assert!(username_problem("jane.doe").is_some());
        assert!(username_problem(&"a".repeat(31)).is_some());
        assert_eq!(username_problem("admin"), Some("This username is reserved"));
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("+1 (555) 123-4567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("555-CALL-NOW").is_err());
    }

    #[test]
    fn test_dates_ordered() {
        assert!(dates_ordered(date(2020, 1, 1), date(2020, 1, 1)));
        assert!(dates_ordered(None, date(2020, 1, 1)));
        assert!(!dates_ordered(date(2021, 1, 1), date(2020, 12, 31)));
    }
}
