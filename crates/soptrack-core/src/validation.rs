//! # Form Validation
//!
//! Every mutating form in the application has a raw `*Input` type (what the
//! browser posts, deserialized by serde) and a validated `*Draft` type (what
//! the persistence layer accepts). The only way to get a draft is through
//! `validate()`, so nothing unvalidated reaches the database.
//!
//! HTML forms post empty strings for blank optional fields; those are
//! treated as absent.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::password;
use crate::role::Role;

const SOP_TITLE_MAX: usize = 500;
const SOP_CATEGORY_MAX: usize = 100;
const SOP_CONTENT_MIN: usize = 10;

const STAFF_NAME_MAX: usize = 200;
const STAFF_TYPE_MAX: usize = 50;
const STAFF_JOB_TITLE_MAX: usize = 100;
const STAFF_DEPARTMENT_MAX: usize = 100;
const STAFF_SUPERVISOR_MAX: usize = 200;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;

const SIGNATURE_MAX: usize = 200;

/// Collapse internal whitespace and trim.
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity key for a staff member: cleaned and lowercased.
///
/// Two roster entries with the same normalized name are the same person.
pub fn normalize_name(name: &str) -> String {
    clean_text(name).to_lowercase()
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

fn optional(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field,
            reason: "Invalid date format. Use YYYY-MM-DD".to_string(),
        }
    })
}

// ── SOP ─────────────────────────────────────────────────────────────────────

/// SOP create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SopInput {
    pub title: String,
    pub category: String,
    pub content: String,
}

/// Validated SOP fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SopDraft {
    pub title: String,
    pub category: String,
    pub content: String,
}

impl SopInput {
    pub fn validate(&self) -> Result<SopDraft, ValidationError> {
        let title = required("Title", &self.title, SOP_TITLE_MAX)?;
        let category = required("Category", &self.category, SOP_CATEGORY_MAX)?;
        let content = self.content.trim();
        if content.chars().count() < SOP_CONTENT_MIN {
            return Err(ValidationError::TooShort {
                field: "Content",
                min: SOP_CONTENT_MIN,
            });
        }
        Ok(SopDraft {
            title,
            category,
            content: content.to_string(),
        })
    }
}

// ── Staff ───────────────────────────────────────────────────────────────────

/// Roster entry form (also produced by the CSV importer).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffInput {
    pub name: String,
    #[serde(default)]
    pub staff_type: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub supervisor: Option<String>,
    #[serde(default)]
    pub hire_date: Option<String>,
}

/// Validated roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffDraft {
    pub name: String,
    pub normalized_name: String,
    pub staff_type: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub supervisor: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

impl StaffDraft {
    /// Minimal entry with only a name, as created when a staff-role user
    /// is added without an existing roster link.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        StaffInput {
            name: name.to_string(),
            ..Default::default()
        }
        .validate()
    }
}

impl StaffInput {
    pub fn validate(&self) -> Result<StaffDraft, ValidationError> {
        let name = clean_text(&required("Name", &self.name, STAFF_NAME_MAX)?);
        let hire_date = match self.hire_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(parse_iso_date("Hire date", v)?),
        };
        Ok(StaffDraft {
            normalized_name: name.to_lowercase(),
            name,
            staff_type: optional("Staff type", self.staff_type.as_deref(), STAFF_TYPE_MAX)?,
            job_title: optional("Job title", self.job_title.as_deref(), STAFF_JOB_TITLE_MAX)?,
            department: optional("Department", self.department.as_deref(), STAFF_DEPARTMENT_MAX)?,
            supervisor: optional("Supervisor", self.supervisor.as_deref(), STAFF_SUPERVISOR_MAX)?,
            hire_date,
        })
    }
}

// ── Users ───────────────────────────────────────────────────────────────────

/// Admin "new user" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub password: String,
    pub role: String,
    /// Roster id as posted by a `<select>`; empty means "none".
    #[serde(default)]
    pub staff_id: Option<String>,
    /// Checkbox: present (any value) when checked.
    #[serde(default)]
    pub must_reset_password: Option<String>,
}

/// Validated new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub staff_id: Option<i64>,
    pub must_reset_password: bool,
}

/// Normalize and check a username: 3–50 characters of ASCII letters,
/// digits, `-` and `_`, lowercased.
pub fn validate_username(value: &str) -> Result<String, ValidationError> {
    let username = value.trim();
    let len = username.chars().count();
    if len < USERNAME_MIN {
        return Err(ValidationError::TooShort {
            field: "Username",
            min: USERNAME_MIN,
        });
    }
    if len > USERNAME_MAX {
        return Err(ValidationError::TooLong {
            field: "Username",
            max: USERNAME_MAX,
        });
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "Username",
            reason: "must be alphanumeric (hyphens and underscores allowed)".to_string(),
        });
    }
    Ok(username.to_lowercase())
}

impl UserInput {
    pub fn validate(&self) -> Result<UserDraft, ValidationError> {
        let username = validate_username(&self.username)?;
        password::check_policy(&self.password)?;
        let role: Role = self.role.trim().parse()?;
        let staff_id = match self.staff_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(v.parse::<i64>().map_err(|_| ValidationError::InvalidFormat {
                field: "Staff member",
                reason: format!("invalid id {v:?}"),
            })?),
        };
        // Staff accounts always start with a pending reset.
        let must_reset_password = self.must_reset_password.is_some() || role == Role::Staff;
        Ok(UserDraft {
            username,
            password: self.password.clone(),
            role,
            staff_id,
            must_reset_password,
        })
    }
}

// ── Acknowledgment ──────────────────────────────────────────────────────────

/// Acknowledgment form posted from the SOP detail page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AckInput {
    pub signature_text: String,
    /// Seconds the page was open, measured client-side.
    #[serde(default)]
    pub read_seconds: u32,
}

/// Validated acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckDraft {
    pub signature_text: String,
    pub read_seconds: u32,
}

impl AckInput {
    pub fn validate(&self, min_read_seconds: u32) -> Result<AckDraft, ValidationError> {
        let signature_text = required("Signature", &self.signature_text, SIGNATURE_MAX)?;
        if self.read_seconds < min_read_seconds {
            return Err(ValidationError::ReadTimeTooShort {
                required: min_read_seconds,
                actual: self.read_seconds,
            });
        }
        Ok(AckDraft {
            signature_text,
            read_seconds: self.read_seconds,
        })
    }
}

// ── Passwords ───────────────────────────────────────────────────────────────

/// Self-service password change form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeInput {
    /// Check shape only; verifying `current_password` needs the stored hash.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.current_password.is_empty() {
            return Err(ValidationError::Required {
                field: "Current password",
            });
        }
        if self.new_password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        password::check_policy(&self.new_password)
    }
}

/// Admin "set password" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPasswordInput {
    pub new_password: String,
}

impl AdminPasswordInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        password::check_policy(&self.new_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sop(title: &str, category: &str, content: &str) -> SopInput {
        SopInput {
            title: title.into(),
            category: category.into(),
            content: content.into(),
        }
    }

    #[test]
    fn sop_fields_are_trimmed() {
        let draft = sop("  Fire Drill  ", " Safety ", "  Evacuate via stairwell B.  ")
            .validate()
            .unwrap();
        assert_eq!(draft.title, "Fire Drill");
        assert_eq!(draft.category, "Safety");
        assert_eq!(draft.content, "Evacuate via stairwell B.");
    }

    #[test]
    fn sop_blank_title_rejected() {
        let err = sop("   ", "Safety", "long enough content").validate().unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "Title" });
    }

    #[test]
    fn sop_short_content_rejected() {
        let ok = sop("Title", "Safety", "  ten chars!  ").validate();
        assert!(ok.is_ok(), "exactly ten characters after trim is allowed");
        let err = sop("Title", "Safety", "  too short ").validate().unwrap_err();
        assert!(matches!(err, ValidationError::TooShort { field: "Content", .. }));
    }

    #[test]
    fn sop_title_length_limit() {
        let long = "x".repeat(501);
        let err = sop(&long, "Safety", "long enough content").validate().unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 500, .. }));
    }

    #[test]
    fn staff_name_normalized() {
        let draft = StaffInput {
            name: "  Jane   Doe ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.name, "Jane Doe");
        assert_eq!(draft.normalized_name, "jane doe");
    }

    #[test]
    fn staff_blank_optionals_are_none() {
        let draft = StaffInput {
            name: "Sam".into(),
            department: Some("   ".into()),
            hire_date: Some(String::new()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.department, None);
        assert_eq!(draft.hire_date, None);
    }

    #[test]
    fn staff_hire_date_must_be_iso() {
        let err = StaffInput {
            name: "Sam".into(),
            hire_date: Some("03/04/2024".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));

        let ok = StaffInput {
            name: "Sam".into(),
            hire_date: Some("2024-03-04".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(ok.hire_date, NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn username_rules() {
        assert_eq!(validate_username(" Nurse_01 ").unwrap(), "nurse_01");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dot.name").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn staff_role_forces_reset() {
        let draft = UserInput {
            username: "jdoe".into(),
            password: "Password1".into(),
            role: "staff".into(),
            staff_id: Some(String::new()),
            must_reset_password: None,
        }
        .validate()
        .unwrap();
        assert!(draft.must_reset_password);
        assert_eq!(draft.staff_id, None);
    }

    #[test]
    fn manager_reset_follows_checkbox() {
        let mut input = UserInput {
            username: "boss".into(),
            password: "Password1".into(),
            role: "manager".into(),
            staff_id: Some("7".into()),
            must_reset_password: None,
        };
        let draft = input.validate().unwrap();
        assert!(!draft.must_reset_password);
        assert_eq!(draft.staff_id, Some(7));

        input.must_reset_password = Some("on".into());
        assert!(input.validate().unwrap().must_reset_password);
    }

    #[test]
    fn user_unknown_role_rejected() {
        let err = UserInput {
            username: "root".into(),
            password: "Password1".into(),
            role: "root".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownRole("root".into()));
    }

    #[test]
    fn ack_requires_signature_and_read_time() {
        let ok = AckInput {
            signature_text: "  J. Doe ".into(),
            read_seconds: 12,
        }
        .validate(10)
        .unwrap();
        assert_eq!(ok.signature_text, "J. Doe");

        let err = AckInput {
            signature_text: "J. Doe".into(),
            read_seconds: 3,
        }
        .validate(10)
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ReadTimeTooShort {
                required: 10,
                actual: 3
            }
        );

        let err = AckInput {
            signature_text: " ".into(),
            read_seconds: 30,
        }
        .validate(10)
        .unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "Signature" });
    }

    #[test]
    fn password_change_mismatch() {
        let err = PasswordChangeInput {
            current_password: "old".into(),
            new_password: "Password1".into(),
            confirm_password: "Password2".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::PasswordMismatch);
    }

    #[test]
    fn password_change_requires_current() {
        let err = PasswordChangeInput {
            current_password: String::new(),
            new_password: "Password1".into(),
            confirm_password: "Password1".into(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }
}
