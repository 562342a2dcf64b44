//! # Form validation
//!
//! Every form the platform accepts is checked here before anything reaches
//! the backend. A validator collects one message per failing field, in field
//! order, so a client can show them next to the inputs. Lengths are counted in
//! characters and all ranges are inclusive.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{
    BlogDraft, Credentials, GroupDraft, GroupPostDraft, NoteDraft, Registration,
    TherapistProfileInput, UserRole,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-()]+$").expect("valid phone regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All failing fields of one form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Only the first message per field is kept.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push(FieldError {
                field: field.to_string(),
                message: message.into(),
            });
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn chars(value: &str) -> usize {
    value.trim().chars().count()
}

fn required(errors: &mut ValidationErrors, field: &str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, message);
        false
    } else {
        true
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if required(errors, "email", email, "Email is required") && !EMAIL_RE.is_match(email.trim()) {
        errors.add("email", "Invalid email format");
    }
}

fn check_new_password(errors: &mut ValidationErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < 8 {
        errors.add("password", "Password must be at least 8 characters");
    } else if !(password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit()))
    {
        errors.add(
            "password",
            "Password must contain uppercase, lowercase, and number",
        );
    }
    if confirm.is_empty() {
        errors.add("confirm_password", "Confirm password is required");
    } else if confirm != password {
        errors.add("confirm_password", "Passwords must match");
    }
}

fn check_bio(errors: &mut ValidationErrors, bio: &str) {
    if !required(errors, "bio", bio, "Bio is required") {
        return;
    }
    let len = chars(bio);
    if len < 50 {
        errors.add("bio", "Bio must be at least 50 characters");
    } else if len > 1000 {
        errors.add("bio", "Bio must be less than 1000 characters");
    }
}

fn check_years(errors: &mut ValidationErrors, years: i64) {
    if years < 0 {
        errors.add("years_experience", "Experience cannot be negative");
    } else if years > 60 {
        errors.add("years_experience", "Experience seems too high");
    }
}

pub fn validate_credentials(form: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &form.email);
    if form.password.is_empty() {
        errors.add("password", "Password is required");
    } else if form.password.chars().count() < 6 {
        errors.add("password", "Password must be at least 6 characters");
    }
    errors.into_result()
}

/// Sign-up rules shared by both roles plus the role-specific ones.
/// `today` bounds the patient's date of birth.
pub fn validate_registration(form: &Registration, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if required(&mut errors, "full_name", &form.full_name, "Full name is required")
        && chars(&form.full_name) < 2
    {
        errors.add("full_name", "Name must be at least 2 characters");
    }
    check_email(&mut errors, &form.email);
    check_new_password(&mut errors, &form.password, &form.confirm_password);
    if required(&mut errors, "phone", &form.phone, "Phone number is required")
        && !PHONE_RE.is_match(form.phone.trim())
    {
        errors.add("phone", "Invalid phone number format");
    }

    match form.user_type {
        UserRole::Patient => {
            match form.date_of_birth {
                None => errors.add("date_of_birth", "Date of birth is required"),
                Some(dob) if dob > today => {
                    errors.add("date_of_birth", "Date of birth cannot be in the future")
                }
                Some(_) => {}
            }
            let concern = form.primary_concern.as_deref().unwrap_or("");
            if required(&mut errors, "primary_concern", concern, "Primary concern is required")
                && chars(concern) < 10
            {
                errors.add(
                    "primary_concern",
                    "Please provide more details about your primary concern",
                );
            }
        }
        UserRole::Therapist => {
            required(
                &mut errors,
                "specialization",
                form.specialization.as_deref().unwrap_or(""),
                "Specialization is required",
            );
            required(
                &mut errors,
                "license_number",
                form.license_number.as_deref().unwrap_or(""),
                "License number is required",
            );
            match form.years_experience {
                None => errors.add("years_experience", "Years of experience is required"),
                Some(years) => check_years(&mut errors, years),
            }
            check_bio(&mut errors, form.bio.as_deref().unwrap_or(""));
        }
    }

    errors.into_result()
}

pub fn validate_therapist_profile(input: &TherapistProfileInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_bio(&mut errors, &input.bio);
    if !(50.0..=500.0).contains(&input.hourly_rate) {
        let message = if input.hourly_rate < 50.0 {
            "Rate must be at least $50"
        } else {
            "Rate must be less than $500"
        };
        errors.add("hourly_rate", message);
    }
    check_years(&mut errors, input.years_experience as i64);
    required(
        &mut errors,
        "location",
        input.location.as_deref().unwrap_or(""),
        "Location is required",
    );
    if let Some(url) = input.avatar_url.as_deref().filter(|u| !u.trim().is_empty()) {
        if !URL_RE.is_match(url.trim()) {
            errors.add("avatar_url", "Must be a valid URL");
        }
    }
    errors.into_result()
}

pub fn validate_blog_post(draft: &BlogDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if required(&mut errors, "title", &draft.title, "Title is required") {
        let len = chars(&draft.title);
        if len < 5 {
            errors.add("title", "Title must be at least 5 characters");
        } else if len > 200 {
            errors.add("title", "Title must be less than 200 characters");
        }
    }
    if required(&mut errors, "content", &draft.content, "Content is required")
        && chars(&draft.content) < 50
    {
        errors.add("content", "Content must be at least 50 characters");
    }
    errors.into_result()
}

pub fn validate_note(draft: &NoteDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if required(&mut errors, "title", &draft.title, "Title is required")
        && chars(&draft.title) > 100
    {
        errors.add("title", "Title must be less than 100 characters");
    }
    required(&mut errors, "content", &draft.content, "Content is required");
    errors.into_result()
}

pub fn validate_group(draft: &GroupDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if required(&mut errors, "name", &draft.name, "Group name is required") {
        let len = chars(&draft.name);
        if len < 3 {
            errors.add("name", "Group name must be at least 3 characters");
        } else if len > 100 {
            errors.add("name", "Group name must be less than 100 characters");
        }
    }
    if required(&mut errors, "description", &draft.description, "Description is required") {
        let len = chars(&draft.description);
        if len < 20 {
            errors.add("description", "Description must be at least 20 characters");
        } else if len > 500 {
            errors.add("description", "Description must be less than 500 characters");
        }
    }
    required(&mut errors, "category", &draft.category, "Category is required");
    errors.into_result()
}

pub fn validate_group_post(draft: &GroupPostDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    required(&mut errors, "content", &draft.content, "Post content is required");
    errors.into_result()
}
