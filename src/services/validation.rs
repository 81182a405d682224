use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+@([A-Za-z0-9_-]+\.)+[A-Za-z0-9_-]{2,4}$")
        .expect("EMAIL_REGEX: invalid regex pattern")
});

// ASCII letters, digits and underscores only.
static USER_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{4,100}$").expect("USER_TAG_REGEX: invalid regex pattern")
});

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt ignores everything past 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_POST_LENGTH: usize = 500;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Ids come from path segments and bodies; only positive ones can exist.
pub fn validate_id(id: i32) -> AppResult<i32> {
    if id <= 0 {
        return Err(AppError::bad_request("Invalid ID"));
    }
    Ok(id)
}

pub fn validate_ids(ids: &[i32]) -> AppResult<()> {
    ids.iter().try_for_each(|id| validate_id(*id).map(|_| ()))
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::bad_request("Invalid email format"));
    }
    Ok(())
}

pub fn validate_user_tag(user_tag: &str) -> AppResult<()> {
    if !USER_TAG_REGEX.is_match(user_tag) {
        return Err(AppError::bad_request(
            "User tag must be 4 to 100 characters long and can only contain letters, numbers and underscores",
        ));
    }
    Ok(())
}

/// Minimum length plus one lowercase, one uppercase, one digit and one
/// character that is none of those.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::bad_request(
            "Password cannot be longer than 72 bytes",
        ));
    }

    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if !(long_enough && has_lower && has_upper && has_digit && has_special) {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters long and contain an uppercase letter, a lowercase letter, a number and a special character",
        ));
    }
    Ok(())
}

pub fn validate_post_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::bad_request("Post content cannot be empty"));
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(AppError::bad_request(
            "Post content cannot be longer than 500 characters",
        ));
    }
    Ok(())
}

/// Shared by groups and lists.
pub fn validate_name(name: &str) -> AppResult<()> {
    let length = name.trim().chars().count();
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(AppError::bad_request(
            "Name must be between 1 and 100 characters long",
        ));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> AppResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(
            AppError::bad_request("Description cannot be longer than 500 characters"),
        ),
        _ => Ok(()),
    }
}
