//! Deployment parameter validation

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ValidationError;
use crate::models::deployment::{DeploymentRequest, DEFAULT_LOCALE};

pub const IDENTIFIER_REASON: &str = "only letters, numbers and dashes allowed";
pub const EMAIL_REASON: &str = "not a valid email";
pub const SPACES_REASON: &str = "no spaces allowed in arguments";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]*$").expect("identifier pattern"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern")
});

/// Validate a deployment request and normalize its locale
///
/// Rules are checked in a fixed order and the first failure is returned:
/// instance name, user name, email, then whitespace anywhere in the request.
pub fn validate(mut request: DeploymentRequest) -> Result<DeploymentRequest, ValidationError> {
    check_pattern(
        "instanceName",
        &request.instance_name,
        &IDENTIFIER,
        IDENTIFIER_REASON,
    )?;
    check_pattern("userName", &request.user_name, &IDENTIFIER, IDENTIFIER_REASON)?;
    check_pattern("userEmail", &request.user_email, &EMAIL, EMAIL_REASON)?;

    if request.text_values().into_iter().any(has_whitespace) {
        return Err(ValidationError::aggregate(SPACES_REASON));
    }

    if request.locale.as_deref().map_or(true, str::is_empty) {
        request.locale = Some(DEFAULT_LOCALE.to_string());
    }

    Ok(request)
}

fn check_pattern(
    field: &'static str,
    value: &str,
    pattern: &Regex,
    reason: &str,
) -> Result<(), ValidationError> {
    // Whitespace is reported as such even where the pattern would also reject it
    if has_whitespace(value) {
        return Err(ValidationError::field(field, SPACES_REASON));
    }
    if !pattern.is_match(value) {
        return Err(ValidationError::field(field, reason));
    }
    Ok(())
}

fn has_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}
