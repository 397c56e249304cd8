//! EC2 error classification
//!
//! Recovers the EC2 error code from an `anyhow::Error` chain so the
//! waiters can tell "not created yet" from real failures, and so the CLI
//! can print a hint for the common failure modes.

use thiserror::Error;

/// EC2 error categories
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (or is not visible yet)
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// A resource with the same name already exists
    #[error("Resource already exists ({code}): {message}")]
    AlreadyExists { code: String, message: String },

    /// Resource is not in a state that allows the operation
    #[error("Resource in incorrect state ({code}): {message}")]
    IncorrectState { code: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Any other AWS SDK error
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists { .. })
    }

    /// The EC2 error code, when one was recovered
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::AlreadyExists { code, .. }
            | AwsError::IncorrectState { code, .. } => Some(code),
            AwsError::Throttled => None,
            AwsError::Sdk { code, .. } => code.as_deref(),
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Throttled => Some(THROTTLED_SUGGESTION.to_string()),
            _ => self.code().and_then(suggestion_for_code),
        }
    }
}

const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidVolume.NotFound",
    "InvalidSnapshot.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidKeyPair.NotFound",
    "InvalidLaunchTemplateId.NotFound",
];

const ALREADY_EXISTS_CODES: &[&str] = &[
    "InvalidGroup.Duplicate",
    "InvalidPermission.Duplicate",
    "InvalidKeyPair.Duplicate",
    "InvalidLaunchTemplateName.AlreadyExistsException",
];

const INCORRECT_STATE_CODES: &[&str] = &["IncorrectInstanceState", "IncorrectState", "VolumeInUse"];

const THROTTLING_CODES: &[&str] = &["Throttling", "RequestLimitExceeded"];

const THROTTLED_SUGGESTION: &str = "AWS API rate limit hit. Wait a moment and run again.";

/// Classify an EC2 error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists {
            code: c.to_string(),
            message,
        },
        Some(c) if INCORRECT_STATE_CODES.contains(&c) => AwsError::IncorrectState {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an `anyhow::Error` by extracting the EC2 error code.
///
/// Walks the chain for an `aws_sdk_ec2::Error` (the client converts every
/// operation error into it). Falls back to scanning the Debug representation
/// for a known code.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    use aws_sdk_ec2::error::ProvideErrorMetadata;

    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<aws_sdk_ec2::Error>() {
            return classify_aws_error(e.code(), e.message());
        }
    }

    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&error.to_string()));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Map a NotFound error to `Ok(None)`, leaving other errors as they are.
///
/// Resources polled right after creation can briefly be invisible to
/// Describe calls.
pub fn not_found_as_none<T>(result: anyhow::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Extract an EC2 error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES
        .iter()
        .chain(ALREADY_EXISTS_CODES)
        .chain(INCORRECT_STATE_CODES)
        .chain(THROTTLING_CODES)
        .chain(SUGGESTIONS.iter().map(|(c, _)| c));
    for code in known {
        if debug_str.contains(code) {
            return Some((*code).to_string());
        }
    }

    // `code: Some("...")` as printed by ErrorMetadata
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InvalidGroup.Duplicate",
        "A security group with this name already exists in the default VPC. Delete it and run again.",
    ),
    (
        "InvalidKeyPair.Duplicate",
        "A key pair with this name already exists. Delete it (and its local .pem) and run again.",
    ),
    (
        "InvalidLaunchTemplateName.AlreadyExistsException",
        "A launch template with this name already exists. Delete it and run again.",
    ),
    (
        "InvalidAMIID.NotFound",
        "The AMI is region specific. It only exists in us-east-1.",
    ),
    (
        "InvalidAMIID.Malformed",
        "The AMI is region specific. It only exists in us-east-1.",
    ),
    ("InsufficientInstanceCapacity", "Try again later."),
    (
        "InstanceLimitExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "VcpuLimitExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "UnauthorizedOperation",
        "The credentials in use lack EC2 permissions. Check --aws-profile.",
    ),
    (
        "AuthFailure",
        "AWS could not validate the credentials. Check --aws-profile or AWS_* variables.",
    ),
];

fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(*code), Some("some message"));
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
            assert_eq!(err.code(), Some(*code));
        }
    }

    #[test]
    fn already_exists_codes() {
        for code in ALREADY_EXISTS_CODES {
            let err = classify_aws_error(Some(*code), Some("msg"));
            assert!(
                err.is_already_exists(),
                "Expected AlreadyExists for code: {code}"
            );
        }
    }

    #[test]
    fn incorrect_state_and_throttling() {
        let err = classify_aws_error(Some("IncorrectInstanceState"), Some("pending"));
        assert!(matches!(err, AwsError::IncorrectState { .. }));

        for code in THROTTLING_CODES {
            let err = classify_aws_error(Some(*code), None);
            assert!(matches!(err, AwsError::Throttled));
            assert!(err.suggestion().is_some());
        }
    }

    #[test]
    fn unknown_and_missing_codes() {
        let err = classify_aws_error(Some("SomeNewError"), Some("details"));
        assert!(matches!(err, AwsError::Sdk { .. }));
        assert_eq!(err.code(), Some("SomeNewError"));

        let err = classify_aws_error(None, Some("something failed"));
        assert!(matches!(err, AwsError::Sdk { code: None, .. }));
    }

    fn sdk_error(code: &str) -> anyhow::Error {
        use aws_sdk_ec2::error::ErrorMetadata;
        use aws_sdk_ec2::operation::describe_volumes::DescribeVolumesError;

        let meta = ErrorMetadata::builder()
            .code(code)
            .message("The volume 'vol-1' does not exist.")
            .build();
        anyhow::Error::new(aws_sdk_ec2::Error::from(DescribeVolumesError::generic(meta)))
    }

    #[test]
    fn classify_anyhow_reads_sdk_error_through_context() {
        use anyhow::Context;

        let err = Err::<(), _>(sdk_error("InvalidVolume.NotFound"))
            .context("Failed to describe volume")
            .unwrap_err();
        let classified = classify_anyhow_error(&err);
        assert!(classified.is_not_found());
        assert_eq!(classified.code(), Some("InvalidVolume.NotFound"));

        let err = sdk_error("UnauthorizedOperation");
        let classified = classify_anyhow_error(&err);
        assert_eq!(classified.code(), Some("UnauthorizedOperation"));
        assert!(classified.suggestion().is_some());
    }

    #[test]
    fn not_found_is_treated_as_absent() {
        assert_eq!(not_found_as_none(Ok(7)).unwrap(), Some(7));
        assert_eq!(
            not_found_as_none::<u32>(Err(sdk_error("InvalidSnapshot.NotFound"))).unwrap(),
            None
        );

        let err = not_found_as_none::<u32>(Err(sdk_error("IncorrectState"))).unwrap_err();
        assert!(matches!(
            classify_anyhow_error(&err),
            AwsError::IncorrectState { .. }
        ));
    }

    #[test]
    fn classify_anyhow_falls_back_to_debug_string() {
        let err = anyhow::anyhow!("InvalidVolume.NotFound: The volume 'vol-1' does not exist")
            .context("Failed to describe volume");
        assert!(classify_anyhow_error(&err).is_not_found());

        let err = anyhow::anyhow!("connection refused");
        assert!(matches!(
            classify_anyhow_error(&err),
            AwsError::Sdk { code: None, .. }
        ));
    }

    #[test]
    fn extract_code_from_code_field() {
        let debug_str = r#"ErrorMetadata { code: Some("SomeRandomCode"), message: "fail" }"#;
        assert_eq!(
            extract_error_code(debug_str).as_deref(),
            Some("SomeRandomCode")
        );
        assert!(extract_error_code("connection refused").is_none());
    }

    #[test]
    fn duplicate_resources_have_suggestions() {
        for code in ALREADY_EXISTS_CODES
            .iter()
            .filter(|c| **c != "InvalidPermission.Duplicate")
        {
            let err = classify_aws_error(Some(*code), Some("exists"));
            assert!(err.suggestion().is_some(), "No suggestion for code: {code}");
        }
        assert!(suggestion_for_code("SomeUnknownCode").is_none());
    }
}
