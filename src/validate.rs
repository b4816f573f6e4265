use crate::error::RejectReason;

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "m4a", "aac", "wma", "webm", "mp4", "mov",
];

/// 20 MiB.
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(RejectReason),
}

impl ValidationResult {
    pub fn into_result(self) -> Result<(), RejectReason> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(reason) => Err(reason),
        }
    }
}

/// Lowercased text after the final `.`. A name without a dot yields the
/// whole name, which will never match the allow-list.
pub fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

pub fn is_allowed_extension(name: &str) -> bool {
    let ext = extension_of(name);
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// Size is checked first, so an oversized file with a bad extension
/// reports `SizeExceeded`.
pub fn validate(name: &str, size_bytes: u64) -> ValidationResult {
    if size_bytes > MAX_FILE_SIZE {
        return ValidationResult::Invalid(RejectReason::SizeExceeded);
    }
    if !is_allowed_extension(name) {
        return ValidationResult::Invalid(RejectReason::ExtensionRejected);
    }
    ValidationResult::Valid
}

pub fn list_accepted_formats() -> String {
    let mut output = String::new();
    output.push_str("\nAccepted formats:");
    for ext in ALLOWED_EXTENSIONS {
        output.push_str(&format!(" {ext}"));
    }
    output.push_str(&format!(
        "\nMaximum file size: {} MB\n",
        MAX_FILE_SIZE / (1024 * 1024)
    ));
    output
}
