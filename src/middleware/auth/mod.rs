pub mod access;

/// Marker header on 401 responses (value `"true"`).
///
/// A cooperating host component reads it and skips its login-page redirect.
pub const SUPPRESS_REDIRECT_HEADER: &str = "x-suppress-forms-redirect";
