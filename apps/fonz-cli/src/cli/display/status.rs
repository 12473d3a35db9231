//! Status indicators for per-explore and per-field result lines.

pub const STATUS_SUCCESS: &str = "✓";

pub const STATUS_WARNING: &str = "⚠️";

pub const STATUS_ERROR: &str = "✗";

/// Formats a passing item
///
/// # Example
/// ```
/// let msg = format_success("ecommerce/users", "12 fields passed");
/// // Returns: "✓ ecommerce/users: 12 fields passed"
/// ```
pub fn format_success(item: &str, message: &str) -> String {
    format!("{} {}: {}", STATUS_SUCCESS, item, message)
}

/// Formats an item that passed but deserves attention, such as a slow query
pub fn format_warning(item: &str, message: &str) -> String {
    format!("{}  {}: {}", STATUS_WARNING, item, message)
}

/// Formats a failing item
///
/// # Example
/// ```
/// let msg = format_error("users.status", "Unrecognized name: status");
/// // Returns: "✗ users.status: Unrecognized name: status"
/// ```
pub fn format_error(item: &str, message: &str) -> String {
    format!("{} {}: {}", STATUS_ERROR, item, message)
}
