//! Shared constants for structured API errors.

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_AUTHENTICATION: &str = "authentication_error";
pub const ERROR_TYPE_PERMISSION: &str = "permission_error";
pub const ERROR_TYPE_RATE_LIMIT: &str = "rate_limit_error";
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";
pub const ERROR_TYPE_SERVER: &str = "server_error";

pub const ERROR_CODE_MODEL_NOT_FOUND: &str = "model_not_found";
pub const ERROR_CODE_INVALID_MODEL: &str = "invalid_model";
pub const ERROR_CODE_UPSTREAM: &str = "upstream_error";
pub const ERROR_CODE_UNAUTHORIZED: &str = "invalid_api_key";
pub const ERROR_CODE_FORBIDDEN: &str = "forbidden";
pub const ERROR_CODE_BAD_REQUEST: &str = "bad_request";
pub const ERROR_CODE_INTERNAL: &str = "internal_error";

/// Map a status code to the error `type` string used in JSON bodies.
pub fn error_type_for_status(status: u16) -> &'static str {
    match status {
        400 | 404 | 405 | 413 | 415 | 422 => ERROR_TYPE_INVALID_REQUEST,
        401 => ERROR_TYPE_AUTHENTICATION,
        403 => ERROR_TYPE_PERMISSION,
        429 => ERROR_TYPE_RATE_LIMIT,
        502..=504 => ERROR_TYPE_UPSTREAM,
        500..=599 => ERROR_TYPE_SERVER,
        _ => ERROR_TYPE_API,
    }
}
