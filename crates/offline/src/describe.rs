//! Human-readable descriptions for network and HTTP error codes.

/// Short phrase for a socket error code or HTTP status.
pub fn describe_error_code(code: &str) -> &'static str {
    match code {
        "ECONNREFUSED" => "connection refused",
        "ENOTFOUND" => "host not found",
        "ETIMEDOUT" => "timed out",
        "ECONNRESET" => "connection reset",
        "EHOSTUNREACH" => "host unreachable",
        "ENETUNREACH" => "network unreachable",
        "401" => "unauthorized",
        "403" => "forbidden",
        "404" => "endpoint not found",
        "500" => "internal server error",
        "502" => "bad gateway",
        "503" => "service unavailable",
        _ => "unknown error",
    }
}
