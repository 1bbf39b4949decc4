//! Custom validation functions for configuration.
//!
//! Shared validation logic used across the configuration modules.

use validator::ValidationError;

/// Validate a `host:port` sink address without resolving it.
pub fn validate_sink_address(address: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^\S+:\d{1,5}$").map_err(|_| ValidationError::new("invalid_regex"))?;
    let port_ok = address
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .is_some_and(|port| port > 0);

    if re.is_match(address) && port_ok {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_sink_address"))
    }
}

/// Validate one protocol filter expression (e.g. "tcp", "udp port 53").
pub fn validate_filter(filter: &str) -> Result<(), ValidationError> {
    let valid = !filter.trim().is_empty()
        && filter
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || ".:=<>()&|!".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_filter"))
    }
}

/// Validate the per-interface filter list: non-empty, each entry valid.
pub fn validate_filters(filters: &[String]) -> Result<(), ValidationError> {
    if filters.is_empty() {
        return Err(ValidationError::new("empty_filter_list"));
    }
    for filter in filters {
        validate_filter(filter)?;
    }
    Ok(())
}

/// Validate a dotted IPv4 address prefix such as "10.8." or "192.168.1.".
pub fn validate_address_prefix(prefix: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^(\d{1,3}\.){1,3}\d{0,3}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(prefix) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_address_prefix"))
    }
}
