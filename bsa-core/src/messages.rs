//! Human-readable messages for API error codes
//!
//! Generic server codes name the offending field through the word `object`
//! (e.g. `object_already_exists` with objects `["email.unique"]`). The
//! field from the violation list is substituted in, and the specific code
//! wins when the table knows it. Unknown codes are shown verbatim.

/// Code → message table
const CODES: &[(&str, &str)] = &[
    ("email_already_exists", "Email is not available"),
    ("invalid_email_password", "Invalid Email/password"),
    ("session_expired", "Your session has expired, please log in again"),
    ("not_found", "Record not found"),
    ("missing_id", "This record has no id and cannot be updated"),
    ("invalid_payload", "The form could not be sent"),
    ("invalid_response", "The server sent an unexpected response"),
    ("storage_error", "The session could not be saved on this machine"),
    ("CONNECTION_ERROR", "Could not reach the server"),
    ("TIMEOUT_ERROR", "The server took too long to respond"),
    ("NETWORK_ERROR", "Network error"),
];

fn lookup(code: &str) -> Option<&'static str> {
    CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// Message for an error code and its optional field violations
pub fn describe_error(code: &str, objects: Option<&[String]>) -> String {
    let mut resolved = code.to_string();

    for object in objects.unwrap_or_default() {
        let field = object.split('.').next().unwrap_or(object.as_str());
        let candidate = code.replacen("object", field, 1);
        if lookup(&candidate).is_some() {
            resolved = candidate;
        }
    }

    lookup(&resolved)
        .map(String::from)
        .unwrap_or(resolved)
}
