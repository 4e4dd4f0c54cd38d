use reqwest::StatusCode;

/// A non-fatal, user-facing warning.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn upstream_unavailable(status: StatusCode) -> Self {
        Self {
            title: "Server unavailable".to_string(),
            message: format!(
                "The server could not be reached ({}). Please try again in a moment.",
                status.as_u16()
            ),
        }
    }
}
