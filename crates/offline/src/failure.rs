/// One caller's view of a failed operation during an outage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineFailure {
    /// Operation name, also the deduplication key.
    pub operation: String,
    pub caller: Option<String>,
    pub error_code: Option<String>,
    pub url: Option<String>,
    pub details: Vec<String>,
}

impl OfflineFailure {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            caller: None,
            error_code: None,
            url: None,
            details: Vec::new(),
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// `"<operation> failed: <code> - <description> at <url>"`.
    pub fn summary(&self) -> String {
        let mut line = format!("{} failed", self.operation);
        if let Some(code) = &self.error_code {
            line.push_str(&format!(
                ": {} - {}",
                code,
                crate::describe::describe_error_code(code)
            ));
        }
        if let Some(url) = &self.url {
            line.push_str(&format!(" at {}", url));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_summary() {
        let failure = OfflineFailure::new("Session creation")
            .with_error_code("ECONNREFUSED")
            .with_url("https://api.example.com/v1/sessions");
        assert_eq!(
            failure.summary(),
            "Session creation failed: ECONNREFUSED - connection refused at https://api.example.com/v1/sessions"
        );
    }

    #[test]
    fn test_summary_without_code_or_url() {
        assert_eq!(
            OfflineFailure::new("Machine registration").summary(),
            "Machine registration failed"
        );
    }

    #[test]
    fn test_builder_collects_details() {
        let failure = OfflineFailure::new("Push token")
            .with_caller("push")
            .with_detail("first")
            .with_detail("second");
        assert_eq!(failure.caller.as_deref(), Some("push"));
        assert_eq!(failure.details, vec!["first", "second"]);
    }
}
