//! Hook for the external alert classifier. The service runs fine without
//! one; enrichment is strictly best-effort.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct AlertAnalysis {
    pub severity: String,
    pub status: String,
    pub summary: String,
    pub affected_segments: Option<String>,
}

#[derive(Debug)]
pub struct ClassifierError(pub String);

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "classifier failed: {}", self.0)
    }
}

impl std::error::Error for ClassifierError {}

#[async_trait]
pub trait AlertClassifier: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn analyze(
        &self,
        alert_id: &str,
        header_text: &str,
        description_text: &str,
    ) -> Result<AlertAnalysis, ClassifierError>;
}

/// Used when no classifier is configured; alerts persist without AI fields.
pub struct NoopClassifier;

#[async_trait]
impl AlertClassifier for NoopClassifier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn analyze(
        &self,
        _alert_id: &str,
        _header_text: &str,
        _description_text: &str,
    ) -> Result<AlertAnalysis, ClassifierError> {
        Err(ClassifierError("no classifier configured".to_owned()))
    }
}
