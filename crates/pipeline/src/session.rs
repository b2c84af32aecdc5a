//! Run-scoped ownership of the single model session
//!
//! The generation session is stateful and not safe for concurrent use;
//! every prompt in a pipeline run goes through one `SessionManager`,
//! which serializes calls with a mutex: acquire, execute to completion,
//! release. The manager is created per run and dropped with it, which
//! releases the session.

use contextflow_common::errors::Result;
use contextflow_common::metrics;
use contextflow_common::model::{Availability, LanguageModel, ModelSession};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Owns at most one live session per pipeline run
///
/// Two states: uninitialized (no session yet) and active. Creation is
/// idempotent within the run; the first successful creation transitions
/// to active and later calls reuse the same session, preserving its
/// conversational state across the run's prompt sequence.
pub struct SessionManager {
    model: Arc<dyn LanguageModel>,
    system_prompt: String,
    session: Mutex<Option<Box<dyn ModelSession>>>,
}

impl SessionManager {
    pub fn new(model: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            session: Mutex::new(None),
        }
    }

    /// Query the capability's readiness; no session is created
    pub async fn check_availability(&self) -> Availability {
        self.model.availability().await
    }

    /// Create the session if it does not exist yet
    ///
    /// Creation failure propagates: without a session no pipeline
    /// operation can proceed.
    pub async fn ensure_session(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session = self.model.create_session(&self.system_prompt).await?;
            tracing::info!(model = self.model.model_name(), "Model session created");
            *guard = Some(session);
        }
        Ok(())
    }

    /// Issue one prompt against the run's session
    ///
    /// The lock is held until the model replies, so prompts execute
    /// strictly one at a time in program order. `kind` labels the prompt
    /// in logs and metrics.
    pub async fn prompt(&self, kind: &str, text: &str) -> Result<String> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session = self.model.create_session(&self.system_prompt).await?;
            tracing::info!(model = self.model.model_name(), "Model session created");
            *guard = Some(session);
        }
        let session = guard.as_mut().expect("session initialized above");

        let start = Instant::now();
        match session.prompt(text).await {
            Ok(reply) => {
                let elapsed = start.elapsed().as_secs_f64();
                metrics::record_prompt(elapsed, kind, true);
                tracing::debug!(kind, latency_ms = (elapsed * 1000.0) as u64, "Prompt completed");
                Ok(reply)
            }
            Err(e) => {
                metrics::record_prompt(start.elapsed().as_secs_f64(), kind, false);
                tracing::warn!(kind, error = %e, "Prompt failed");
                Err(e)
            }
        }
    }

    /// Whether the session has been created
    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextflow_common::model::MockLanguageModel;

    #[tokio::test]
    async fn test_ensure_session_is_idempotent() {
        let model = Arc::new(MockLanguageModel::new());
        let manager = SessionManager::new(model.clone(), "system");

        assert!(!manager.is_active().await);
        manager.ensure_session().await.unwrap();
        manager.ensure_session().await.unwrap();
        assert!(manager.is_active().await);
        assert_eq!(model.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_prompt_reuses_single_session() {
        let model = Arc::new(MockLanguageModel::with_replies(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
        ]));
        let manager = SessionManager::new(model.clone(), "system");

        assert_eq!(manager.prompt("summary", "a").await.unwrap(), "one");
        assert_eq!(manager.prompt("summary", "b").await.unwrap(), "two");
        assert_eq!(model.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_creation_failure_propagates() {
        let model = Arc::new(MockLanguageModel::new().failing_creation());
        let manager = SessionManager::new(model, "system");

        assert!(manager.ensure_session().await.is_err());
        assert!(!manager.is_active().await);
    }

    #[tokio::test]
    async fn test_availability_passthrough() {
        let model = Arc::new(
            MockLanguageModel::new().with_availability(Availability::NeedsSetup),
        );
        let manager = SessionManager::new(model, "system");
        assert_eq!(manager.check_availability().await, Availability::NeedsSetup);
    }
}
