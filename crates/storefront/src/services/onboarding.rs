//! Session and URL adapters for the consultation wizard.
//!
//! The wizard in `wellspring_core::onboarding` reaches its answers through a
//! [`KeyValueStore`] and its current step through a [`StepIndicator`]. Here
//! the answers live in the visitor's session and the step in the `?step=`
//! query parameter.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tower_sessions::Session;
use wellspring_core::observer::Observer;
use wellspring_core::onboarding::{
    ANSWERS_KEY, KeyValueStore, Step, StepController, StepIndicator, WizardEvent,
};

use crate::error::add_breadcrumb;

/// The wizard as the storefront drives it.
pub type Wizard = StepController<SessionStore, QueryStepIndicator>;

/// Path of the consultation page.
pub const CONSULTATION_PATH: &str = "/consultation";

// =============================================================================
// Answer store
// =============================================================================

/// Per-request snapshot of the session's answer blob.
///
/// Reads and writes happen in memory; [`SessionStore::flush`] writes the
/// changed keys back before the response is sent.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: HashMap<String, String>,
    dirty: BTreeSet<String>,
}

impl SessionStore {
    /// Snapshot the answer blob from `session`.
    ///
    /// A value of the wrong shape reads as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be reached.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        let mut entries = HashMap::new();
        match session.get::<String>(ANSWERS_KEY).await {
            Ok(Some(raw)) => {
                entries.insert(ANSWERS_KEY.to_string(), raw);
            }
            Ok(None) => {}
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable consultation answers");
            }
            Err(e) => return Err(e),
        }

        Ok(Self {
            entries,
            dirty: BTreeSet::new(),
        })
    }

    /// Whether anything was written since the snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Write the changed keys back to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn flush(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for key in &self.dirty {
            if let Some(value) = self.entries.get(key) {
                session.insert(key, value).await?;
            }
        }
        Ok(())
    }
}

impl KeyValueStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
    }
}

// =============================================================================
// Step indicator
// =============================================================================

/// The `?step=` query parameter of the current request.
///
/// Writes are recorded as a navigation target; the route turns a target into
/// a redirect so the URL always shows the step being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStepIndicator {
    raw: Option<String>,
    target: Option<Step>,
}

impl QueryStepIndicator {
    #[must_use]
    pub const fn from_query(raw: Option<String>) -> Self {
        Self { raw, target: None }
    }

    /// Step the indicator was moved to during this request, if any.
    #[must_use]
    pub const fn target(&self) -> Option<Step> {
        self.target
    }

    /// URL of the consultation showing `step`.
    #[must_use]
    pub fn location(step: Step) -> String {
        format!("{CONSULTATION_PATH}?step={step}")
    }
}

impl StepIndicator for QueryStepIndicator {
    fn current(&self) -> Option<Step> {
        self.target
            .or_else(|| self.raw.as_deref().and_then(Step::parse))
    }

    fn is_present(&self) -> bool {
        self.target.is_some() || self.raw.is_some()
    }

    fn set(&mut self, step: Step) {
        self.target = Some(step);
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Logs wizard transitions and leaves a Sentry breadcrumb for each.
#[derive(Debug, Clone, Copy, Default)]
pub struct WizardEventLogger;

impl Observer<WizardEvent> for WizardEventLogger {
    fn notify(&self, event: &WizardEvent) {
        match event {
            WizardEvent::StepChanged { from, to } => {
                tracing::debug!(from = %from, to = %to, "Consultation step changed");
                let (from, to) = (from.to_string(), to.to_string());
                add_breadcrumb(
                    "consultation",
                    "Step changed",
                    Some(&[("from", from.as_str()), ("to", to.as_str())]),
                );
            }
            WizardEvent::AnswerSaved { path } => {
                tracing::debug!(path = %path, "Consultation answer saved");
                add_breadcrumb("consultation", "Answer saved", Some(&[("path", path.as_str())]));
            }
            WizardEvent::ValidationFailed { step, error } => {
                tracing::info!(step = %step, error = %error, "Consultation step rejected");
                let step = step.to_string();
                add_breadcrumb(
                    "consultation",
                    "Validation failed",
                    Some(&[("step", step.as_str())]),
                );
            }
        }
    }
}

/// Build the wizard for one request: answers from `session`, step from the
/// raw `?step=` value.
///
/// # Errors
///
/// Returns an error if the session store cannot be reached.
pub async fn open_wizard(
    session: &Session,
    raw_step: Option<String>,
) -> Result<Wizard, tower_sessions::session::Error> {
    let store = SessionStore::load(session).await?;
    let mut wizard = StepController::new(store, QueryStepIndicator::from_query(raw_step));
    wizard.subscribe(Arc::new(WizardEventLogger));
    Ok(wizard)
}

/// Persist what the wizard wrote and return where it navigated to.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn close_wizard(
    wizard: Wizard,
    session: &Session,
) -> Result<Option<Step>, tower_sessions::session::Error> {
    let (store, indicator) = wizard.into_parts();
    if store.is_dirty() {
        store.flush(session).await?;
    }
    Ok(indicator.target())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tower_sessions::MemoryStore;
    use wellspring_core::onboarding::{StepError, StepForm};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_indicator_reads_raw_until_moved() {
        let mut indicator = QueryStepIndicator::from_query(Some("4".to_string()));
        assert_eq!(indicator.current(), Step::new(4));
        assert_eq!(indicator.target(), None);

        indicator.set(Step::new(5).unwrap());
        assert_eq!(indicator.current(), Step::new(5));
        assert_eq!(indicator.target(), Step::new(5));
    }

    #[test]
    fn test_indicator_garbage_is_present_but_invalid() {
        let indicator = QueryStepIndicator::from_query(Some("abc".to_string()));
        assert!(indicator.is_present());
        assert_eq!(indicator.current(), None);
        assert!(!QueryStepIndicator::from_query(None).is_present());
    }

    #[test]
    fn test_location() {
        assert_eq!(
            QueryStepIndicator::location(Step::LAST),
            "/consultation?step=14"
        );
    }

    #[tokio::test]
    async fn test_answers_survive_requests() {
        let session = session();

        let mut wizard = open_wizard(&session, Some("2".to_string())).await.unwrap();
        wizard.persist("goal", json!("lose-weight")).unwrap();
        let form = StepForm::from([("goal".to_string(), "lose-weight".to_string())]);
        assert_eq!(wizard.commit(Step::new(2).unwrap(), &form), Ok(Step::new(3).unwrap()));
        assert_eq!(close_wizard(wizard, &session).await.unwrap(), Step::new(3));

        let mut wizard = open_wizard(&session, Some("3".to_string())).await.unwrap();
        wizard.back(2);
        let prefill = wizard.prefill(Step::new(2).unwrap());
        assert_eq!(prefill.get("goal").map(String::as_str), Some("lose-weight"));
    }

    #[tokio::test]
    async fn test_rejected_commit_writes_nothing() {
        let session = session();

        let mut wizard = open_wizard(&session, Some("3".to_string())).await.unwrap();
        let result = wizard.commit(Step::new(3).unwrap(), &StepForm::new());
        assert!(matches!(result, Err(StepError::MissingFields(_))));
        assert!(!wizard.store().is_dirty());
        assert_eq!(close_wizard(wizard, &session).await.unwrap(), None);
        assert!(session.get::<String>(ANSWERS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_blob_reads_empty() {
        let session = session();
        session.insert(ANSWERS_KEY, 42).await.unwrap();

        let wizard = open_wizard(&session, None).await.unwrap();
        assert!(wizard.load().is_empty());
    }
}
