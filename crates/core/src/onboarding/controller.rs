//! Linear wizard navigation and answer capture.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::answers::Answers;
use super::catalog::{ACCOUNT_GROUP, FieldSpec, StepSpec, field_for_path, step_spec};
use super::indicator::StepIndicator;
use super::step::Step;
use super::store::{AnswerStore, KeyValueStore};
use crate::observer::{Observer, Observers};

/// Submitted or pre-filled values of one step, by field name.
pub type StepForm = BTreeMap<String, String>;

/// Message shown when the create-account step is missing its core fields.
pub const ACCOUNT_INCOMPLETE_MESSAGE: &str = "Please fill name, email and password";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Please fill in: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please fill name, email and password")]
    AccountIncomplete,

    #[error("unknown consultation field: {0}")]
    UnknownField(String),

    #[error("{0} is not stored")]
    TransientField(String),
}

/// State transitions announced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    StepChanged { from: Step, to: Step },
    AnswerSaved { path: String },
    ValidationFailed { step: Step, error: StepError },
}

/// Drives the consultation over an answer store and a step indicator.
///
/// The two ports are written independently: a commit saves answers first and
/// moves the indicator second.
pub struct StepController<S, I> {
    answers: AnswerStore<S>,
    indicator: I,
    observers: Observers<WizardEvent>,
}

impl<S: KeyValueStore, I: StepIndicator> StepController<S, I> {
    pub fn new(store: S, indicator: I) -> Self {
        Self {
            answers: AnswerStore::new(store),
            indicator,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn Observer<WizardEvent>>) {
        self.observers.subscribe(observer);
    }

    /// Make sure the indicator holds a step. Leaves any existing value alone,
    /// including an invalid one (which reads as the first step).
    pub fn initialize(&mut self) -> Step {
        if !self.indicator.is_present() {
            self.indicator.set(Step::FIRST);
        }
        self.current()
    }

    #[must_use]
    pub fn current(&self) -> Step {
        self.indicator.current().unwrap_or(Step::FIRST)
    }

    /// Move to step `n`, clamped into range.
    pub fn go_to(&mut self, n: i64) -> Step {
        let from = self.current();
        let to = Step::clamp(n);
        self.indicator.set(to);
        self.observers.emit(&WizardEvent::StepChanged { from, to });
        to
    }

    /// Navigate back to step `n`; same clamping as [`Self::go_to`].
    pub fn back(&mut self, n: i64) -> Step {
        self.go_to(n)
    }

    #[must_use]
    pub fn load(&self) -> Answers {
        self.answers.load()
    }

    /// Save one answer immediately, before its step is committed.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::UnknownField`] for paths outside the questionnaire
    /// and [`StepError::TransientField`] for fields that are never stored.
    pub fn persist(&mut self, path: &str, value: Value) -> Result<(), StepError> {
        let (_, field) =
            field_for_path(path).ok_or_else(|| StepError::UnknownField(path.to_string()))?;
        if field.transient {
            return Err(StepError::TransientField(path.to_string()));
        }
        self.answers.save_field(path, value);
        self.observers.emit(&WizardEvent::AnswerSaved {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Values to pre-fill `step`'s form with. Transient fields always start empty.
    #[must_use]
    pub fn prefill(&self, step: Step) -> StepForm {
        let spec = step_spec(step);
        let answers = self.load();

        spec.fields
            .iter()
            .filter(|field| field.persisted())
            .map(|field| {
                let own = answers.get_str(&spec.path(field)).filter(|v| !v.is_empty());
                let fallback = spec
                    .prefill_from
                    .and_then(|group| answers.get_str(&format!("{group}.{}", field.name)));
                let value = own.or(fallback).unwrap_or_default();
                (field.name.to_string(), value.to_string())
            })
            .collect()
    }

    /// Whether Continue is enabled for the in-progress values.
    #[must_use]
    pub fn continue_enabled(&self, step: Step, form: &StepForm) -> bool {
        missing_fields(step_spec(step), form).is_empty()
    }

    /// The Continue action: validate, save, then advance.
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] when a required field is blank; nothing is saved
    /// and the step does not change.
    pub fn commit(&mut self, step: Step, form: &StepForm) -> Result<Step, StepError> {
        let spec = step_spec(step);
        let missing = missing_fields(spec, form);
        if !missing.is_empty() {
            let error = if spec.group == Some(ACCOUNT_GROUP) {
                StepError::AccountIncomplete
            } else {
                StepError::MissingFields(missing)
            };
            self.observers.emit(&WizardEvent::ValidationFailed {
                step,
                error: error.clone(),
            });
            return Err(error);
        }

        self.save_step(spec, form);
        Ok(self.go_to(i64::from(step.get()) + 1))
    }

    fn save_step(&mut self, spec: &StepSpec, form: &StepForm) {
        let persisted: Vec<&FieldSpec> = spec.fields.iter().filter(|f| f.persisted()).collect();
        if persisted.is_empty() {
            return;
        }

        let mut answers = self.load();
        let mut saved = Vec::new();
        if let Some(group) = spec.group {
            let object: Map<String, Value> = persisted
                .iter()
                .map(|field| (field.name.to_string(), Value::String(form_value(form, field))))
                .collect();
            answers.set(group, Value::Object(object));
            saved.push(group.to_string());
        } else {
            for field in persisted {
                answers.set(field.name, Value::String(form_value(form, field)));
                saved.push(field.name.to_string());
            }
        }
        self.answers.save(&answers);

        for path in saved {
            self.observers.emit(&WizardEvent::AnswerSaved { path });
        }
    }

    pub const fn indicator(&self) -> &I {
        &self.indicator
    }

    pub const fn store(&self) -> &S {
        self.answers.store()
    }

    pub fn into_parts(self) -> (S, I) {
        (self.answers.into_inner(), self.indicator)
    }
}

fn form_value(form: &StepForm, field: &FieldSpec) -> String {
    form.get(field.name)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn missing_fields(spec: &StepSpec, form: &StepForm) -> Vec<&'static str> {
    spec.fields
        .iter()
        .filter(|field| field.required && form_value(form, field).is_empty())
        .map(|field| field.label)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::observer::Recorder;
    use crate::onboarding::indicator::MemoryIndicator;
    use crate::onboarding::store::{ANSWERS_KEY, MemoryStore};

    fn controller() -> StepController<MemoryStore, MemoryIndicator> {
        StepController::new(MemoryStore::new(), MemoryIndicator::new())
    }

    fn form(pairs: &[(&str, &str)]) -> StepForm {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn step(n: u8) -> Step {
        Step::new(n).unwrap()
    }

    #[test]
    fn test_initialize_sets_first_step_once() {
        let mut wizard = controller();
        assert_eq!(wizard.initialize(), Step::FIRST);
        wizard.go_to(4);
        assert_eq!(wizard.initialize().get(), 4);
        assert_eq!(wizard.indicator().writes(), 2);
    }

    #[test]
    fn test_initialize_leaves_invalid_indicator() {
        let mut wizard = StepController::new(MemoryStore::new(), MemoryIndicator::with_raw("abc"));
        assert_eq!(wizard.initialize(), Step::FIRST);
        assert_eq!(wizard.indicator().raw(), Some("abc"));
        assert_eq!(wizard.indicator().writes(), 0);
    }

    #[test]
    fn test_go_to_and_back_clamp() {
        let mut wizard = controller();
        assert_eq!(wizard.go_to(0).get(), 1);
        assert_eq!(wizard.go_to(99).get(), 14);
        assert_eq!(wizard.back(-3).get(), 1);
        assert_eq!(wizard.indicator().raw(), Some("1"));
    }

    #[test]
    fn test_commit_requires_fields() {
        let recorder = Arc::new(Recorder::<WizardEvent>::new());
        let mut wizard = controller();
        wizard.subscribe(recorder.clone());
        wizard.go_to(3);

        let err = wizard.commit(step(3), &form(&[("gender", "  ")])).unwrap_err();
        assert_eq!(err, StepError::MissingFields(vec!["Gender"]));
        assert_eq!(wizard.current().get(), 3);
        assert!(wizard.load().is_empty());
        assert!(matches!(
            recorder.events().last(),
            Some(WizardEvent::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_account_step_reports_combined_message() {
        let mut wizard = controller();
        let err = wizard
            .commit(step(8), &form(&[("fullName", "Ada"), ("email", "ada@example.com")]))
            .unwrap_err();
        assert_eq!(err, StepError::AccountIncomplete);
        assert_eq!(err.to_string(), "Please fill name, email and password");
    }

    #[test]
    fn test_account_commit_drops_password() {
        let mut wizard = controller();
        let next = wizard
            .commit(
                step(8),
                &form(&[
                    ("fullName", "Ada Lovelace"),
                    ("email", "ada@example.com"),
                    ("password", "hunter22"),
                    ("zip", "85001"),
                ]),
            )
            .unwrap();

        assert_eq!(next.get(), 9);
        let answers = wizard.load();
        assert_eq!(answers.get_str("account.fullName"), Some("Ada Lovelace"));
        assert_eq!(answers.get_str("account.address2"), Some(""));
        assert!(answers.get("account.password").is_none());
        let raw = wizard.store().get(ANSWERS_KEY).unwrap();
        assert!(!raw.contains("hunter22"));
    }

    #[test]
    fn test_consent_is_required_but_never_stored() {
        let mut wizard = controller();
        assert!(!wizard.continue_enabled(step(10), &StepForm::new()));
        assert!(wizard.continue_enabled(step(10), &form(&[("accepted", "on")])));
        wizard.commit(step(10), &form(&[("accepted", "on")])).unwrap();
        assert!(wizard.load().get("accepted").is_none());
        assert_eq!(
            wizard.persist("accepted", json!("on")),
            Err(StepError::TransientField("accepted".into()))
        );
    }

    #[test]
    fn test_persist_rejects_unknown_fields() {
        let mut wizard = controller();
        assert_eq!(
            wizard.persist("favouriteColour", json!("blue")),
            Err(StepError::UnknownField("favouriteColour".into()))
        );
        assert!(wizard.persist("account.password", json!("x")).is_err());
    }

    #[test]
    fn test_shipping_prefills_from_account() {
        let mut wizard = controller();
        wizard
            .commit(
                step(8),
                &form(&[
                    ("fullName", "Ada"),
                    ("email", "ada@example.com"),
                    ("password", "pw"),
                    ("address1", "1 Main St"),
                    ("zip", "85001"),
                ]),
            )
            .unwrap();

        let prefill = wizard.prefill(step(11));
        assert_eq!(prefill.get("address1").map(String::as_str), Some("1 Main St"));
        assert_eq!(prefill.get("zip").map(String::as_str), Some("85001"));
        assert_eq!(prefill.get("city").map(String::as_str), Some(""));

        wizard
            .commit(
                step(11),
                &form(&[("address1", "2 Side St"), ("city", "Phoenix"), ("zip", "85002")]),
            )
            .unwrap();
        let prefill = wizard.prefill(step(11));
        assert_eq!(prefill.get("address1").map(String::as_str), Some("2 Side St"));
    }

    #[test]
    fn test_commit_on_terminal_step_stays() {
        let mut wizard = controller();
        assert_eq!(wizard.commit(Step::LAST, &StepForm::new()).unwrap(), Step::LAST);
    }

    #[test]
    fn test_events_follow_commit_order() {
        let recorder = Arc::new(Recorder::<WizardEvent>::new());
        let mut wizard = controller();
        wizard.subscribe(recorder.clone());
        wizard.initialize();
        wizard.go_to(5);
        wizard.commit(step(5), &form(&[("state", "Texas")])).unwrap();

        let events = recorder.events();
        assert_eq!(
            events[events.len() - 2],
            WizardEvent::AnswerSaved {
                path: "state".into()
            }
        );
        assert_eq!(
            events[events.len() - 1],
            WizardEvent::StepChanged {
                from: step(5),
                to: step(6)
            }
        );
    }
}
