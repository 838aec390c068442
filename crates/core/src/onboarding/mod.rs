//! Fourteen-step consultation wizard.
//!
//! The current step lives behind a [`StepIndicator`] (the URL in the
//! storefront) and the answers behind a [`KeyValueStore`] (the session). The
//! [`StepController`] only clamps, validates and writes; rendering belongs to
//! whoever holds the ports.

mod answers;
mod catalog;
mod controller;
mod indicator;
mod step;
mod store;

pub use answers::Answers;
pub use catalog::{
    ACCOUNT_GROUP, FieldKind, FieldOption, FieldSpec, SHIPPING_GROUP, StepSpec, field_for_path,
    step_spec, steps,
};
pub use controller::{
    ACCOUNT_INCOMPLETE_MESSAGE, StepController, StepError, StepForm, WizardEvent,
};
pub use indicator::{MemoryIndicator, StepIndicator};
pub use step::Step;
pub use store::{ANSWERS_KEY, AnswerStore, KeyValueStore, MemoryStore};
