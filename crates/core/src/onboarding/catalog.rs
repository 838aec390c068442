//! The fixed consultation questionnaire.

use super::step::Step;

/// How a field is rendered and captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Option cards; the answer is saved as soon as one is clicked.
    Choice,
    Select,
    Date,
    Text,
    Email,
    Password,
    Tel,
    TextArea,
    Checkbox,
}

/// One selectable value of a choice or select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// One form input of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Captured for validation only, never written to the answer store.
    pub transient: bool,
    pub options: &'static [FieldOption],
}

impl FieldSpec {
    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            transient: false,
            options: &[],
        }
    }

    const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, label, kind)
        }
    }

    const fn transient(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            transient: true,
            ..Self::required(name, label, kind)
        }
    }

    const fn with_options(self, options: &'static [FieldOption]) -> Self {
        Self { options, ..self }
    }

    /// Whether the answer store keeps this field.
    #[must_use]
    pub const fn persisted(&self) -> bool {
        !self.transient
    }
}

/// Static description of one wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub number: u8,
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Grouped steps store their fields as one object under this name.
    pub group: Option<&'static str>,
    /// Group whose saved values pre-fill this step when it has none of its own.
    pub prefill_from: Option<&'static str>,
    pub fields: &'static [FieldSpec],
}

impl StepSpec {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Path a field is stored under: `group.name` for grouped steps.
    #[must_use]
    pub fn path(&self, field: &FieldSpec) -> String {
        self.group.map_or_else(
            || field.name.to_string(),
            |group| format!("{group}.{}", field.name),
        )
    }
}

/// Group name of the create-account step.
pub const ACCOUNT_GROUP: &str = "account";
/// Group name of the shipping step.
pub const SHIPPING_GROUP: &str = "shipping";

const GOALS: &[FieldOption] = &[
    FieldOption {
        value: "lose-weight",
        label: "Lose weight gradually & safely",
    },
    FieldOption {
        value: "curb-appetite",
        label: "Curb appetite & reduce cravings",
    },
    FieldOption {
        value: "all-above",
        label: "All of the above",
    },
];

const GENDERS: &[FieldOption] = &[
    FieldOption {
        value: "Female",
        label: "Female",
    },
    FieldOption {
        value: "Male",
        label: "Male",
    },
    FieldOption {
        value: "Prefer not to say",
        label: "Prefer not to say",
    },
];

const STATES: &[FieldOption] = &[
    FieldOption {
        value: "Arizona",
        label: "Arizona",
    },
    FieldOption {
        value: "California",
        label: "California",
    },
    FieldOption {
        value: "Texas",
        label: "Texas",
    },
    FieldOption {
        value: "Florida",
        label: "Florida",
    },
    FieldOption {
        value: "New York",
        label: "New York",
    },
];

const YES_NO: &[FieldOption] = &[
    FieldOption {
        value: "Yes",
        label: "Yes",
    },
    FieldOption {
        value: "No",
        label: "No",
    },
];

static STEPS: [StepSpec; Step::COUNT as usize] = [
    StepSpec {
        number: 1,
        title: "Explore weight loss plan",
        subtitle: "Learn about treatment options based on your goals, habits, and health history.",
        group: None,
        prefill_from: None,
        fields: &[],
    },
    StepSpec {
        number: 2,
        title: "Reach your weight goals with expert care",
        subtitle: "Tell us your weight goals",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::required("goal", "Goal", FieldKind::Choice).with_options(GOALS)],
    },
    StepSpec {
        number: 3,
        title: "Select your gender",
        subtitle: "This helps our medical team provide the most accurate recommendations and prescriptions.",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::required("gender", "Gender", FieldKind::Select).with_options(GENDERS)],
    },
    StepSpec {
        number: 4,
        title: "What is your date of birth?",
        subtitle: "We ask for your date of birth to confirm eligibility for treatment and ensure safe medical review.",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::required("dob", "Date of birth", FieldKind::Date)],
    },
    StepSpec {
        number: 5,
        title: "Which state do you live in?",
        subtitle: "This state is where your medication will be shipped to, if prescribed.",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::required("state", "State", FieldKind::Select).with_options(STATES)],
    },
    StepSpec {
        number: 6,
        title: "Tell us more about your goal",
        subtitle: "Provide helpful context to tailor your plan.",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::required(
            "goalDetail",
            "Goal detail",
            FieldKind::TextArea,
        )],
    },
    StepSpec {
        number: 7,
        title: "Your personalized treatment plan is ready",
        subtitle: "Ozempic® (Semaglutide) Treatment Plan: a once-weekly GLP-1 medication that helps control appetite, reduce cravings, and support long-term weight management.",
        group: None,
        prefill_from: None,
        fields: &[],
    },
    StepSpec {
        number: 8,
        title: "Create my account",
        subtitle: "We'll use this to manage your prescriptions and orders.",
        group: Some(ACCOUNT_GROUP),
        prefill_from: None,
        fields: &[
            FieldSpec::required("fullName", "Full Name", FieldKind::Text),
            FieldSpec::required("email", "Email", FieldKind::Email),
            FieldSpec::transient("password", "Password", FieldKind::Password),
            FieldSpec::optional("address1", "Address Line 1", FieldKind::Text),
            FieldSpec::optional("address2", "Address Line 2 (optional)", FieldKind::Text),
            FieldSpec::optional("phone", "Mobile Phone", FieldKind::Tel),
            FieldSpec::optional("zip", "Zip Code", FieldKind::Text),
        ],
    },
    StepSpec {
        number: 9,
        title: "Medical questions",
        subtitle: "Quick screening questions used by clinicians.",
        group: None,
        prefill_from: None,
        fields: &[
            FieldSpec::required("smoke", "Do you currently smoke?", FieldKind::Select)
                .with_options(YES_NO),
            FieldSpec::required(
                "pregnant",
                "Are you pregnant or planning pregnancy?",
                FieldKind::Select,
            )
            .with_options(YES_NO),
        ],
    },
    StepSpec {
        number: 10,
        title: "Consent",
        subtitle: "Please review and accept our telehealth consent and privacy policy.",
        group: None,
        prefill_from: None,
        fields: &[FieldSpec::transient("accepted", "I agree", FieldKind::Checkbox)],
    },
    StepSpec {
        number: 11,
        title: "Shipping details",
        subtitle: "Where should your medication be shipped if prescribed?",
        group: Some(SHIPPING_GROUP),
        prefill_from: Some(ACCOUNT_GROUP),
        fields: &[
            FieldSpec::required("address1", "Address line 1", FieldKind::Text),
            FieldSpec::required("city", "City", FieldKind::Text),
            FieldSpec::required("zip", "Zip code", FieldKind::Text),
        ],
    },
    StepSpec {
        number: 12,
        title: "Review summary",
        subtitle: "Quick review of the main info you provided.",
        group: None,
        prefill_from: None,
        fields: &[],
    },
    StepSpec {
        number: 13,
        title: "You're all set!",
        subtitle: "Submit to finish. A clinician will review your responses.",
        group: None,
        prefill_from: None,
        fields: &[],
    },
    StepSpec {
        number: 14,
        title: "Done",
        subtitle: "Thanks, your information was saved and will be reviewed by a clinician.",
        group: None,
        prefill_from: None,
        fields: &[],
    },
];

/// The static description of `step`.
#[must_use]
pub fn step_spec(step: Step) -> &'static StepSpec {
    &STEPS[usize::from(step.get() - 1)]
}

/// Every step description in order.
#[must_use]
pub fn steps() -> &'static [StepSpec] {
    &STEPS
}

/// Find the field a storage path refers to: `goal` or `account.email`.
#[must_use]
pub fn field_for_path(path: &str) -> Option<(&'static StepSpec, &'static FieldSpec)> {
    let (group, name) = match path.split_once('.') {
        Some((group, name)) => (Some(group), name),
        None => (None, path),
    };
    STEPS
        .iter()
        .filter(|spec| spec.group == group)
        .find_map(|spec| spec.field(name).map(|field| (spec, field)))
}
