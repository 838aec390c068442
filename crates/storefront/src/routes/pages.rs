//! Static marketing page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use tracing::instrument;

use crate::config::AnalyticsConfig;
use crate::filters;
use crate::middleware::CspNonce;
use crate::services::onboarding::CONSULTATION_PATH;
use crate::state::AppState;

use super::home::{FAQS, Faq};

/// A treatment area on the treatments page.
#[derive(Clone)]
pub struct TreatmentCategory {
    pub title: &'static str,
    pub description: &'static str,
}

const TREATMENT_CATEGORIES: &[TreatmentCategory] = &[
    TreatmentCategory {
        title: "Weight Loss & Sculpting",
        description: "Sculpt your body and burn fat with peptides + GLP-1s",
    },
    TreatmentCategory {
        title: "Sexual Health",
        description: "Proven solutions for ED, stamina, and outbreak relief",
    },
    TreatmentCategory {
        title: "Mental Health",
        description: "Support for stress, anxiety, and focus",
    },
    TreatmentCategory {
        title: "Sleep & Recovery",
        description: "Deep sleep, better nights, faster recovery",
    },
    TreatmentCategory {
        title: "Energy & Longevity",
        description: "Peptides for energy, endurance, and anti-aging",
    },
    TreatmentCategory {
        title: "Skin, Hair & Beauty",
        description: "Peptides, stem cells, and treatments for rejuvenation",
    },
];

/// One step of the care journey on the how-it-works page.
#[derive(Clone)]
pub struct JourneyStep {
    pub title: &'static str,
    pub body: &'static str,
}

const JOURNEY: &[JourneyStep] = &[
    JourneyStep {
        title: "Take the consultation",
        body: "Answer a few questions about your goals and health history. It takes about five minutes.",
    },
    JourneyStep {
        title: "Clinician review",
        body: "A licensed provider reviews your answers and, if appropriate, prescribes a treatment plan.",
    },
    JourneyStep {
        title: "Delivered to your door",
        body: "Medication ships from a licensed pharmacy with tracked delivery.",
    },
];

/// FAQ page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/faq.html")]
pub struct FaqTemplate {
    pub faqs: &'static [Faq],
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// How it works page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/how_it_works.html")]
pub struct HowItWorksTemplate {
    pub journey: &'static [JourneyStep],
    pub consultation_url: &'static str,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Treatments page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/treatments.html")]
pub struct TreatmentsTemplate {
    pub categories: &'static [TreatmentCategory],
    pub consultation_url: &'static str,
    pub faqs: &'static [Faq],
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Display the FAQ page.
#[instrument(skip(state, nonce))]
pub async fn faq(State(state): State<AppState>, nonce: CspNonce) -> impl IntoResponse {
    FaqTemplate {
        faqs: FAQS,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

/// Display the how it works page.
#[instrument(skip(state, nonce))]
pub async fn how_it_works(State(state): State<AppState>, nonce: CspNonce) -> impl IntoResponse {
    HowItWorksTemplate {
        journey: JOURNEY,
        consultation_url: CONSULTATION_PATH,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

/// Display the treatments page.
#[instrument(skip(state, nonce))]
pub async fn treatments(State(state): State<AppState>, nonce: CspNonce) -> impl IntoResponse {
    TreatmentsTemplate {
        categories: TREATMENT_CATEGORIES,
        consultation_url: CONSULTATION_PATH,
        faqs: FAQS,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

/// Create the pages routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/faq", get(faq))
        .route("/how-it-works", get(how_it_works))
        .route("/treatments", get(treatments))
}
