//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;
use wellspring_core::onboarding::{Step, step_spec};

use crate::config::AnalyticsConfig;
use crate::filters;
use crate::middleware::CspNonce;
use crate::services::onboarding::QueryStepIndicator;
use crate::shopify::ProductSortKey;
use crate::state::AppState;

use super::products::ProductCardView;

// =============================================================================
// Static content
// =============================================================================

/// Video hero at the top of the page.
#[derive(Clone)]
pub struct VideoHero {
    pub title: &'static str,
    pub video_url: Option<&'static str>,
    pub poster_url: Option<&'static str>,
}

const VIDEO_HERO: VideoHero = VideoHero {
    title: "Feel your best",
    video_url: None,
    poster_url: None,
};

/// One card of the health categories grid.
#[derive(Clone)]
pub struct HealthCategory {
    pub title: &'static str,
    pub highlight: &'static str,
    /// CSS modifier for the highlighted word.
    pub tone: &'static str,
    /// Rendered in the second, smaller row.
    pub compact: bool,
}

const HEALTH_CATEGORIES: &[HealthCategory] = &[
    HealthCategory {
        title: "Lose extra",
        highlight: "Weight",
        tone: "violet",
        compact: false,
    },
    HealthCategory {
        title: "Have longer",
        highlight: "Sex",
        tone: "red",
        compact: false,
    },
    HealthCategory {
        title: "Have healthier",
        highlight: "Hair",
        tone: "teal",
        compact: false,
    },
    HealthCategory {
        title: "Ease",
        highlight: "Anxiety",
        tone: "blue",
        compact: true,
    },
    HealthCategory {
        title: "Enjoy",
        highlight: "Sex",
        tone: "red",
        compact: true,
    },
    HealthCategory {
        title: "Smooth",
        highlight: "Skin",
        tone: "violet",
        compact: true,
    },
];

/// Question and answer pair.
#[derive(Clone)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
}

pub const FAQS: &[Faq] = &[
    Faq {
        question: "Do I need a prescription?",
        answer: "Some treatments require a consultation. If approved, a provider will prescribe it for you.",
    },
    Faq {
        question: "How fast is delivery?",
        answer: "Most orders are shipped within 24-48 hours with tracked delivery.",
    },
    Faq {
        question: "Is my info secure?",
        answer: "Your data is encrypted and protected under HIPAA-compliant systems.",
    },
];

/// A goal option linking into the consultation.
#[derive(Clone)]
pub struct GoalTeaser {
    pub label: &'static str,
    pub href: String,
}

/// Goal options of the consultation's goal step, each opening the wizard there.
fn goal_teasers() -> (Step, Vec<GoalTeaser>) {
    let step = Step::new(2).unwrap_or(Step::FIRST);
    let href = QueryStepIndicator::location(step);
    let teasers = step_spec(step)
        .fields
        .iter()
        .flat_map(|field| field.options)
        .map(|option| GoalTeaser {
            label: option.label,
            href: href.clone(),
        })
        .collect();
    (step, teasers)
}

// =============================================================================
// Handler
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub hero: VideoHero,
    pub goals_title: &'static str,
    pub goals: Vec<GoalTeaser>,
    pub categories: &'static [HealthCategory],
    pub top_sellers: Vec<ProductCardView>,
    pub faqs: &'static [Faq],
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

const TOP_SELLERS: i64 = 6;

#[instrument(skip(state, nonce))]
pub async fn home(State(state): State<AppState>, nonce: CspNonce) -> impl IntoResponse {
    let top_sellers = state
        .storefront()
        .get_products(TOP_SELLERS, None, Some((ProductSortKey::BestSelling, false)))
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch top sellers: {e}");
                Vec::new()
            },
            |connection| {
                connection
                    .products
                    .iter()
                    .map(ProductCardView::from)
                    .collect()
            },
        );

    let (goal_step, goals) = goal_teasers();

    HomeTemplate {
        hero: VIDEO_HERO,
        goals_title: step_spec(goal_step).title,
        goals,
        categories: HEALTH_CATEGORIES,
        top_sellers,
        faqs: FAQS,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_teasers_open_goal_step() {
        let (step, goals) = goal_teasers();
        assert_eq!(step.get(), 2);
        assert_eq!(goals.len(), 3);
        assert!(goals.iter().all(|g| g.href == "/consultation?step=2"));
    }

    #[test]
    fn test_category_rows() {
        assert_eq!(HEALTH_CATEGORIES.iter().filter(|c| !c.compact).count(), 3);
        assert_eq!(HEALTH_CATEGORIES.iter().filter(|c| c.compact).count(), 3);
    }
}
