//! Predefined funnels the editor can start from

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunnelTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Step types in funnel order
    pub steps: &'static [&'static str],
}

pub static TEMPLATES: [FunnelTemplate; 4] = [
    FunnelTemplate {
        id: "trial-to-paid",
        name: "Trial-to-Paid",
        description: "From the first ad click to a paying subscription",
        steps: &[
            "ad_click",
            "landing_page",
            "signup",
            "email_verified",
            "trial_start",
            "onboarding_complete",
            "feature_activation",
            "checkout",
            "purchase",
            "subscription",
        ],
    },
    FunnelTemplate {
        id: "ecommerce-purchase",
        name: "E-commerce Purchase",
        description: "Product discovery through checkout",
        steps: &["ad_click", "landing_page", "add_to_cart", "checkout", "purchase"],
    },
    FunnelTemplate {
        id: "lead-generation",
        name: "Lead Generation",
        description: "Campaign traffic turned into sales conversations",
        steps: &["ad_click", "landing_page", "lead_form", "demo_request"],
    },
    FunnelTemplate {
        id: "paid-search",
        name: "Paid Search",
        description: "Search ad performance down to sign-up",
        steps: &["ad_click", "landing_page", "signup"],
    },
];

/// Find a template by id or, ignoring case, by display name.
pub fn find_template(key: &str) -> Option<&'static FunnelTemplate> {
    let key = key.trim();
    TEMPLATES
        .iter()
        .find(|t| t.id == key || t.name.eq_ignore_ascii_case(key))
}
