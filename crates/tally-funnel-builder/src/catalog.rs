//! Known step types and their defaults

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const AD_CLICK: &str = "ad_click";

/// Defaults shown for a step type when a step is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepTypeInfo {
    pub step_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Event type the step matches unless overridden
    pub tracked_event_name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

static AD_CLICK_INFO: StepTypeInfo = StepTypeInfo {
    step_type: AD_CLICK,
    name: "Ad Click",
    description: "Visitor clicks a paid ad",
    tracked_event_name: "campaign_click",
    icon: "megaphone",
    color: "#F59E0B",
};

/// Catalogued step types other than ad clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardStep {
    LandingPage,
    PageView,
    Signup,
    EmailVerified,
    TrialStart,
    OnboardingComplete,
    FeatureActivation,
    AddToCart,
    Checkout,
    Purchase,
    LeadForm,
    DemoRequest,
    Subscription,
    Upgrade,
}

impl StandardStep {
    pub const ALL: [StandardStep; 14] = [
        StandardStep::LandingPage,
        StandardStep::PageView,
        StandardStep::Signup,
        StandardStep::EmailVerified,
        StandardStep::TrialStart,
        StandardStep::OnboardingComplete,
        StandardStep::FeatureActivation,
        StandardStep::AddToCart,
        StandardStep::Checkout,
        StandardStep::Purchase,
        StandardStep::LeadForm,
        StandardStep::DemoRequest,
        StandardStep::Subscription,
        StandardStep::Upgrade,
    ];

    pub fn as_str(&self) -> &'static str {
        self.info().step_type
    }

    pub fn info(&self) -> &'static StepTypeInfo {
        match self {
            StandardStep::LandingPage => &StepTypeInfo {
                step_type: "landing_page",
                name: "Landing Page",
                description: "Visitor lands on a campaign page",
                tracked_event_name: "page_view",
                icon: "layout",
                color: "#3B82F6",
            },
            StandardStep::PageView => &StepTypeInfo {
                step_type: "page_view",
                name: "Page View",
                description: "Visitor views any tracked page",
                tracked_event_name: "page_view",
                icon: "eye",
                color: "#6366F1",
            },
            StandardStep::Signup => &StepTypeInfo {
                step_type: "signup",
                name: "Sign Up",
                description: "Visitor creates an account",
                tracked_event_name: "sign_up",
                icon: "user-plus",
                color: "#10B981",
            },
            StandardStep::EmailVerified => &StepTypeInfo {
                step_type: "email_verified",
                name: "Email Verified",
                description: "User confirms their email address",
                tracked_event_name: "email_verified",
                icon: "mail-check",
                color: "#14B8A6",
            },
            StandardStep::TrialStart => &StepTypeInfo {
                step_type: "trial_start",
                name: "Trial Started",
                description: "User starts a free trial",
                tracked_event_name: "trial_started",
                icon: "clock",
                color: "#8B5CF6",
            },
            StandardStep::OnboardingComplete => &StepTypeInfo {
                step_type: "onboarding_complete",
                name: "Onboarding Complete",
                description: "User finishes the onboarding flow",
                tracked_event_name: "onboarding_completed",
                icon: "check-circle",
                color: "#22C55E",
            },
            StandardStep::FeatureActivation => &StepTypeInfo {
                step_type: "feature_activation",
                name: "Feature Activated",
                description: "User uses a key feature for the first time",
                tracked_event_name: "feature_activated",
                icon: "zap",
                color: "#EAB308",
            },
            StandardStep::AddToCart => &StepTypeInfo {
                step_type: "add_to_cart",
                name: "Add to Cart",
                description: "Visitor adds a product to the cart",
                tracked_event_name: "add_to_cart",
                icon: "shopping-cart",
                color: "#F97316",
            },
            StandardStep::Checkout => &StepTypeInfo {
                step_type: "checkout",
                name: "Checkout",
                description: "Visitor starts checkout",
                tracked_event_name: "checkout_started",
                icon: "credit-card",
                color: "#EC4899",
            },
            StandardStep::Purchase => &StepTypeInfo {
                step_type: "purchase",
                name: "Purchase",
                description: "Visitor completes a purchase",
                tracked_event_name: "purchase",
                icon: "dollar-sign",
                color: "#16A34A",
            },
            StandardStep::LeadForm => &StepTypeInfo {
                step_type: "lead_form",
                name: "Lead Form",
                description: "Visitor submits a lead form",
                tracked_event_name: "lead_submitted",
                icon: "clipboard",
                color: "#0EA5E9",
            },
            StandardStep::DemoRequest => &StepTypeInfo {
                step_type: "demo_request",
                name: "Demo Request",
                description: "Visitor books a product demo",
                tracked_event_name: "demo_requested",
                icon: "calendar",
                color: "#A855F7",
            },
            StandardStep::Subscription => &StepTypeInfo {
                step_type: "subscription",
                name: "Subscription",
                description: "User starts a paid subscription",
                tracked_event_name: "subscription_started",
                icon: "repeat",
                color: "#059669",
            },
            StandardStep::Upgrade => &StepTypeInfo {
                step_type: "upgrade",
                name: "Plan Upgrade",
                description: "Customer moves to a higher plan",
                tracked_event_name: "plan_upgraded",
                icon: "trending-up",
                color: "#DC2626",
            },
        }
    }
}

impl FromStr for StandardStep {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for StandardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every catalogued step type, ad click first.
pub fn all_step_types() -> Vec<&'static StepTypeInfo> {
    std::iter::once(&AD_CLICK_INFO)
        .chain(StandardStep::ALL.iter().map(|s| s.info()))
        .collect()
}

pub fn lookup(step_type: &str) -> Option<&'static StepTypeInfo> {
    if step_type == AD_CLICK {
        return Some(&AD_CLICK_INFO);
    }
    step_type.parse::<StandardStep>().ok().map(|s| s.info())
}

/// Event a new step of this type tracks. Unknown types track themselves.
pub fn default_event_name(step_type: &str) -> String {
    lookup(step_type)
        .map(|info| info.tracked_event_name.to_string())
        .unwrap_or_else(|| step_type.to_string())
}
