//! Database entities

pub mod account;
pub mod onboarding_submission;
pub mod support_request;

pub use account::Entity as Account;
pub use onboarding_submission::Entity as OnboardingSubmission;
pub use support_request::Entity as SupportRequest;

pub mod prelude {
    pub use super::account::Entity as Account;
    pub use super::onboarding_submission::Entity as OnboardingSubmission;
    pub use super::support_request::Entity as SupportRequest;
}
