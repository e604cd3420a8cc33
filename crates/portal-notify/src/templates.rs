//! Email bodies sent by the portal
//!
//! Bodies are handlebars templates under `templates/`. HTML variants use the
//! escaping `{{value}}` form for every user value; text variants use `{{{value}}}`.

use chrono::{DateTime, Utc};
use handlebars::{Handlebars, TemplateError};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::{EmailMessage, NotifyError};
/// Everything a submitter entered in the onboarding wizard
#[derive(Debug, Clone, Default)]
pub struct OnboardingRecap {
    pub customer_id: String,
    pub company_name: String,
    pub company_email: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub secondary_contact_name: Option<String>,
    pub secondary_contact_phone: Option<String>,
    pub secondary_contact_email: Option<String>,
    pub number_of_accounts: i32,
    /// Alias key to organization/department name, in key order
    pub aliases: Vec<(String, String)>,
    pub other_aliases: Option<String>,
    pub agree: bool,
    pub acknowledge: bool,
    pub confirm: bool,
    pub submitted_at: DateTime<Utc>,
}

const TEMPLATES: &[(&str, &str)] = &[
    (
        "onboarding_confirmation.html",
        include_str!("../templates/onboarding_confirmation.html.hbs"),
    ),
    (
        "onboarding_confirmation.txt",
        include_str!("../templates/onboarding_confirmation.txt.hbs"),
    ),
    (
        "onboarding_internal.html",
        include_str!("../templates/onboarding_internal.html.hbs"),
    ),
    (
        "onboarding_internal.txt",
        include_str!("../templates/onboarding_internal.txt.hbs"),
    ),
    ("password_reset.html", include_str!("../templates/password_reset.html.hbs")),
    ("password_reset.txt", include_str!("../templates/password_reset.txt.hbs")),
    ("password_changed.html", include_str!("../templates/password_changed.html.hbs")),
    ("password_changed.txt", include_str!("../templates/password_changed.txt.hbs")),
    ("staff_welcome.html", include_str!("../templates/staff_welcome.html.hbs")),
    ("staff_welcome.txt", include_str!("../templates/staff_welcome.txt.hbs")),
];

const PARTIALS: &[(&str, &str)] = &[
    ("recap_html", include_str!("../templates/recap.html.hbs")),
    ("recap_text", include_str!("../templates/recap.txt.hbs")),
];

static REGISTRY: Lazy<Result<Handlebars<'static>, String>> =
    Lazy::new(|| build_registry().map_err(|e| e.to_string()));

fn build_registry() -> Result<Handlebars<'static>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);

    for (name, source) in PARTIALS {
        registry.register_partial(name, *source)?;
    }
    for (name, source) in TEMPLATES {
        registry.register_template_string(name, *source)?;
    }

    Ok(registry)
}

/// Render the `.html` and `.txt` variants of `name`
fn render<T: Serialize>(
    to: impl Into<String>,
    subject: impl Into<String>,
    name: &str,
    context: &T,
) -> Result<EmailMessage, NotifyError> {
    let registry = REGISTRY
        .as_ref()
        .map_err(|e| NotifyError::Render(e.clone()))?;

    let html = registry
        .render(&format!("{name}.html"), context)
        .map_err(|e| NotifyError::Render(e.to_string()))?;
    let text = registry
        .render(&format!("{name}.txt"), context)
        .map_err(|e| NotifyError::Render(e.to_string()))?;

    Ok(EmailMessage::new(to, subject, html, text.trim_end()))
}

#[derive(Serialize)]
struct Row {
    label: String,
    value: String,
}

impl Row {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or("-")
}

fn recap_rows(recap: &OnboardingRecap) -> Vec<Row> {
    let mut rows = vec![
        Row::new("Customer ID", recap.customer_id.as_str()),
        Row::new("Company name", recap.company_name.as_str()),
        Row::new("Company email", recap.company_email.as_str()),
        Row::new("Primary contact", or_dash(&recap.contact_name)),
        Row::new("Primary contact phone", or_dash(&recap.contact_phone)),
        Row::new("Primary contact email", or_dash(&recap.contact_email)),
    ];

    if recap.secondary_contact_name.is_some()
        || recap.secondary_contact_email.is_some()
        || recap.secondary_contact_phone.is_some()
    {
        rows.push(Row::new("Secondary contact", or_dash(&recap.secondary_contact_name)));
        rows.push(Row::new(
            "Secondary contact phone",
            or_dash(&recap.secondary_contact_phone),
        ));
        rows.push(Row::new(
            "Secondary contact email",
            or_dash(&recap.secondary_contact_email),
        ));
    }

    rows.push(Row::new(
        "Requested AWS accounts",
        recap.number_of_accounts.to_string(),
    ));
    for (key, name) in &recap.aliases {
        rows.push(Row::new(format!("Alias {key}"), name.as_str()));
    }
    if let Some(other) = recap.other_aliases.as_ref().filter(|v| !v.is_empty()) {
        rows.push(Row::new("Other aliases", other.as_str()));
    }

    rows.push(Row::new("Agreement accepted", yes_no(recap.agree)));
    rows.push(Row::new("Data residency acknowledged", yes_no(recap.acknowledge)));
    rows.push(Row::new("No prohibited content confirmed", yes_no(recap.confirm)));
    rows.push(Row::new(
        "Submitted at",
        recap.submitted_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    ));

    rows
}

fn greeting(name: Option<&str>) -> String {
    match name.filter(|n| !n.trim().is_empty()) {
        Some(name) => format!("Hello {},", name.trim()),
        None => "Hello,".to_string(),
    }
}

#[derive(Serialize)]
struct OnboardingContext<'a> {
    greeting: String,
    company_name: &'a str,
    customer_id: &'a str,
    rows: Vec<Row>,
}

impl<'a> OnboardingContext<'a> {
    fn new(recap: &'a OnboardingRecap) -> Self {
        Self {
            greeting: greeting(recap.contact_name.as_deref()),
            company_name: &recap.company_name,
            customer_id: &recap.customer_id,
            rows: recap_rows(recap),
        }
    }
}

/// Confirmation to the submitter with their customer identifier
pub fn onboarding_confirmation(recap: &OnboardingRecap) -> Result<EmailMessage, NotifyError> {
    render(
        recap.company_email.clone(),
        format!("Your onboarding request {}", recap.customer_id),
        "onboarding_confirmation",
        &OnboardingContext::new(recap),
    )
}

/// Internal copy of a new submission for the operations mailbox
pub fn onboarding_internal(
    recap: &OnboardingRecap,
    ops_email: &str,
) -> Result<EmailMessage, NotifyError> {
    render(
        ops_email,
        format!(
            "New onboarding: {} ({})",
            recap.company_name, recap.customer_id
        ),
        "onboarding_internal",
        &OnboardingContext::new(recap),
    )
}

#[derive(Serialize)]
struct ResetContext<'a> {
    greeting: String,
    reset_url: &'a str,
    expires_at: String,
}

/// Password reset link
pub fn password_reset(
    to: &str,
    name: Option<&str>,
    reset_url: &str,
    expires_at: DateTime<Utc>,
) -> Result<EmailMessage, NotifyError> {
    let context = ResetContext {
        greeting: greeting(name),
        reset_url,
        expires_at: expires_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    };

    render(to, "Reset your password", "password_reset", &context)
}

#[derive(Serialize)]
struct GreetingContext {
    greeting: String,
}

/// Notice that an account password was changed
pub fn password_changed(to: &str, name: Option<&str>) -> Result<EmailMessage, NotifyError> {
    let context = GreetingContext {
        greeting: greeting(name),
    };

    render(to, "Your password was changed", "password_changed", &context)
}

#[derive(Serialize)]
struct WelcomeContext<'a> {
    greeting: String,
    staff_code: &'a str,
    temporary_password: Option<&'a str>,
    login_url: &'a str,
}

/// Welcome email for a staff account created by an administrator
///
/// `temporary_password` is only included when the portal generated it; the
/// recipient must replace it on first login either way.
pub fn staff_welcome(
    to: &str,
    name: Option<&str>,
    staff_code: &str,
    temporary_password: Option<&str>,
    login_url: &str,
) -> Result<EmailMessage, NotifyError> {
    let context = WelcomeContext {
        greeting: greeting(name),
        staff_code,
        temporary_password,
        login_url,
    };

    render(to, "Your portal account", "staff_welcome", &context)
}
