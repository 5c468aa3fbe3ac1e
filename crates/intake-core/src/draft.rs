//! # Use-Case Draft
//!
//! The step-one record of the wizard: descriptive text, the business unit
//! cascade and the ESE resource flag.
//!
//! Selecting a business unit clears the team and sub-team; selecting a team
//! clears the sub-team. Re-selecting the current value changes nothing.

use serde::{Deserialize, Serialize};

/// In-memory use-case metadata owned by one form instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UseCaseDraft {
    pub title: String,
    pub headline: String,
    pub opportunity: String,
    pub business_value: String,
    pub business_unit: String,
    pub team: String,
    pub sub_team: String,
    /// `None` until the user answers the ESE question.
    #[serde(alias = "eseResourceFlag")]
    pub ese_resource: Option<bool>,
    pub info_link: String,
    pub primary_contact: String,
}

impl UseCaseDraft {
    /// Names of the required step-one fields that are still blank.
    #[must_use]
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let text_fields = [
            ("title", &self.title),
            ("headline", &self.headline),
            ("opportunity", &self.opportunity),
            ("businessValue", &self.business_value),
            ("businessUnit", &self.business_unit),
            ("team", &self.team),
        ];
        let mut missing: Vec<&'static str> = text_fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if self.ese_resource.is_none() {
            missing.push("eseResourceFlag");
        }
        missing
    }

    /// Step one is valid when every required field is filled.
    #[must_use]
    pub fn is_step_one_valid(&self) -> bool {
        self.missing_required_fields().is_empty()
    }

    /// Select a business unit. A different unit resets team and sub-team.
    pub fn select_business_unit(&mut self, business_unit: &str) {
        if self.business_unit == business_unit {
            return;
        }
        self.business_unit = business_unit.to_string();
        self.team.clear();
        self.sub_team.clear();
    }

    /// Select a team. A different team resets the sub-team.
    pub fn select_team(&mut self, team: &str) {
        if self.team == team {
            return;
        }
        self.team = team.to_string();
        self.sub_team.clear();
    }

    pub fn select_sub_team(&mut self, sub_team: &str) {
        self.sub_team = sub_team.to_string();
    }

    /// Wire value of the ESE flag.
    #[must_use]
    pub fn ese_dependency(&self) -> Option<&'static str> {
        self.ese_resource.map(|flag| if flag { "Yes" } else { "No" })
    }

    /// The info link, when it is set and well-formed.
    #[must_use]
    pub fn information_url(&self) -> Option<String> {
        let link = self.info_link.trim();
        (!link.is_empty() && is_valid_url(link)).then(|| link.to_string())
    }
}

/// `local@domain.tld` with no whitespace.
#[must_use]
pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Absolute http(s) URL with a host. The empty string is accepted since the
/// link is optional.
#[must_use]
pub fn is_valid_url(raw: &str) -> bool {
    let link = raw.trim();
    if link.is_empty() {
        return true;
    }
    if link.chars().any(char::is_whitespace) {
        return false;
    }
    let rest = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"));
    let Some(rest) = rest else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    !host.is_empty()
}
