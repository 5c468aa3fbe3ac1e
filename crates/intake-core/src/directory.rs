//! # People Search
//!
//! Query construction and result parsing for the Graph-shaped user
//! directory.
//!
//! No query is issued when a person has already been chosen (an email is
//! set) or when the trimmed term is shorter than two characters.

use crate::primitives::{DIRECTORY_RESULT_LIMIT, MIN_SEARCH_TERM_LENGTH};
use crate::stakeholder::display_name_from_email;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fields requested for every user.
pub const DIRECTORY_SELECT: &str = "id,displayName,mail,userPrincipalName";

/// Escape a term for an OData string literal.
#[must_use]
pub fn escape_odata(term: &str) -> String {
    term.replace('\'', "''")
}

/// A directory query ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryQuery {
    pub term: String,
    pub filter: String,
}

impl DirectoryQuery {
    /// Decide whether `term` warrants a query.
    #[must_use]
    pub fn plan(term: &str, selected_email: Option<&str>) -> Option<Self> {
        if selected_email.is_some_and(|email| !email.trim().is_empty()) {
            return None;
        }
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_TERM_LENGTH {
            return None;
        }
        let escaped = escape_odata(term);
        let filter = format!(
            "startswith(displayName,'{escaped}') or startswith(mail,'{escaped}') or startswith(userPrincipalName,'{escaped}')"
        );
        Some(Self {
            term: term.to_string(),
            filter,
        })
    }

    /// Query string pairs for `GET /v1.0/users`.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("$filter", self.filter.clone()),
            ("$select", DIRECTORY_SELECT.to_string()),
            ("$top", DIRECTORY_RESULT_LIMIT.to_string()),
        ]
    }
}

/// One directory user as returned by Graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl DirectoryUser {
    /// `mail`, else the user principal name.
    #[must_use]
    pub fn preferred_email(&self) -> Option<&str> {
        [self.mail.as_deref(), self.user_principal_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    /// Display name, else a name derived from the email.
    #[must_use]
    pub fn name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .preferred_email()
                .map(display_name_from_email)
                .unwrap_or_default(),
        }
    }
}

/// `{ "value": [...] }` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryResponse {
    pub value: Vec<DirectoryUser>,
}

/// A search hit offered in the stakeholder picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

impl DirectoryResponse {
    /// Users with an email, deduplicated by email case-insensitively.
    #[must_use]
    pub fn into_people(self) -> Vec<Person> {
        let mut seen = BTreeSet::new();
        self.value
            .iter()
            .filter_map(|user| {
                let email = user.preferred_email()?;
                seen.insert(email.to_lowercase()).then(|| Person {
                    name: user.name(),
                    email: email.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_terms_are_skipped() {
        assert_eq!(DirectoryQuery::plan(" j ", None), None);
        assert!(DirectoryQuery::plan("jo", None).is_some());
    }

    #[test]
    fn chosen_email_skips_search() {
        assert_eq!(DirectoryQuery::plan("jane", Some("jane@contoso.com")), None);
        assert!(DirectoryQuery::plan("jane", Some("  ")).is_some());
    }

    #[test]
    fn filter_escapes_quotes() {
        let query = DirectoryQuery::plan("o'brien", None).expect("query");
        assert_eq!(
            query.filter,
            "startswith(displayName,'o''brien') or startswith(mail,'o''brien') or startswith(userPrincipalName,'o''brien')"
        );
        let pairs = query.query_pairs();
        assert_eq!(pairs[1], ("$select", DIRECTORY_SELECT.to_string()));
        assert_eq!(pairs[2], ("$top", "8".to_string()));
    }

    #[test]
    fn results_prefer_mail_and_dedup() {
        let response: DirectoryResponse = serde_json::from_str(
            r#"{"value":[
                {"id":"1","displayName":"Jane Doe","mail":"jane@contoso.com","userPrincipalName":"jd@contoso.com"},
                {"id":"2","displayName":null,"mail":null,"userPrincipalName":"john.smith@contoso.com"},
                {"id":"3","displayName":"Jane Again","mail":"JANE@contoso.com"},
                {"id":"4","displayName":"No Mail"}
            ]}"#,
        )
        .expect("parse");

        let people = response.into_people();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].email, "jane@contoso.com");
        assert_eq!(people[1].name, "John Smith");
    }
}
