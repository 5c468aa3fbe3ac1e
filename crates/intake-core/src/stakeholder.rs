//! # Stakeholders
//!
//! Role normalization and the stakeholder roster of a use case.
//!
//! Roles are free text in the dialog. "Primary contact" is stored as the
//! canonical "Owner" role, and owner entries are locked: they can be neither
//! edited nor removed once on the roster.

use crate::draft::is_valid_email;
use crate::primitives::{MAX_STAKEHOLDERS, OWNER_ROLE, PRIMARY_CONTACT_ROLE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ROLE HELPERS
// =============================================================================

/// Normalize a free-text role.
///
/// Trims the input; "primary contact" and "owner" (any casing) become
/// "Owner". A role matching one of `known_roles` case-insensitively takes
/// its canonical spelling.
#[must_use]
pub fn normalize_role(raw: &str, known_roles: &[String]) -> String {
    let trimmed = raw.trim();
    if is_owner_role(trimmed) || trimmed.eq_ignore_ascii_case(PRIMARY_CONTACT_ROLE) {
        return OWNER_ROLE.to_string();
    }
    known_roles
        .iter()
        .find(|known| known.trim().eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_string(), |known| known.trim().to_string())
}

#[must_use]
pub fn is_owner_role(role: &str) -> bool {
    role.trim().eq_ignore_ascii_case(OWNER_ROLE)
}

/// Derive a display name from an email address.
///
/// `jane.doe@contoso.com` → `Jane Doe`. Underscores split words as well.
#[must_use]
pub fn display_name_from_email(email: &str) -> String {
    let local = email.trim().split('@').next().unwrap_or_default();
    local
        .split(['.', '_'])
        .filter(|part| !part.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Up to two uppercase initials for an avatar, `?` when the name is blank.
#[must_use]
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

// =============================================================================
// ROSTER
// =============================================================================

/// One stakeholder entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Stakeholder {
    #[must_use]
    pub fn is_owner(&self) -> bool {
        is_owner_role(&self.role)
    }
}

/// Errors from roster operations. The roster is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Stakeholder name is required")]
    BlankName,

    #[error("Stakeholder role is required")]
    BlankRole,

    #[error("Invalid stakeholder email: {0}")]
    InvalidEmail(String),

    #[error("No stakeholder at position {0}")]
    NotFound(usize),

    #[error("The owner cannot be edited or removed")]
    OwnerLocked,

    #[error("A use case can have at most {0} stakeholders")]
    Full(usize),
}

/// Ordered stakeholder list of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakeholderRoster {
    entries: Vec<Stakeholder>,
}

impl StakeholderRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from already-collected entries, normalizing roles.
    ///
    /// Entries that `add` would refuse (blank name or role, bad email) are
    /// skipped, as is anything past the roster limit.
    #[must_use]
    pub fn from_entries(entries: Vec<Stakeholder>, known_roles: &[String]) -> Self {
        let entries = entries
            .iter()
            .filter_map(|s| Self::checked(&s.name, &s.email, &s.role, known_roles).ok())
            .take(MAX_STAKEHOLDERS)
            .collect();
        Self { entries }
    }

    fn checked(
        name: &str,
        email: &str,
        role: &str,
        known_roles: &[String],
    ) -> Result<Stakeholder, RosterError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(RosterError::BlankName);
        }
        if role.trim().is_empty() {
            return Err(RosterError::BlankRole);
        }
        if !is_valid_email(email) {
            return Err(RosterError::InvalidEmail(email.to_string()));
        }
        Ok(Stakeholder {
            name: name.to_string(),
            email: email.to_string(),
            role: normalize_role(role, known_roles),
        })
    }

    /// Append a stakeholder. Returns its position.
    pub fn add(
        &mut self,
        name: &str,
        email: &str,
        role: &str,
        known_roles: &[String],
    ) -> Result<usize, RosterError> {
        if self.entries.len() >= MAX_STAKEHOLDERS {
            return Err(RosterError::Full(MAX_STAKEHOLDERS));
        }
        let entry = Self::checked(name, email, role, known_roles)?;
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Replace the entry at `index`. Owner entries are locked.
    pub fn edit(
        &mut self,
        index: usize,
        name: &str,
        email: &str,
        role: &str,
        known_roles: &[String],
    ) -> Result<(), RosterError> {
        let current = self.entries.get(index).ok_or(RosterError::NotFound(index))?;
        if current.is_owner() {
            return Err(RosterError::OwnerLocked);
        }
        let entry = Self::checked(name, email, role, known_roles)?;
        self.entries[index] = entry;
        Ok(())
    }

    /// Remove the entry at `index`. Owner entries are locked.
    pub fn remove(&mut self, index: usize) -> Result<Stakeholder, RosterError> {
        let current = self.entries.get(index).ok_or(RosterError::NotFound(index))?;
        if current.is_owner() {
            return Err(RosterError::OwnerLocked);
        }
        Ok(self.entries.remove(index))
    }

    /// The first owner entry.
    #[must_use]
    pub fn owner(&self) -> Option<&Stakeholder> {
        self.entries.iter().find(|s| s.is_owner())
    }

    /// Add the signed-in user as owner unless an owner already exists.
    ///
    /// Returns `true` when an entry was added. A blank name is derived from
    /// the email.
    pub fn seed_current_user(&mut self, name: &str, email: &str) -> bool {
        if self.owner().is_some() || !is_valid_email(email) {
            return false;
        }
        let name = if name.trim().is_empty() {
            display_name_from_email(email)
        } else {
            name.trim().to_string()
        };
        self.entries.insert(
            0,
            Stakeholder {
                name,
                email: email.trim().to_string(),
                role: OWNER_ROLE.to_string(),
            },
        );
        true
    }

    #[must_use]
    pub fn entries(&self) -> &[Stakeholder] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
