//! # Reference Data
//!
//! Lookup lists fetched from the backend's mapping endpoints and the
//! structures derived from them:
//! - `BusinessStructure`: business unit → team → sub-team cascade
//! - `LookupMaps`: case-insensitive name → id maps used by the assembler
//! - label helpers for the dropdowns (dedup, role options, vendor models)
//!
//! Every mapping endpoint answers `{ "items": [...] }`; the item structs here
//! match those item shapes.

use crate::primitives::{FALLBACK_PHASES, PRIMARY_CONTACT_ROLE};
use crate::types::{BusinessUnitId, MetricCategoryId, PhaseId, RoleId, StatusId, UnitOfMeasureId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// MAPPING ITEMS
// =============================================================================

/// Envelope used by every mapping endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// One (business unit, team) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUnitRow {
    pub id: Option<u64>,
    pub business_unit_name: String,
    pub team_name: String,
}

/// One sub-team row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTeamRow {
    pub id: Option<u64>,
    #[serde(default)]
    pub business_unit_id: Option<u64>,
    pub business_unit_name: String,
    pub team_name: String,
    pub sub_team_name: String,
}

/// A stakeholder role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleItem {
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub role_type: String,
}

/// A timeline phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseItem {
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub stage: String,
}

/// A PARCS metric category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCategoryItem {
    pub id: Option<u64>,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_unit_of_measure_id: Option<u64>,
}

/// A unit of measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfMeasureItem {
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub measure_type: String,
}

/// Any list that is only an id and a label (statuses, themes, personas,
/// knowledge sources).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedItem {
    pub id: Option<u64>,
    pub name: String,
}

/// A vendor/model pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorModelItem {
    pub id: Option<u64>,
    pub vendor_name: String,
    #[serde(default)]
    pub product_name: String,
}

/// A checklist question as delivered by the mapping endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    pub id: Option<u64>,
    pub question: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default)]
    pub response_value: String,
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// Everything the intake form loads on mount.
///
/// This is the value stored in the reference cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceData {
    pub business_units: Vec<BusinessUnitRow>,
    pub sub_teams: Vec<SubTeamRow>,
    pub roles: Vec<RoleItem>,
    pub phases: Vec<PhaseItem>,
    pub metric_categories: Vec<MetricCategoryItem>,
    pub unit_of_measure: Vec<UnitOfMeasureItem>,
    pub status: Vec<NamedItem>,
    pub themes: Vec<NamedItem>,
    pub personas: Vec<NamedItem>,
    pub vendor_models: Vec<VendorModelItem>,
    pub knowledge_sources: Vec<NamedItem>,
    pub ai_product_questions: Vec<QuestionItem>,
}

impl ReferenceData {
    /// Build the business unit cascade.
    #[must_use]
    pub fn structure(&self) -> BusinessStructure {
        BusinessStructure::from_rows(&self.business_units, &self.sub_teams)
    }

    /// Build the name → id lookup maps.
    #[must_use]
    pub fn lookups(&self) -> LookupMaps {
        LookupMaps::from_reference(self)
    }

    /// Short per-list counts, used by status output.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("businessUnits", self.business_units.len()),
            ("subTeams", self.sub_teams.len()),
            ("roles", self.roles.len()),
            ("phases", self.phases.len()),
            ("metricCategories", self.metric_categories.len()),
            ("unitOfMeasure", self.unit_of_measure.len()),
            ("status", self.status.len()),
            ("themes", self.themes.len()),
            ("personas", self.personas.len()),
            ("vendorModels", self.vendor_models.len()),
            ("knowledgeSources", self.knowledge_sources.len()),
            ("aiProductQuestions", self.ai_product_questions.len()),
        ])
    }
}

// =============================================================================
// BUSINESS STRUCTURE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UnitEntry {
    /// Lowest row id seen for the unit.
    lowest_id: Option<u64>,
    /// Team name → (row id, sub-teams in first-seen order).
    teams: BTreeMap<String, (Option<u64>, Vec<String>)>,
    /// Team names in first-seen order.
    team_order: Vec<String>,
}

/// Business unit → team → sub-team hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessStructure {
    units: BTreeMap<String, UnitEntry>,
    unit_order: Vec<String>,
}

impl BusinessStructure {
    /// Build the hierarchy from mapping rows.
    ///
    /// Rows with a blank business unit or team are ignored. Duplicate teams
    /// keep their first row id; a unit's fallback id is the lowest id seen.
    #[must_use]
    pub fn from_rows(rows: &[BusinessUnitRow], sub_teams: &[SubTeamRow]) -> Self {
        let mut structure = Self::default();

        for row in rows {
            let unit_name = row.business_unit_name.trim();
            let team_name = row.team_name.trim();
            if unit_name.is_empty() || team_name.is_empty() {
                continue;
            }
            if !structure.units.contains_key(unit_name) {
                structure.unit_order.push(unit_name.to_string());
            }
            let unit = structure.units.entry(unit_name.to_string()).or_default();
            if let Some(id) = row.id {
                unit.lowest_id = Some(unit.lowest_id.map_or(id, |current| current.min(id)));
            }
            if !unit.teams.contains_key(team_name) {
                unit.team_order.push(team_name.to_string());
                unit.teams
                    .insert(team_name.to_string(), (row.id, Vec::new()));
            }
        }

        for row in sub_teams {
            let sub_team = row.sub_team_name.trim();
            if sub_team.is_empty() {
                continue;
            }
            let Some(unit) = structure.units.get_mut(row.business_unit_name.trim()) else {
                continue;
            };
            if let Some((_, subs)) = unit.teams.get_mut(row.team_name.trim()) {
                if !subs.iter().any(|existing| existing == sub_team) {
                    subs.push(sub_team.to_string());
                }
            }
        }

        structure
    }

    /// Business unit names in first-seen order.
    #[must_use]
    pub fn business_units(&self) -> &[String] {
        &self.unit_order
    }

    /// Teams of a business unit, empty when the unit is unknown.
    #[must_use]
    pub fn teams_for(&self, business_unit: &str) -> Vec<String> {
        self.units
            .get(business_unit.trim())
            .map(|unit| unit.team_order.clone())
            .unwrap_or_default()
    }

    /// Sub-teams of a team, empty when either is unknown.
    #[must_use]
    pub fn sub_teams_for(&self, business_unit: &str, team: &str) -> Vec<String> {
        self.units
            .get(business_unit.trim())
            .and_then(|unit| unit.teams.get(team.trim()))
            .map(|(_, subs)| subs.clone())
            .unwrap_or_default()
    }

    /// Resolve the id sent as `businessUnitId`.
    ///
    /// The row id of the (unit, team) pair when the team is known, otherwise
    /// the lowest id recorded for the unit.
    #[must_use]
    pub fn business_unit_id(&self, business_unit: &str, team: &str) -> Option<BusinessUnitId> {
        let unit = self.units.get(business_unit.trim())?;
        unit.teams
            .get(team.trim())
            .and_then(|(id, _)| *id)
            .or(unit.lowest_id)
            .map(BusinessUnitId)
    }
}

// =============================================================================
// LOOKUP MAPS
// =============================================================================

/// Normalize a lookup name: trimmed, lowercased.
#[must_use]
pub fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Build a case-insensitive name → id map. The first id for a name wins.
fn name_map<'a, I, T>(entries: I, wrap: fn(u64) -> T) -> BTreeMap<String, T>
where
    I: IntoIterator<Item = (Option<u64>, &'a str)>,
{
    let mut map = BTreeMap::new();
    for (id, name) in entries {
        let key = lookup_key(name);
        if let Some(id) = id {
            if !key.is_empty() {
                map.entry(key).or_insert_with(|| wrap(id));
            }
        }
    }
    map
}

/// Case-insensitive name → id maps built from reference data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupMaps {
    pub roles: BTreeMap<String, RoleId>,
    pub metric_categories: BTreeMap<String, MetricCategoryId>,
    pub units: BTreeMap<String, UnitOfMeasureId>,
    pub phases: BTreeMap<String, PhaseId>,
    pub statuses: BTreeMap<String, StatusId>,
    pub structure: BusinessStructure,
}

impl LookupMaps {
    /// Build every map from reference data.
    #[must_use]
    pub fn from_reference(data: &ReferenceData) -> Self {
        Self {
            roles: name_map(
                data.roles.iter().map(|r| (r.id, r.name.as_str())),
                RoleId,
            ),
            metric_categories: name_map(
                data.metric_categories
                    .iter()
                    .map(|c| (c.id, c.category.as_str())),
                MetricCategoryId,
            ),
            units: name_map(
                data.unit_of_measure.iter().map(|u| (u.id, u.name.as_str())),
                UnitOfMeasureId,
            ),
            phases: name_map(
                data.phases.iter().map(|p| (p.id, p.name.as_str())),
                PhaseId,
            ),
            statuses: name_map(
                data.status.iter().map(|s| (s.id, s.name.as_str())),
                StatusId,
            ),
            structure: data.structure(),
        }
    }

    #[must_use]
    pub fn role_id(&self, name: &str) -> Option<RoleId> {
        self.roles.get(&lookup_key(name)).copied()
    }

    #[must_use]
    pub fn metric_category_id(&self, name: &str) -> Option<MetricCategoryId> {
        self.metric_categories.get(&lookup_key(name)).copied()
    }

    #[must_use]
    pub fn unit_id(&self, name: &str) -> Option<UnitOfMeasureId> {
        self.units.get(&lookup_key(name)).copied()
    }

    #[must_use]
    pub fn phase_id(&self, name: &str) -> Option<PhaseId> {
        self.phases.get(&lookup_key(name)).copied()
    }

    #[must_use]
    pub fn status_id(&self, name: &str) -> Option<StatusId> {
        self.statuses.get(&lookup_key(name)).copied()
    }
}

// =============================================================================
// DROPDOWN HELPERS
// =============================================================================

/// Deduplicate labels case-insensitively (trimmed); the first spelling wins.
#[must_use]
pub fn dedup_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    labels
        .into_iter()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Role names offered in the stakeholder dialog.
///
/// Deduplicated, with "Primary Contact" always present and first.
#[must_use]
pub fn role_options(roles: &[RoleItem]) -> Vec<String> {
    let mut options = dedup_labels(roles.iter().map(|r| r.name.as_str()));
    if !options.iter().any(|r| r == PRIMARY_CONTACT_ROLE) {
        options.insert(0, PRIMARY_CONTACT_ROLE.to_string());
    }
    options
}

/// One model offered for a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorModel {
    pub id: u64,
    pub name: String,
}

/// Group vendor/model rows by vendor.
///
/// Models are deduplicated by id and sorted by name. A row without a product
/// name offers the vendor name as its model. Vendors without any usable
/// model are left out.
#[must_use]
pub fn vendor_models(items: &[VendorModelItem]) -> BTreeMap<String, Vec<VendorModel>> {
    let mut grouped: BTreeMap<String, BTreeMap<u64, String>> = BTreeMap::new();
    for item in items {
        let vendor = item.vendor_name.trim();
        let Some(id) = item.id.filter(|id| *id > 0) else {
            continue;
        };
        if vendor.is_empty() {
            continue;
        }
        let product = item.product_name.trim();
        let display = if product.is_empty() { vendor } else { product };
        grouped
            .entry(vendor.to_string())
            .or_default()
            .entry(id)
            .or_insert_with(|| display.to_string());
    }

    grouped
        .into_iter()
        .map(|(vendor, models)| {
            let mut list: Vec<VendorModel> = models
                .into_iter()
                .map(|(id, name)| VendorModel { id, name })
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            (vendor, list)
        })
        .filter(|(_, list)| !list.is_empty())
        .collect()
}

/// Phase names in ordinal order when the backend offers no phases.
#[must_use]
pub fn fallback_phase_names() -> Vec<String> {
    FALLBACK_PHASES.iter().map(|p| (*p).to_string()).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bu(id: u64, unit: &str, team: &str) -> BusinessUnitRow {
        BusinessUnitRow {
            id: Some(id),
            business_unit_name: unit.to_string(),
            team_name: team.to_string(),
        }
    }

    fn sub(unit: &str, team: &str, name: &str) -> SubTeamRow {
        SubTeamRow {
            id: Some(1),
            business_unit_id: None,
            business_unit_name: unit.to_string(),
            team_name: team.to_string(),
            sub_team_name: name.to_string(),
        }
    }

    #[test]
    fn structure_groups_teams_by_unit() {
        let rows = vec![bu(3, "Finance", "Payroll"), bu(4, "Finance", "AP"), bu(9, "HR", "Talent")];
        let structure = BusinessStructure::from_rows(&rows, &[]);

        assert_eq!(structure.business_units(), ["Finance", "HR"]);
        assert_eq!(structure.teams_for("Finance"), vec!["Payroll", "AP"]);
        assert!(structure.teams_for("Legal").is_empty());
    }

    #[test]
    fn business_unit_id_prefers_team_row() {
        let rows = vec![bu(7, "Finance", "Payroll"), bu(4, "Finance", "AP")];
        let structure = BusinessStructure::from_rows(&rows, &[]);

        assert_eq!(
            structure.business_unit_id("Finance", "Payroll"),
            Some(BusinessUnitId(7))
        );
        // Unknown team falls back to the lowest id of the unit.
        assert_eq!(
            structure.business_unit_id("Finance", "Treasury"),
            Some(BusinessUnitId(4))
        );
        assert_eq!(structure.business_unit_id("Legal", "Payroll"), None);
    }

    #[test]
    fn sub_teams_attach_to_known_teams_only() {
        let rows = vec![bu(1, "Finance", "Payroll")];
        let subs = vec![
            sub("Finance", "Payroll", "EMEA"),
            sub("Finance", "Payroll", "EMEA"),
            sub("Finance", "AP", "US"),
        ];
        let structure = BusinessStructure::from_rows(&rows, &subs);

        assert_eq!(structure.sub_teams_for("Finance", "Payroll"), vec!["EMEA"]);
        assert!(structure.sub_teams_for("Finance", "AP").is_empty());
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let data = ReferenceData {
            roles: vec![RoleItem {
                id: Some(2),
                name: "Owner".to_string(),
                role_type: String::new(),
            }],
            unit_of_measure: vec![UnitOfMeasureItem {
                id: Some(5),
                name: " USD ".to_string(),
                measure_type: String::new(),
            }],
            ..ReferenceData::default()
        };
        let maps = data.lookups();

        assert_eq!(maps.role_id("owner"), Some(RoleId(2)));
        assert_eq!(maps.role_id("  OWNER "), Some(RoleId(2)));
        assert_eq!(maps.unit_id("usd"), Some(UnitOfMeasureId(5)));
        assert_eq!(maps.unit_id("EUR"), None);
    }

    #[test]
    fn lookup_skips_rows_without_id() {
        let data = ReferenceData {
            status: vec![
                NamedItem {
                    id: None,
                    name: "Draft".to_string(),
                },
                NamedItem {
                    id: Some(1),
                    name: "draft".to_string(),
                },
            ],
            ..ReferenceData::default()
        };
        assert_eq!(data.lookups().status_id("Draft"), Some(StatusId(1)));
    }

    #[test]
    fn dedup_labels_keeps_first_spelling() {
        let labels = dedup_labels(["Chatbot", " chatbot", "Vision", "", "VISION"]);
        assert_eq!(labels, vec!["Chatbot", "Vision"]);
    }

    #[test]
    fn role_options_put_primary_contact_first() {
        let roles = vec![
            RoleItem {
                id: Some(1),
                name: "Sponsor".to_string(),
                role_type: String::new(),
            },
            RoleItem {
                id: Some(2),
                name: "sponsor".to_string(),
                role_type: String::new(),
            },
        ];
        assert_eq!(role_options(&roles), vec!["Primary Contact", "Sponsor"]);
    }

    #[test]
    fn vendor_models_dedup_and_sort() {
        let items = vec![
            VendorModelItem {
                id: Some(2),
                vendor_name: "OpenAI".to_string(),
                product_name: "GPT-4o".to_string(),
            },
            VendorModelItem {
                id: Some(1),
                vendor_name: "OpenAI".to_string(),
                product_name: "Embeddings".to_string(),
            },
            VendorModelItem {
                id: Some(2),
                vendor_name: "OpenAI".to_string(),
                product_name: "Duplicate".to_string(),
            },
            VendorModelItem {
                id: Some(8),
                vendor_name: "InHouse".to_string(),
                product_name: String::new(),
            },
            VendorModelItem {
                id: None,
                vendor_name: "Ghost".to_string(),
                product_name: "Nothing".to_string(),
            },
        ];
        let grouped = vendor_models(&items);

        let openai: Vec<&str> = grouped["OpenAI"].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(openai, vec!["Embeddings", "GPT-4o"]);
        assert_eq!(grouped["InHouse"][0].name, "InHouse");
        assert!(!grouped.contains_key("Ghost"));
    }

    #[test]
    fn reference_data_deserializes_partial_payload() {
        let data: ReferenceData =
            serde_json::from_str(r#"{"phases":[{"id":1,"name":"Idea"}]}"#).expect("parse");
        assert_eq!(data.phases.len(), 1);
        assert!(data.roles.is_empty());
    }
}
