use std::collections::{BTreeSet, HashMap};

use slate_core::AppError;
use slate_models::{Action, PermissionRule, ResourceType, Role};

/// Lookup table from `(resource_type, action)` to exactly one rule.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    rules: HashMap<(ResourceType, Action), PermissionRule>,
    ownership_override: BTreeSet<Role>,
}

impl PermissionMatrix {
    /// Builds a matrix from a rule list. Two rules for the same pair make the
    /// matrix ambiguous and are rejected as a configuration error.
    pub fn from_rules(rules: impl IntoIterator<Item = PermissionRule>) -> Result<Self, AppError> {
        let mut map = HashMap::new();
        for rule in rules {
            let key = (rule.resource_type, rule.action);
            if map.insert(key, rule).is_some() {
                return Err(AppError::configuration(format!(
                    "Duplicate permission rule for ({}, {})",
                    key.0, key.1
                )));
            }
        }

        Ok(Self {
            rules: map,
            ownership_override: BTreeSet::from([Role::Admin]),
        })
    }

    /// Replaces the set of roles that skip the ownership predicate.
    pub fn with_ownership_override(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.ownership_override = roles.into_iter().collect();
        self
    }

    pub fn rule(&self, resource_type: ResourceType, action: Action) -> Result<&PermissionRule, AppError> {
        self.rules.get(&(resource_type, action)).ok_or_else(|| {
            AppError::configuration(format!(
                "No permission rule for ({resource_type}, {action})"
            ))
        })
    }

    pub fn overrides_ownership(&self, role: Role) -> bool {
        self.ownership_override.contains(&role)
    }

    /// Rules sorted by `(resource_type, action)`.
    pub fn rules(&self) -> Vec<&PermissionRule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by_key(|rule| (rule.resource_type, rule.action));
        rules
    }

    /// Fails when any pair `required` has a rule for is missing here.
    pub fn ensure_covers(&self, required: &PermissionMatrix) -> Result<(), AppError> {
        let missing: Vec<String> = required
            .rules()
            .into_iter()
            .map(|rule| (rule.resource_type, rule.action))
            .filter(|key| !self.rules.contains_key(key))
            .map(|(resource_type, action)| format!("({resource_type}, {action})"))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(AppError::configuration(format!(
            "Permission rules missing for {}",
            missing.join(", ")
        )))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule set every school starts from. Covers each pair the API uses.
    pub fn school_defaults() -> Self {
        use Action::*;
        use ResourceType as R;

        let rules = [
            PermissionRule::new(R::Enrollment, Create, [Role::Admin, Role::Staff]),
            PermissionRule::new(
                R::Course,
                Read,
                [Role::Admin, Role::Principal, Role::Staff, Role::Teacher],
            ),
            PermissionRule::new(R::Course, Create, [Role::Admin, Role::Principal]),
            PermissionRule::new(R::Course, Update, [Role::Admin, Role::Principal]),
            PermissionRule::new(R::Student, Read, [Role::Admin, Role::Student]).owned(),
            PermissionRule::new(R::Student, Delete, [Role::Admin]),
            PermissionRule::new(R::Principal, Update, [Role::Admin]),
            PermissionRule::new(R::AuditRecord, Read, [Role::Admin, Role::Principal]),
        ];

        Self {
            rules: rules
                .into_iter()
                .map(|rule| ((rule.resource_type, rule.action), rule))
                .collect(),
            ownership_override: BTreeSet::from([Role::Admin]),
        }
    }
}
