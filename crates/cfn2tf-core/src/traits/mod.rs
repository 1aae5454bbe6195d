//! Per resource type emission rules.
//!
//! The built-in table lives in `traits.yaml` and is deserialized into a
//! [`TraitRegistry`] that callers construct once and pass by reference.
//! Lookups return the shared `all` entry merged with the type-specific
//! entry; unknown types get `all` alone.

use std::collections::{BTreeMap, HashMap, HashSet};

use heck::ToSnakeCase;
use serde::Deserialize;

use crate::events::Scalar;
use crate::path::AttributePath;

const BUILTIN_TRAITS: &str = include_str!("traits.yaml");

/// Name of the entry merged into every resource type.
pub const SHARED_TRAITS: &str = "all";

/// Error loading a traits document.
#[derive(Debug, thiserror::Error)]
pub enum TraitError {
    #[error("invalid traits document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate traits entry for '{0}'")]
    Duplicate(String),
}

/// Classification of an attribute's value, as seen by the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeContent {
    Null,
    EmptyString,
    BooleanFalse,
    EmptyCollection,
    /// Scalar equal to a conditional attribute's suppressed value.
    ConditionalDefault,
    Value,
    BlockList,
    BlockObject,
    Sequence,
    Mapping,
}

impl AttributeContent {
    /// True for content that is not worth emitting unless required.
    pub fn is_empty(self) -> bool {
        matches!(
            self,
            AttributeContent::Null
                | AttributeContent::EmptyString
                | AttributeContent::BooleanFalse
                | AttributeContent::EmptyCollection
                | AttributeContent::ConditionalDefault
        )
    }
}

/// An attribute emitted only when its value differs from `value`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalAttribute {
    pub name: String,
    pub value: serde_json::Value,
}

/// Emission rules for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceTraits {
    pub resource_type: String,
    pub required_attributes: Vec<String>,
    pub unconfigurable_attributes: Vec<String>,
    pub non_block_type_attributes: Vec<String>,
    pub block_object_attributes: Vec<String>,
    pub repeated_block_attributes: Vec<String>,
    pub default_values: BTreeMap<String, serde_json::Value>,
    pub conflicting_arguments: Vec<Vec<String>>,
    pub conditional_attributes: Vec<ConditionalAttribute>,
    pub attribute_map: BTreeMap<String, String>,
}

impl ResourceTraits {
    /// Merges the shared entry with a specific one.
    ///
    /// List fields are concatenated; maps are merged with the specific
    /// entry winning on overlap.
    fn consolidate(shared: &ResourceTraits, specific: &ResourceTraits) -> ResourceTraits {
        fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }
        fn merge<V: Clone>(a: &BTreeMap<String, V>, b: &BTreeMap<String, V>) -> BTreeMap<String, V> {
            let mut merged = a.clone();
            merged.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        }

        ResourceTraits {
            resource_type: specific.resource_type.clone(),
            required_attributes: concat(&shared.required_attributes, &specific.required_attributes),
            unconfigurable_attributes: concat(
                &shared.unconfigurable_attributes,
                &specific.unconfigurable_attributes,
            ),
            non_block_type_attributes: concat(
                &shared.non_block_type_attributes,
                &specific.non_block_type_attributes,
            ),
            block_object_attributes: concat(
                &shared.block_object_attributes,
                &specific.block_object_attributes,
            ),
            repeated_block_attributes: concat(
                &shared.repeated_block_attributes,
                &specific.repeated_block_attributes,
            ),
            default_values: merge(&shared.default_values, &specific.default_values),
            conflicting_arguments: concat(
                &shared.conflicting_arguments,
                &specific.conflicting_arguments,
            ),
            conditional_attributes: concat(
                &shared.conditional_attributes,
                &specific.conditional_attributes,
            ),
            attribute_map: merge(&shared.attribute_map, &specific.attribute_map),
        }
    }

    pub fn is_required(&self, path: &AttributePath) -> bool {
        matches_any(path, &self.required_attributes)
    }

    pub fn is_unconfigurable(&self, path: &AttributePath) -> bool {
        path.is_like("tags_all") || matches_any(path, &self.unconfigurable_attributes)
    }

    pub fn is_non_block_type(&self, path: &AttributePath) -> bool {
        matches_any(path, &self.non_block_type_attributes)
    }

    pub fn is_block_object(&self, path: &AttributePath) -> bool {
        matches_any(path, &self.block_object_attributes)
    }

    pub fn is_repeated_block(&self, path: &AttributePath) -> bool {
        matches_any(path, &self.repeated_block_attributes)
    }

    /// The default value for `path`, if one is declared.
    pub fn default_for(&self, path: &AttributePath) -> Option<&serde_json::Value> {
        self.default_values
            .iter()
            .find(|(pattern, _)| path.is_like(pattern))
            .map(|(_, value)| value)
    }

    /// Substitutes the declared default for a null scalar.
    ///
    /// Non-null scalars and paths without a default come back unchanged,
    /// so applying this twice is the same as applying it once.
    pub fn apply_default(&self, path: &AttributePath, scalar: Scalar) -> Scalar {
        if scalar != Scalar::Null {
            return scalar;
        }
        self.default_for(path)
            .and_then(Scalar::from_json)
            .unwrap_or(scalar)
    }

    /// Returns true if `value` is the suppressed value of a conditional attribute.
    pub fn is_conditional_default(&self, path: &AttributePath, value: &serde_json::Value) -> bool {
        self.conditional_attributes
            .iter()
            .any(|c| path.is_like(&c.name) && &c.value == value)
    }

    /// Returns true if `path` loses a conflict: some earlier member of one
    /// of its conflict groups is among the `populated` paths.
    pub fn is_conflict_loser(&self, path: &AttributePath, populated: &HashSet<AttributePath>) -> bool {
        self.conflicting_arguments.iter().any(|group| {
            let Some(position) = group.iter().position(|p| path.is_like(p)) else {
                return false;
            };
            group[..position]
                .iter()
                .any(|winner| populated.iter().any(|p| p.is_like(winner)))
        })
    }

    /// Decides whether an attribute should be written.
    ///
    /// Required paths are always written. Conflict losers and
    /// unconfigurable paths never are. Anything else is written only
    /// when it has content.
    pub fn should_emit(
        &self,
        path: &AttributePath,
        content: AttributeContent,
        populated: &HashSet<AttributePath>,
    ) -> bool {
        if self.is_required(path) {
            return true;
        }
        if self.is_conflict_loser(path, populated) || self.is_unconfigurable(path) {
            return false;
        }
        !content.is_empty()
    }

    /// Maps a template attribute name (`DomainName`, `Endpoint.Address`)
    /// to the Terraform attribute name.
    pub fn map_attribute_name(&self, attribute: &str) -> String {
        if let Some(mapped) = self.attribute_map.get(attribute) {
            return mapped.clone();
        }
        attribute
            .split('.')
            .map(|segment| segment.to_snake_case())
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn matches_any(path: &AttributePath, patterns: &[String]) -> bool {
    patterns.iter().any(|p| path.is_like(p))
}

/// The trait table for all resource types.
#[derive(Debug, Clone)]
pub struct TraitRegistry {
    shared: ResourceTraits,
    by_type: HashMap<String, ResourceTraits>,
}

impl TraitRegistry {
    /// Loads the table that ships with the crate.
    pub fn builtin() -> Result<Self, TraitError> {
        Self::from_yaml(BUILTIN_TRAITS)
    }

    /// Loads a table from a YAML list of entries.
    pub fn from_yaml(text: &str) -> Result<Self, TraitError> {
        let entries: Vec<ResourceTraits> = serde_yaml::from_str(text)?;
        let mut shared = ResourceTraits {
            resource_type: SHARED_TRAITS.to_string(),
            ..ResourceTraits::default()
        };
        let mut by_type = HashMap::new();

        for entry in entries {
            if entry.resource_type == SHARED_TRAITS {
                shared = entry;
                continue;
            }
            if by_type.contains_key(&entry.resource_type) {
                return Err(TraitError::Duplicate(entry.resource_type));
            }
            by_type.insert(entry.resource_type.clone(), entry);
        }

        Ok(Self { shared, by_type })
    }

    /// Returns the consolidated traits for a Terraform resource type.
    pub fn get_traits(&self, resource_type: &str) -> ResourceTraits {
        match self.by_type.get(resource_type) {
            Some(specific) => ResourceTraits::consolidate(&self.shared, specific),
            None => {
                log::debug!("no traits for {}, using shared traits", resource_type);
                ResourceTraits {
                    resource_type: resource_type.to_string(),
                    ..self.shared.clone()
                }
            }
        }
    }

    /// Resource types with a specific entry.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }
}
