use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::features::geometry::{Geometry, GeometryKind};
use crate::features::spatial_ref::SpatialReference;
use crate::prelude::{ToolError, ToolResult};

/// Name of the object id field every feature class exposes.
pub const OID_FIELD: &str = "OBJECTID";

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub oid: i64,
    pub geometry: Geometry,
    pub attributes: Map<String, Value>,
}

impl Feature {
    pub fn new(oid: i64, geometry: Geometry, attributes: Map<String, Value>) -> Self {
        Self {
            oid,
            geometry,
            attributes,
        }
    }

    /// Looks up an attribute; the OID field resolves to the feature's oid even
    /// when it is not stored as an attribute.
    pub fn field(&self, name: &str) -> ToolResult<Value> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value.clone());
        }
        if name == OID_FIELD {
            return Ok(Value::from(self.oid));
        }
        Err(ToolError::FieldNotFound(format!(
            "'{}' on feature {}",
            name, self.oid
        )))
    }

    /// Like [`Feature::field`], but a property this feature does not carry
    /// reads as null. Sparse GeoJSON omits properties per feature.
    pub fn value(&self, name: &str) -> Value {
        self.field(name).unwrap_or(Value::Null)
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }
}

/// An in-memory feature class: a named, homogeneous set of features in one
/// spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureClass {
    pub name: String,
    pub spatial_reference: SpatialReference,
    pub features: Vec<Feature>,
}

impl FeatureClass {
    pub fn new(name: impl Into<String>, spatial_reference: SpatialReference) -> Self {
        Self {
            name: name.into(),
            spatial_reference,
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Union of attribute names across all features, plus the OID field.
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .features
            .iter()
            .flat_map(|feature| feature.attributes.keys().cloned())
            .collect();
        names.insert(OID_FIELD.to_string());
        names
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == OID_FIELD
            || self
                .features
                .iter()
                .any(|feature| feature.attributes.contains_key(name))
    }

    pub fn require_field(&self, name: &str) -> ToolResult<()> {
        if self.has_field(name) {
            Ok(())
        } else {
            Err(ToolError::FieldNotFound(format!(
                "'{}' in feature class '{}'",
                name, self.name
            )))
        }
    }

    /// The common geometry kind, or `None` for an empty or mixed class.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        let first = self.features.first()?.geometry.kind();
        self.features
            .iter()
            .all(|feature| feature.geometry.kind() == first)
            .then_some(first)
    }

    pub fn require_kind(&self, kind: GeometryKind) -> ToolResult<()> {
        match self.geometry_kind() {
            Some(found) if found == kind => Ok(()),
            None if self.is_empty() => Ok(()),
            found => Err(ToolError::UnsupportedGeometry(format!(
                "feature class '{}' must contain {:?} features, found {:?}",
                self.name, kind, found
            ))),
        }
    }

    pub fn add_field(&mut self, name: &str, default: Value) {
        for feature in &mut self.features {
            feature
                .attributes
                .entry(name.to_string())
                .or_insert_with(|| default.clone());
        }
    }

    pub fn max_oid(&self) -> i64 {
        self.features.iter().map(|f| f.oid).max().unwrap_or(0)
    }
}
