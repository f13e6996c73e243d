use serde_json::Value;
use std::collections::BTreeSet;

use crate::features::{Feature, FeatureClass};

pub const JOIN_COUNT_FIELD: &str = "Join_Count";
pub const TARGET_FID_FIELD: &str = "TARGET_FID";

/// How a join table relates to its targets.
pub struct JoinSpec<'a> {
    /// Join-table field holding the key of the target a row belongs to.
    pub key_field: &'a str,
    /// Join-table field holding the row's distance to that target.
    pub distance_field: &'a str,
    /// Join-table fields copied onto the target from its nearest row.
    pub carry_fields: &'a [&'a str],
}

/// Output field names, suffixed `_1`, `_2`, ... when the targets or an
/// earlier output field already use the name.
struct FieldNames {
    taken: BTreeSet<String>,
}

impl FieldNames {
    fn new(target: &FeatureClass) -> Self {
        Self {
            taken: target.field_names(),
        }
    }

    fn claim(&mut self, field: &str) -> String {
        let name = if self.taken.contains(field) {
            (1..)
                .map(|n| format!("{}_{}", field, n))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_else(|| field.to_string())
        } else {
            field.to_string()
        };
        self.taken.insert(name.clone());
        name
    }
}

/// One-to-one join keeping every target. Each output feature is the target
/// with a join count, its `TARGET_FID` and the carried fields of its nearest
/// related join row (nulls when it has none). Rows relate to a target through
/// `spec.key_field`; the spatial test happened when the rows were built.
pub fn join_one_to_one(
    targets: &FeatureClass,
    target_keys: &[Value],
    join_table: &FeatureClass,
    spec: &JoinSpec<'_>,
    output_name: &str,
) -> FeatureClass {
    let mut names = FieldNames::new(targets);
    let count_field = names.claim(JOIN_COUNT_FIELD);
    let fid_field = names.claim(TARGET_FID_FIELD);
    let carried: Vec<(&str, String)> = spec
        .carry_fields
        .iter()
        .map(|field| (*field, names.claim(field)))
        .collect();

    let mut output = FeatureClass::new(output_name, targets.spatial_reference);
    for (target, key) in targets.features.iter().zip(target_keys) {
        let related: Vec<&Feature> = join_table
            .features
            .iter()
            .filter(|row| row.attributes.get(spec.key_field) == Some(key))
            .collect();
        let nearest = related.iter().min_by(|a, b| {
            let da = a.attributes.get(spec.distance_field).and_then(Value::as_f64);
            let db = b.attributes.get(spec.distance_field).and_then(Value::as_f64);
            da.unwrap_or(f64::INFINITY)
                .total_cmp(&db.unwrap_or(f64::INFINITY))
        });

        let mut joined = target.clone();
        joined.set_field(&count_field, Value::from(related.len()));
        joined.set_field(&fid_field, Value::from(target.oid));
        for (source_field, output_field) in &carried {
            let value = nearest
                .and_then(|row| row.attributes.get(*source_field).cloned())
                .unwrap_or(Value::Null);
            joined.set_field(output_field, value);
        }
        output.features.push(joined);
    }
    output
}
