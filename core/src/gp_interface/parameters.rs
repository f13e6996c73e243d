use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::features::{read_feature_class, GeometryKind};
use crate::prelude::{ToolError, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterType {
    FeatureLayer,
    RasterLayer,
    Field,
    Boolean,
    Long,
    Double,
    String,
    FeatureClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Input,
    Output,
}

/// One parameter of a tool as a host UI would present it.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDef {
    pub name: &'static str,
    pub display_name: &'static str,
    pub datatype: ParameterType,
    pub direction: Direction,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_filter: Option<GeometryKind>,
    /// Layer parameter whose fields a `Field` parameter picks from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<&'static str>,
}

impl ParameterDef {
    pub fn new(
        name: &'static str,
        display_name: &'static str,
        datatype: ParameterType,
        direction: Direction,
        required: bool,
    ) -> Self {
        Self {
            name,
            display_name,
            datatype,
            direction,
            required,
            default: None,
            geometry_filter: None,
            depends_on: None,
            choices: Vec::new(),
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_filter(mut self, kind: GeometryKind) -> Self {
        self.geometry_filter = Some(kind);
        self
    }

    pub fn depends_on(mut self, layer: &'static str) -> Self {
        self.depends_on = Some(layer);
        self
    }

    pub fn with_choices(mut self, choices: &[&'static str]) -> Self {
        self.choices = choices.to_vec();
        self
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.datatype {
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Long => value.is_i64() || value.is_u64(),
            ParameterType::Double => value.is_number(),
            ParameterType::FeatureLayer
            | ParameterType::RasterLayer
            | ParameterType::Field
            | ParameterType::String
            | ParameterType::FeatureClass => value.is_string(),
        }
    }
}

/// Parameter values supplied for one tool run, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterValues(BTreeMap<String, Value>);

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Sets `name` only when `value` is present.
    pub fn set_opt<V: Into<Value>>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> ToolResult<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParameter(format!("'{}' is missing", name)))
    }

    pub fn path(&self, name: &str) -> ToolResult<PathBuf> {
        self.str(name).map(PathBuf::from)
    }

    pub fn bool_or(&self, name: &str, fallback: bool) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(fallback)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub(crate) fn validate_against(&mut self, defs: &[ParameterDef]) -> ToolResult<()> {
        if let Some(unknown) = self
            .0
            .keys()
            .find(|key| !defs.iter().any(|def| def.name == key.as_str()))
        {
            return Err(ToolError::InvalidParameter(format!(
                "unknown parameter '{}'",
                unknown
            )));
        }

        for def in defs {
            if self.get(def.name).is_none() {
                match (&def.default, def.required) {
                    (Some(default), _) => {
                        self.0.insert(def.name.to_string(), default.clone());
                    }
                    (None, true) => {
                        return Err(ToolError::InvalidParameter(format!(
                            "'{}' ({}) is required",
                            def.display_name, def.name
                        )))
                    }
                    (None, false) => continue,
                }
            }
            let Some(value) = self.get(def.name) else {
                continue;
            };
            if !def.type_matches(value) {
                return Err(ToolError::InvalidParameter(format!(
                    "'{}' expects a {:?} value, got {}",
                    def.name, def.datatype, value
                )));
            }
            if !def.choices.is_empty() {
                let text = value.as_str().unwrap_or_default().to_ascii_lowercase();
                if !def.choices.iter().any(|choice| *choice == text) {
                    return Err(ToolError::InvalidParameter(format!(
                        "'{}' must be one of {:?}",
                        def.name, def.choices
                    )));
                }
            }
            self.check_layer(def)?;
        }

        for def in defs.iter().filter(|def| def.datatype == ParameterType::Field) {
            self.check_field(def)?;
        }
        Ok(())
    }

    fn check_layer(&self, def: &ParameterDef) -> ToolResult<()> {
        if def.direction != Direction::Input
            || !matches!(
                def.datatype,
                ParameterType::FeatureLayer | ParameterType::RasterLayer
            )
        {
            return Ok(());
        }
        let path = self.path(def.name)?;
        if !path.exists() {
            return Err(ToolError::InvalidParameter(format!(
                "'{}' does not exist: {}",
                def.name,
                path.display()
            )));
        }
        if let Some(kind) = def.geometry_filter {
            read_feature_class(&path)?.require_kind(kind)?;
        }
        Ok(())
    }

    fn check_field(&self, def: &ParameterDef) -> ToolResult<()> {
        let (Some(layer), Some(field)) = (def.depends_on, self.get(def.name)) else {
            return Ok(());
        };
        let field = field.as_str().unwrap_or_default();
        let layer_path = self.path(layer)?;
        read_feature_class(&layer_path)?.require_field(field)
    }
}
