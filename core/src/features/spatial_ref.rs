use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prelude::{ToolError, ToolResult};

/// Well-known id of a coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

impl SpatialReference {
    pub const WGS84: SpatialReference = SpatialReference { wkid: 4326 };
    pub const WEB_MERCATOR: SpatialReference = SpatialReference { wkid: 3857 };

    /// Folds the legacy Web Mercator ids onto 3857.
    pub fn new(wkid: u32) -> Self {
        match wkid {
            102100 | 102113 | 900913 => Self::WEB_MERCATOR,
            other => Self { wkid: other },
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.wkid == Self::WGS84.wkid
    }

    /// Parses `EPSG:3857`, `urn:ogc:def:crs:EPSG::3857`, `OGC:CRS84` and
    /// friends.
    pub fn parse(name: &str) -> ToolResult<Self> {
        let trimmed = name.trim();
        if trimmed.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        let code = trimmed
            .rsplit(':')
            .next()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ToolError::SpatialReference(format!("unrecognised crs '{}'", name)))?;
        code.parse::<u32>()
            .map(Self::new)
            .map_err(|_| ToolError::SpatialReference(format!("unrecognised crs '{}'", name)))
    }

    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.wkid)
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.wkid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_crs_spellings() {
        assert_eq!(
            SpatialReference::parse("urn:ogc:def:crs:EPSG::3857").unwrap(),
            SpatialReference::WEB_MERCATOR
        );
        assert_eq!(
            SpatialReference::parse("EPSG:102100").unwrap(),
            SpatialReference::WEB_MERCATOR
        );
        assert_eq!(
            SpatialReference::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            SpatialReference::WGS84
        );
        assert!(SpatialReference::parse("not a crs").is_err());
    }
}
