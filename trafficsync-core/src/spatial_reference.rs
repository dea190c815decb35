//! Spatial reference identifiers used by feeds and feature layers.
//!
//! References are identified by their well-known id (WKID). Only the two
//! references the traffic feeds actually use are understood by the
//! normalizer: WGS-84 and spherical Web Mercator.
//!
//! # Examples
//! ```
//! use trafficsync_core::SpatialReference;
//!
//! let reference = SpatialReference::from_crs_name("urn:ogc:def:crs:EPSG::3857");
//! assert_eq!(reference, Some(SpatialReference::WEB_MERCATOR));
//! assert!(SpatialReference::WGS84.is_wgs84());
//! ```

use std::fmt;

/// A spatial reference identified by its well-known id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialReference {
    wkid: u32,
}

/// Legacy identifiers that denote spherical Web Mercator.
const WEB_MERCATOR_ALIASES: [u32; 4] = [3857, 102_100, 102_113, 900_913];

impl SpatialReference {
    /// Geographic WGS-84 (`EPSG:4326`), the canonical reference.
    pub const WGS84: Self = Self::new(4326);
    /// Spherical Web Mercator (`EPSG:3857`).
    pub const WEB_MERCATOR: Self = Self::new(3857);

    /// Construct a reference from a well-known id.
    #[must_use]
    pub const fn new(wkid: u32) -> Self {
        Self { wkid }
    }

    /// The well-known id.
    #[must_use]
    pub const fn wkid(self) -> u32 {
        self.wkid
    }

    /// Whether this is the canonical geographic reference.
    #[must_use]
    pub const fn is_wgs84(self) -> bool {
        self.wkid == Self::WGS84.wkid
    }

    /// Whether this is spherical Web Mercator under any of its identifiers.
    #[must_use]
    pub fn is_web_mercator(self) -> bool {
        WEB_MERCATOR_ALIASES.contains(&self.wkid)
    }

    /// Parse a coordinate reference system name as found in GeoJSON `crs`
    /// members.
    ///
    /// Accepts `EPSG:n`, `urn:ogc:def:crs:EPSG::n` (with or without a
    /// version segment) and the OGC `CRS84` alias for WGS-84. Returns `None`
    /// for anything else.
    #[must_use]
    pub fn from_crs_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
            || trimmed.eq_ignore_ascii_case("urn:ogc:def:crs:OGC::CRS84")
        {
            return Some(Self::WGS84);
        }
        let code = trimmed.rsplit(':').next()?;
        let authority_ok = trimmed
            .to_ascii_uppercase()
            .split(':')
            .any(|segment| segment == "EPSG");
        if !authority_ok {
            return None;
        }
        code.parse::<u32>().ok().map(Self::new)
    }
}

impl Default for SpatialReference {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.wkid)
    }
}
