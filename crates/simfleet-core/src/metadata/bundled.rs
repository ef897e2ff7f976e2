// Static device geometry table.
//
// Shape: `{ "devices": { "<display name>": { screenSize, resolution,
// logicalResolution, deviceType } } }`. Resolutions are `"W*H"`.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{DeviceMetadata, MetadataSource};
use crate::error::CoreError;
use crate::model::DeviceKind;

/// The table shipped with the crate.
pub(super) const BUNDLED_SPECS: &str = include_str!("../../data/device_specs.json");

#[derive(Debug, Deserialize)]
struct SpecFile {
    devices: BTreeMap<String, SpecEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecEntry {
    screen_size: f64,
    resolution: String,
    logical_resolution: String,
    device_type: String,
}

/// Split `"1179*2556"` into its two dimensions.
fn dimensions(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.split_once('*')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

impl From<SpecEntry> for DeviceMetadata {
    fn from(entry: SpecEntry) -> Self {
        let pixels = dimensions(&entry.resolution);
        let points = dimensions(&entry.logical_resolution);
        let scale = pixels
            .zip(points)
            .filter(|(_, (pw, _))| *pw > 0)
            .map(|((w, _), (pw, _))| f64::from(w) / f64::from(pw));
        Self {
            screen_size_inches: Some(entry.screen_size).filter(|s| *s > 0.0),
            physical_resolution: Some(entry.resolution).filter(|r| !r.is_empty()),
            logical_resolution: Some(entry.logical_resolution).filter(|r| !r.is_empty()),
            classification: DeviceKind::from_family(&entry.device_type)
                .unwrap_or(DeviceKind::Other),
            scale,
            pixel_density: None,
            pixel_width: pixels.map(|(w, _)| w),
            pixel_height: pixels.map(|(_, h)| h),
            point_width: points.map(|(w, _)| w),
            point_height: points.map(|(_, h)| h),
            source: MetadataSource::Bundled,
        }
    }
}

/// Parse a device table into name-keyed metadata.
pub(super) fn parse(json: &str) -> Result<BTreeMap<String, DeviceMetadata>, CoreError> {
    let file: SpecFile = serde_json::from_str(json).map_err(|e| CoreError::Config {
        message: format!("invalid device table: {e}"),
    })?;
    Ok(file
        .devices
        .into_iter()
        .map(|(name, entry)| (name, DeviceMetadata::from(entry)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_parses() {
        let table = parse(BUNDLED_SPECS).expect("bundled table is valid");
        let md = &table["iPhone 15 Pro"];
        assert_eq!(md.classification, DeviceKind::Phone);
        assert_eq!(md.physical_resolution.as_deref(), Some("1179*2556"));
        assert_eq!(md.point_width, Some(393));
        assert!((md.scale.unwrap_or_default() - 3.0).abs() < 0.01);
        assert_eq!(table["iPad Air 13-inch (M2)"].classification, DeviceKind::Tablet);
    }

    #[test]
    fn malformed_table_is_a_config_error() {
        let err = parse("{\"devices\": []}").unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn dimensions_require_both_halves() {
        assert_eq!(dimensions("750*1334"), Some((750, 1334)));
        assert_eq!(dimensions("750"), None);
        assert_eq!(dimensions("a*b"), None);
    }
}
