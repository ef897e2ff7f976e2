// Device-type profile probing.
//
// Turns a device type's `profile.plist` geometry into metadata. Any
// field the profile omits stays `None`; in particular the diagonal is
// only computed when pixel density is known.

use simfleet_api::{DeviceTypeRecord, ScreenProfile};

use super::{DeviceMetadata, MetadataSource};
use crate::model::DeviceKind;

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn to_u32(value: f64) -> Option<u32> {
    (value.is_finite() && value > 0.0 && value <= f64::from(u32::MAX)).then(|| value.round() as u32)
}

fn resolution(width: Option<u32>, height: Option<u32>) -> Option<String> {
    Some(format!("{}*{}", width?, height?))
}

pub(super) fn metadata_from_profile(
    record: &DeviceTypeRecord,
    profile: &ScreenProfile,
) -> DeviceMetadata {
    let pixel_width = profile.width_px.and_then(to_u32);
    let pixel_height = profile.height_px.and_then(to_u32);
    let scale = profile.scale.filter(|s| s.is_finite() && *s > 0.0);
    let pixel_density = profile
        .width_dpi
        .or(profile.height_dpi)
        .filter(|d| d.is_finite() && *d > 0.0);

    let screen_size_inches = match (profile.width_px, profile.height_px, pixel_density) {
        (Some(w), Some(h), Some(dpi)) => {
            let diagonal = w.hypot(h) / dpi;
            Some((diagonal * 10.0).round() / 10.0)
        }
        _ => None,
    };

    let point = |px: Option<f64>| scale.and_then(|s| px.map(|p| p / s)).and_then(to_u32);
    let point_width = point(profile.width_px);
    let point_height = point(profile.height_px);

    DeviceMetadata {
        screen_size_inches,
        physical_resolution: resolution(pixel_width, pixel_height),
        logical_resolution: resolution(point_width, point_height),
        classification: record
            .product_family
            .as_deref()
            .and_then(DeviceKind::from_family)
            .unwrap_or_else(|| DeviceKind::from_name(&record.name)),
        scale,
        pixel_density,
        pixel_width,
        pixel_height,
        point_width,
        point_height,
        source: MetadataSource::Probed,
    }
}
