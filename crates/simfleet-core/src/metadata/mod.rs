// ── Device metadata lookup ──
//
// Resolves screen geometry for a device, by device-type identifier
// (probed set only) or by display name (exact, then most-specific
// substring). On a name collision each probed field overrides the
// bundled one; fields the probe could not read keep the bundled value. The merged index is swapped in atomically on refresh,
// so lookups never block on a probe in progress.

mod bundled;
mod probe;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use simfleet_api::DeviceControl;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::DeviceKind;

/// Bundle reads in flight at once during a probe.
const PROBE_CONCURRENCY: usize = 8;

/// Where a metadata record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Read from the device-type bundle on this host.
    Probed,
    /// Shipped device table (or a user replacement for it).
    Bundled,
}

/// Screen geometry and form factor for one device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub screen_size_inches: Option<f64>,
    pub physical_resolution: Option<String>,
    pub logical_resolution: Option<String>,
    pub classification: DeviceKind,
    pub scale: Option<f64>,
    pub pixel_density: Option<f64>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
    pub point_width: Option<u32>,
    pub point_height: Option<u32>,
    pub source: MetadataSource,
}

impl DeviceMetadata {
    /// Fill every field this record lacks from `base`. Classification
    /// and source stay as they are.
    #[must_use]
    pub fn overlay(self, base: &DeviceMetadata) -> Self {
        Self {
            screen_size_inches: self.screen_size_inches.or(base.screen_size_inches),
            physical_resolution: self
                .physical_resolution
                .or_else(|| base.physical_resolution.clone()),
            logical_resolution: self
                .logical_resolution
                .or_else(|| base.logical_resolution.clone()),
            classification: self.classification,
            scale: self.scale.or(base.scale),
            pixel_density: self.pixel_density.or(base.pixel_density),
            pixel_width: self.pixel_width.or(base.pixel_width),
            pixel_height: self.pixel_height.or(base.pixel_height),
            point_width: self.point_width.or(base.point_width),
            point_height: self.point_height.or(base.point_height),
            source: self.source,
        }
    }
}

#[derive(Debug, Default)]
struct MetadataIndex {
    by_name: HashMap<String, DeviceMetadata>,
    by_identifier: HashMap<String, DeviceMetadata>,
    /// `by_name` keys, longest first, ties in ascending text order.
    fuzzy_keys: Vec<String>,
}

impl MetadataIndex {
    fn new(
        by_name: HashMap<String, DeviceMetadata>,
        by_identifier: HashMap<String, DeviceMetadata>,
    ) -> Self {
        let mut fuzzy_keys: Vec<String> = by_name.keys().cloned().collect();
        fuzzy_keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            by_name,
            by_identifier,
            fuzzy_keys,
        }
    }
}

/// Injected metadata service. Share it as `Arc<MetadataLookup>`.
pub struct MetadataLookup {
    fallback: BTreeMap<String, DeviceMetadata>,
    index: ArcSwap<MetadataIndex>,
}

impl MetadataLookup {
    /// Lookup backed by the bundled device table.
    pub fn bundled() -> Self {
        match bundled::parse(bundled::BUNDLED_SPECS) {
            Ok(table) => Self::with_fallback(table),
            Err(e) => {
                warn!(error = %e, "bundled device specs unreadable, starting empty");
                Self::with_fallback(BTreeMap::new())
            }
        }
    }

    /// Lookup backed by a device table in the bundled JSON shape.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        bundled::parse(json).map(Self::with_fallback)
    }

    /// Lookup backed by a user-supplied device table on disk.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    /// Lookup over explicit name-keyed entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, DeviceMetadata)>) -> Self {
        Self::with_fallback(entries.into_iter().collect())
    }

    fn with_fallback(fallback: BTreeMap<String, DeviceMetadata>) -> Self {
        let by_name = fallback.clone().into_iter().collect();
        Self {
            fallback,
            index: ArcSwap::from_pointee(MetadataIndex::new(by_name, HashMap::new())),
        }
    }

    /// Resolve by display name: exact key, else the longest key the name contains.
    pub fn resolve(&self, name: &str) -> Option<DeviceMetadata> {
        let index = self.index.load();
        if let Some(md) = index.by_name.get(name) {
            return Some(md.clone());
        }
        index
            .fuzzy_keys
            .iter()
            .find(|key| name.contains(key.as_str()))
            .and_then(|key| index.by_name.get(key))
            .cloned()
    }

    /// Resolve by device-type identifier. Only probed entries are keyed this way.
    pub fn resolve_identifier(&self, device_type_id: &str) -> Option<DeviceMetadata> {
        self.index.load().by_identifier.get(device_type_id).cloned()
    }

    /// Identifier first, then display name.
    pub fn lookup(&self, device_type_id: Option<&str>, name: &str) -> Option<DeviceMetadata> {
        device_type_id
            .and_then(|id| self.resolve_identifier(id))
            .or_else(|| self.resolve(name))
    }

    /// Number of name-keyed entries currently indexed.
    pub fn len(&self) -> usize {
        self.index.load().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Probe every device-type bundle and swap in the merged index.
    ///
    /// Returns the number of probed entries. Failing to list device types
    /// is an error; a single unreadable bundle is skipped.
    pub async fn refresh(&self, control: &dyn DeviceControl) -> Result<usize, CoreError> {
        let types = control.list_device_types().await?;
        let total = types.len();

        let probed: Vec<_> = stream::iter(types)
            .map(|record| async move {
                let bundle = record.bundle_path.clone()?;
                match control.read_screen_profile(&bundle).await {
                    Ok(profile) => {
                        let md = probe::metadata_from_profile(&record, &profile);
                        Some((record, md))
                    }
                    Err(e) => {
                        debug!(device_type = %record.identifier, error = %e, "profile probe failed");
                        None
                    }
                }
            })
            .buffer_unordered(PROBE_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect()
            .await;

        let count = probed.len();
        let mut by_name: HashMap<String, DeviceMetadata> =
            self.fallback.clone().into_iter().collect();
        let mut by_identifier = HashMap::with_capacity(count);
        for (record, md) in probed {
            let md = match self.fallback.get(&record.name) {
                Some(bundled) => md.overlay(bundled),
                None => md,
            };
            by_identifier.insert(record.identifier, md.clone());
            by_name.insert(record.name, md);
        }
        self.index
            .store(Arc::new(MetadataIndex::new(by_name, by_identifier)));

        info!(probed = count, device_types = total, "device metadata refreshed");
        Ok(count)
    }
}

impl Default for MetadataLookup {
    fn default() -> Self {
        Self::bundled()
    }
}

impl std::fmt::Debug for MetadataLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.load();
        f.debug_struct("MetadataLookup")
            .field("names", &index.by_name.len())
            .field("identifiers", &index.by_identifier.len())
            .finish_non_exhaustive()
    }
}
