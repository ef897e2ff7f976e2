// ── Device domain types ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable device identity: the control tool's UDID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(udid: impl Into<String>) -> Self {
        Self(udid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── DeviceState ─────────────────────────────────────────────────────

/// Power state as reported by the control tool.
///
/// Anything other than `Booted`/`Shutdown` (e.g. `Booting`,
/// `Shutting Down`, `Creating`) is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Booted,
    Shutdown,
    Other(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Booted => "Booted",
            Self::Shutdown => "Shutdown",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_booted(&self) -> bool {
        matches!(self, Self::Booted)
    }
}

impl From<&str> for DeviceState {
    fn from(raw: &str) -> Self {
        match raw {
            "Booted" => Self::Booted,
            "Shutdown" => Self::Shutdown,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for DeviceState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Booted" => Self::Booted,
            "Shutdown" => Self::Shutdown,
            _ => Self::Other(raw),
        }
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DeviceKind ──────────────────────────────────────────────────────

/// Form-factor class. Declaration order is the sort priority.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Phone,
    Tablet,
    Other,
}

impl DeviceKind {
    /// Map a simctl `productFamily` / bundled `deviceType` value.
    pub fn from_family(family: &str) -> Option<Self> {
        match family {
            "iPhone" => Some(Self::Phone),
            "iPad" => Some(Self::Tablet),
            _ => None,
        }
    }

    /// Best-effort classification from a display name.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("iPhone") {
            Self::Phone
        } else if name.starts_with("iPad") {
            Self::Tablet
        } else {
            Self::Other
        }
    }

    pub fn is_handheld(self) -> bool {
        matches!(self, Self::Phone | Self::Tablet)
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// An immutable device record. State changes produce a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub state: DeviceState,
    pub runtime_key: String,
    pub device_type_id: Option<String>,
    pub kind: DeviceKind,
    /// Diagonal in inches; `0.0` when unknown.
    pub screen_size_inches: f64,
    /// `"W*H"` in pixels, or empty.
    pub physical_resolution: String,
    /// `"W*H"` in points, or empty.
    pub logical_resolution: String,
    pub is_available: bool,
}

impl Device {
    /// Copy of this record with a different state.
    pub fn with_state(&self, state: DeviceState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Multi-line summary suitable for pasting elsewhere.
    pub fn info_text(&self) -> String {
        let mut text = format!("Device: {}", self.name);
        if self.screen_size_inches > 0.0 {
            text.push_str(&format!("\nSize: {:.1}\"", self.screen_size_inches));
        }
        if !self.physical_resolution.is_empty() {
            text.push_str(&format!("\nResolution: {}", self.physical_resolution));
        }
        if !self.logical_resolution.is_empty() {
            text.push_str(&format!("\nPoints: {}", self.logical_resolution));
        }
        text
    }
}
