//! Access point domain models as returned by `/accesspoints`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation of an access point, merged into its parent record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessPointStamp {
    pub id: String,
    pub ssid: String,
    pub frequency: f64,
    pub device_type: Option<String>,
    pub contributor_id: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub low_signal_level: f64,
    pub low_signal_latitude: f64,
    pub low_signal_longitude: f64,
    pub high_signal_level: f64,
    pub high_signal_latitude: f64,
    pub high_signal_longitude: f64,
    pub signal_radius: f64,
    pub signal_area: f64,
    pub raw_security_payload: Option<String>,
    pub security_standards: Option<String>,
    pub security_protocols: Option<String>,
    pub is_secure: bool,
    pub status: bool,
}

/// An access point record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessPoint {
    pub id: String,
    pub bssid: String,
    pub manufacturer: Option<String>,
    pub ssid: String,
    pub frequency: f64,
    pub device_type: Option<String>,
    pub contributor_id: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub version_timestamp: Option<DateTime<Utc>>,
    pub low_signal_level: f64,
    pub low_signal_latitude: f64,
    pub low_signal_longitude: f64,
    pub high_signal_level: f64,
    pub high_signal_latitude: f64,
    pub high_signal_longitude: f64,
    pub signal_radius: f64,
    pub signal_area: f64,
    pub raw_security_payload: Option<String>,
    pub security_standards: Option<String>,
    pub security_protocols: Option<String>,
    pub is_secure: bool,
    pub is_present: bool,
    pub run_identifier: Option<String>,
    pub note: Option<String>,
    pub display_status: bool,
    pub stamps: Vec<AccessPointStamp>,
}

/// `GET statistics/frequency` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyStatistic {
    pub frequency: f64,
    pub count: u64,
}

/// `GET statistics/manufacturer` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerStatistic {
    pub manufacturer: String,
    pub count: u64,
}

/// `GET statistics/encryption` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionStatistic {
    pub encryption: String,
    pub count: u64,
}

/// Options for `PUT merge`: which stamp properties get folded into the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub low_signal_level: bool,
    pub high_signal_level: bool,
    pub ssid: bool,
    pub security_data: bool,
}
