//! Physical quantity types ("varieties") and upstream data-type vocabulary.
//!
//! The importer only fetches flow and stage from the upstream service; the
//! other varieties exist so project files naming them still parse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Variety
// ---------------------------------------------------------------------------

/// The physical quantity a time series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Variety {
    Flow,
    Stage,
    Elevation,
    Precipitation,
    Storage,
    Swe,
    Temperature,
    Windspeed,
}

impl Variety {
    /// Upstream parameter code, or `None` when the service has no mapping.
    pub fn parameter_code(self) -> Option<&'static str> {
        match self {
            Variety::Flow => Some("00060"),
            Variety::Stage => Some("00065"),
            _ => None,
        }
    }

    /// Output units written alongside the values.
    pub fn units(self) -> &'static str {
        match self {
            Variety::Stage => "FT",
            _ => "CFS",
        }
    }

    /// Project store category the imported series is filed under.
    pub fn category(self) -> &'static str {
        match self {
            Variety::Stage => "Stage",
            _ => "Discharge",
        }
    }

    /// Parameter label used in plain-JSON payloads.
    pub fn parameter_label(self) -> &'static str {
        match self {
            Variety::Stage => "Stage",
            _ => "Flow",
        }
    }

    /// Default DSS output file for this variety.
    pub fn dss_file(self) -> &'static str {
        match self {
            Variety::Stage => "stage.dss",
            _ => "discharge.dss",
        }
    }

    /// Pathname C part for the given data type.
    pub fn c_part(self, data_type: DataType) -> &'static str {
        match (self, data_type) {
            (Variety::Stage, DataType::AnnualPeaks) => "STAGE-ANNUAL PEAK",
            (_, DataType::AnnualPeaks) => "FLOW-ANNUAL PEAK",
            (Variety::Stage, _) => "STAGE",
            _ => "FLOW",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variety::Flow => "FLOW",
            Variety::Stage => "STAGE",
            Variety::Elevation => "ELEVATION",
            Variety::Precipitation => "PRECIPITATION",
            Variety::Storage => "STORAGE",
            Variety::Swe => "SWE",
            Variety::Temperature => "TEMPERATURE",
            Variety::Windspeed => "WINDSPEED",
        }
    }
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variety {
    type Err = CoreError;

    /// Accepts the canonical names plus the common aliases found in
    /// imported project files (`DISCHARGE`, `Q`, `ELEV`, `TEMP`, ...).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FLOW" | "DISCHARGE" | "Q" => Ok(Variety::Flow),
            "STAGE" => Ok(Variety::Stage),
            "ELEVATION" | "ELEV" => Ok(Variety::Elevation),
            "PRECIP" | "PRECIPITATION" => Ok(Variety::Precipitation),
            "STORAGE" | "STOR" => Ok(Variety::Storage),
            "SWE" => Ok(Variety::Swe),
            "TEMPERATURE" | "TEMP" => Ok(Variety::Temperature),
            "WINDSPEED" => Ok(Variety::Windspeed),
            other => Err(CoreError::Validation(format!(
                "Unknown time series type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

/// Which upstream product a series is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Daily,
    Instantaneous,
    AnnualPeaks,
}

impl DataType {
    /// Upstream service id (`dv`, `iv`, `peak`).
    pub fn service_id(self) -> &'static str {
        match self {
            DataType::Daily => "dv",
            DataType::Instantaneous => "iv",
            DataType::AnnualPeaks => "peak",
        }
    }

    /// DSS value type recorded with the series.
    pub fn value_type(self) -> &'static str {
        match self {
            DataType::Daily => "PER-AVER",
            DataType::Instantaneous | DataType::AnnualPeaks => "INST-VAL",
        }
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" | "dv" => Ok(DataType::Daily),
            "instantaneous" | "iv" => Ok(DataType::Instantaneous),
            "annualpeaks" | "annual-peaks" | "peak" | "peaks" => Ok(DataType::AnnualPeaks),
            other => Err(CoreError::Validation(format!("Unknown data type '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeZoneMode
// ---------------------------------------------------------------------------

/// How fetched timestamps are expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeZoneMode {
    /// Instants in UTC.
    #[default]
    Utc,
    /// Wall-clock time in the station's local standard zone (no DST).
    LocalStandard,
}

impl FromStr for TimeZoneMode {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "UTC" => Ok(TimeZoneMode::Utc),
            "LOCAL_STANDARD" | "LOCAL" => Ok(TimeZoneMode::LocalStandard),
            other => Err(CoreError::Validation(format!("Unknown time zone '{other}'"))),
        }
    }
}
