//! Command-line arguments.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hydrolink_core::series::{QueryWindow, StationRow};
use hydrolink_core::submission::DataFormat;
use hydrolink_core::variety::{DataType, TimeZoneMode, Variety};
use hydrolink_pipeline::{ImportLabels, ImportRequest};

#[derive(Parser)]
#[command(name = "hydrolink-import", about = "Import USGS time series into a project")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch series for the given stations and write them through the server
    Run(RunArgs),
    /// List stations in a state that report a variety
    Stations {
        /// Two-letter state code (e.g., "md")
        state: String,
        /// Variety the stations must report
        #[arg(long, default_value = "FLOW")]
        variety: Variety,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Dss,
    Json,
}

impl From<FormatArg> for DataFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Dss => DataFormat::Dss,
            FormatArg::Json => DataFormat::Json,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Write server API base URL
    #[arg(long, env = "HYDROLINK_SERVER", default_value = "http://localhost:5000/api")]
    pub server: String,

    /// Project receiving the import
    #[arg(long)]
    pub project: String,

    /// Station as `ID` or `ID:A:B:F` with pathname part overrides (repeatable)
    #[arg(long = "station", required = true, value_parser = parse_station)]
    pub stations: Vec<StationRow>,

    /// Comma-separated varieties (default: FLOW)
    #[arg(long, value_delimiter = ',')]
    pub varieties: Vec<Variety>,

    /// `daily`, `instantaneous`, or `annualPeaks`
    #[arg(long, default_value = "daily")]
    pub data_type: DataType,

    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to fetch (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Fetch the full period of record
    #[arg(long)]
    pub por: bool,

    /// `UTC` or `LOCAL_STANDARD`
    #[arg(long, default_value = "UTC")]
    pub time_zone: TimeZoneMode,

    #[arg(long, value_enum, default_value = "dss")]
    pub format: FormatArg,

    /// Output directory on the server (default: the project directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Display name stored with the import
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

impl RunArgs {
    pub fn to_request(&self) -> ImportRequest {
        ImportRequest {
            stations: self.stations.clone(),
            varieties: self.varieties.clone(),
            window: QueryWindow {
                data_type: self.data_type,
                start_date: self.start,
                end_date: self.end,
                retrieve_por: self.por,
                time_zone: self.time_zone,
            },
            data_format: self.format.into(),
            dir: self.dir.clone(),
            labels: ImportLabels {
                project: self.project.clone(),
                name: self.name.clone(),
                description: self.description.clone(),
            },
        }
    }
}

/// `ID[:A[:B[:F]]]`; empty parts fall back to the defaults.
fn parse_station(raw: &str) -> Result<StationRow, String> {
    let mut parts = raw.split(':').map(str::trim);
    let id = parts.next().unwrap_or_default();
    if id.is_empty() {
        return Err("station id is empty".to_string());
    }
    let mut row = StationRow::new(id);
    row.a_part = parts.next().unwrap_or_default().to_string();
    row.b_part = parts.next().unwrap_or_default().to_string();
    row.f_part = parts.next().unwrap_or_default().to_string();
    if parts.next().is_some() {
        return Err(format!("too many parts in '{raw}'; expected ID:A:B:F"));
    }
    Ok(row)
}
