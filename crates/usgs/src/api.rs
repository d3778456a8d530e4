//! HTTP client for the USGS water services.
//!
//! Wraps the NWIS daily-value (`dv`), instantaneous-value (`iv`), annual
//! peak and site endpoints using [`reqwest`].

use hydrolink_core::series::{Point, QueryWindow, StationTask};
use hydrolink_core::variety::{DataType, Variety};

use crate::parse::{parse_annual_peaks, parse_time_series_json};
use crate::station::{parse_site_listing, StationMeta};

/// Default base URL of the `dv`/`iv`/`site` services.
pub const DEFAULT_BASE_URL: &str = "https://waterservices.usgs.gov/nwis";

/// Default URL of the annual peak service.
pub const DEFAULT_PEAK_URL: &str = "https://nwis.waterdata.usgs.gov/nwis/peak";

/// Start of the record when the full period is requested.
const PERIOD_OF_RECORD_START: &str = "1800-01-01";

/// Window used when neither dates nor the full period are requested.
const DEFAULT_PERIOD: &str = "P30D";

/// Statistic code for daily means.
const STAT_MEAN: &str = "00003";

/// Errors from the upstream client.
#[derive(Debug, thiserror::Error)]
pub enum UsgsError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("USGS API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The response body could not be understood.
    #[error("Failed to parse USGS response: {0}")]
    Parse(String),

    /// The service has no parameter code for this variety.
    #[error("Unsupported time series type for USGS parameter code: {0}")]
    UnsupportedVariety(Variety),
}

/// Client for the USGS services.
#[derive(Clone)]
pub struct UsgsApi {
    client: reqwest::Client,
    base_url: String,
    peak_url: String,
}

impl Default for UsgsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl UsgsApi {
    /// Client pointed at the public USGS endpoints.
    pub fn new() -> Self {
        Self::with_client(
            reqwest::Client::new(),
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_PEAK_URL.to_string(),
        )
    }

    /// Create a client reusing an existing [`reqwest::Client`], with
    /// explicit endpoint URLs (for mirrors and tests).
    pub fn with_client(client: reqwest::Client, base_url: String, peak_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            peak_url: peak_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one station/variety series.
    pub async fn fetch_time_series(&self, task: &StationTask) -> Result<Vec<Point>, UsgsError> {
        let query = time_series_query(&task.station.id, task.variety, &task.window)?;
        let url = match task.window.data_type {
            DataType::AnnualPeaks => self.peak_url.clone(),
            data_type => format!("{}/{}/", self.base_url, data_type.service_id()),
        };

        tracing::debug!(
            station = %task.station.id,
            variety = %task.variety,
            service = task.window.data_type.service_id(),
            "Fetching USGS series",
        );

        let response = self.client.get(&url).query(&query).send().await?;
        let body = Self::ensure_success(response).await?.text().await?;

        match task.window.data_type {
            DataType::AnnualPeaks => parse_annual_peaks(&body, task.variety),
            _ => parse_time_series_json(&body, task.window.time_zone),
        }
    }

    /// List every station in `state` that reports `variety`.
    pub async fn fetch_stations_by_state(
        &self,
        state: &str,
        variety: Variety,
    ) -> Result<Vec<StationMeta>, UsgsError> {
        let parameter_code = parameter_code(variety)?;
        let response = self
            .client
            .get(format!("{}/site/", self.base_url))
            .query(&[
                ("format", "rdb"),
                ("stateCd", state),
                ("parameterCd", parameter_code),
            ])
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.text().await?;
        Ok(parse_site_listing(&body))
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, UsgsError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UsgsError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn parameter_code(variety: Variety) -> Result<&'static str, UsgsError> {
    variety
        .parameter_code()
        .ok_or(UsgsError::UnsupportedVariety(variety))
}

/// Query-string pairs for one series request.
///
/// Annual peaks always cover the full record. For `dv`/`iv` the window is,
/// in order of preference: the full period (daily only), explicit
/// start/end dates, or the last 30 days.
pub fn time_series_query(
    station_id: &str,
    variety: Variety,
    window: &QueryWindow,
) -> Result<Vec<(&'static str, String)>, UsgsError> {
    let parameter_code = parameter_code(variety)?;

    if window.data_type == DataType::AnnualPeaks {
        return Ok(vec![
            ("site_no", station_id.to_string()),
            ("agency_cd", "USGS".to_string()),
            ("format", "rdb".to_string()),
        ]);
    }

    let mut query = vec![
        ("format", "json".to_string()),
        ("sites", station_id.to_string()),
        ("parameterCd", parameter_code.to_string()),
    ];
    if window.data_type == DataType::Daily {
        query.push(("statCd", STAT_MEAN.to_string()));
    }

    match (window.start_date, window.end_date) {
        _ if window.retrieve_por && window.data_type == DataType::Daily => {
            query.push(("startDT", PERIOD_OF_RECORD_START.to_string()));
        }
        (Some(start), Some(end)) => {
            query.push(("startDT", start.format("%Y-%m-%d").to_string()));
            query.push(("endDT", end.format("%Y-%m-%d").to_string()));
        }
        _ => query.push(("period", DEFAULT_PERIOD.to_string())),
    }

    Ok(query)
}
