use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spread applied around the current temperature to derive min/max.
pub const TEMP_SPREAD_C: i32 = 2;

/// Day/night flag as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Day,
    Night,
}

impl DayPeriod {
    /// Provider sends `1` for day; anything else is night.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            Self::Day
        } else {
            Self::Night
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_kph: f64,
    pub degree: u16,
    pub direction: String,
}

/// Air quality readings; every field is optional since the provider
/// omits the block entirely for some locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub us_epa_index: Option<u8>,
    pub gb_defra_index: Option<u8>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

impl AirQuality {
    /// Headline index (US EPA scale, 1-6)
    pub fn index(&self) -> Option<u8> {
        self.us_epa_index
    }
}

/// Canonical weather shape handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeather {
    pub city: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub condition: Condition,
    pub temperature: i32,
    pub feels_like: i32,
    pub temp_min: i32,
    pub temp_max: i32,
    pub pressure: f64,
    pub humidity: u8,
    pub wind: Wind,
    pub visibility: f64,
    pub air_quality: AirQuality,
    pub is_day: DayPeriod,
    /// Provider local time of the observation, verbatim (`YYYY-MM-DD HH:MM`)
    pub last_updated: String,
    pub fetched_at: DateTime<Utc>,
}

impl NormalizedWeather {
    /// Build the canonical shape from a provider payload.
    pub fn from_api(raw: ApiCurrentResponse, fetched_at: DateTime<Utc>) -> Self {
        let ApiCurrentResponse { location, current } = raw;
        let temperature = round_half_up(current.temp_c);

        Self {
            city: location.name,
            country: location.country,
            coordinates: Coordinates {
                lat: location.lat,
                lon: location.lon,
            },
            condition: Condition {
                text: current.condition.text,
                icon: absolute_icon_url(&current.condition.icon),
            },
            temperature,
            feels_like: round_half_up(current.feelslike_c),
            temp_min: temperature - TEMP_SPREAD_C,
            temp_max: temperature + TEMP_SPREAD_C,
            pressure: current.pressure_mb,
            humidity: current.humidity,
            wind: Wind {
                speed_kph: current.wind_kph,
                degree: current.wind_degree,
                direction: current.wind_dir,
            },
            visibility: current.vis_km,
            air_quality: current.air_quality.map(AirQuality::from).unwrap_or_default(),
            is_day: DayPeriod::from_flag(current.is_day),
            last_updated: location.localtime,
            fetched_at,
        }
    }
}

/// Nearest integer with halves rounded toward positive infinity (-2.5 -> -2).
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Provider icons are protocol-relative (`//cdn...`).
fn absolute_icon_url(icon: &str) -> String {
    if icon.starts_with("//") {
        format!("https:{}", icon)
    } else {
        icon.to_string()
    }
}

/// Result of a lookup, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lookup {
    #[serde(flatten)]
    pub weather: NormalizedWeather,
    pub from_cache: bool,
}

impl Lookup {
    pub fn cached(weather: NormalizedWeather) -> Self {
        Self {
            weather,
            from_cache: true,
        }
    }

    pub fn fresh(weather: NormalizedWeather) -> Self {
        Self {
            weather,
            from_cache: false,
        }
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live (unexpired) entries
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    /// Keys from oldest to newest insertion
    pub keys: Vec<String>,
}

// Provider wire format (`current.json`).

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCurrentResponse {
    pub location: ApiLocation,
    pub current: ApiCurrent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLocation {
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub localtime: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCurrent {
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub condition: ApiCondition,
    pub pressure_mb: f64,
    pub humidity: u8,
    pub wind_kph: f64,
    pub wind_degree: u16,
    pub wind_dir: String,
    pub vis_km: f64,
    #[serde(default)]
    pub air_quality: Option<ApiAirQuality>,
    pub is_day: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    pub text: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAirQuality {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    #[serde(rename = "us-epa-index")]
    pub us_epa_index: Option<u8>,
    #[serde(rename = "gb-defra-index")]
    pub gb_defra_index: Option<u8>,
}

impl From<ApiAirQuality> for AirQuality {
    fn from(aq: ApiAirQuality) -> Self {
        Self {
            us_epa_index: aq.us_epa_index,
            gb_defra_index: aq.gb_defra_index,
            co: aq.co,
            no2: aq.no2,
            o3: aq.o3,
            so2: aq.so2,
            pm2_5: aq.pm2_5,
            pm10: aq.pm10,
        }
    }
}

/// Error envelope: `{"error": {"code": 1006, "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}
