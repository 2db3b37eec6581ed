//! City weather lookup for wxproxy
//!
//! Fetches current conditions from a WeatherAPI-compatible provider,
//! normalizes them, and keeps a bounded in-memory TTL cache.

pub mod cache;
pub mod clock;
pub mod error;
pub mod lookup;
pub mod provider;
pub mod types;

pub use cache::{normalize_key, WeatherCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::WeatherError;
pub use lookup::WeatherLookupCache;
pub use provider::WeatherProvider;
pub use types::*;
