//! Integration tests for WeatherLookupCache using wiremock.
//!
//! The mock server's `expect(n)` assertions verify how many upstream calls
//! each scenario makes; they are checked when the server is dropped.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxproxy_core::WeatherConfig;
use wxproxy_weather::{
    DayPeriod, ManualClock, WeatherCache, WeatherError, WeatherLookupCache, WeatherProvider,
};

/// London payload from the provider's `current.json`
fn london() -> serde_json::Value {
    serde_json::json!({
        "location": {
            "name": "London",
            "country": "GB",
            "lat": 51.5,
            "lon": -0.13,
            "localtime": "2024-01-01 12:00"
        },
        "current": {
            "temp_c": 15.4,
            "feelslike_c": 14.0,
            "condition": {"text": "Cloudy", "icon": "//x/03d.png"},
            "pressure_mb": 1012,
            "humidity": 81,
            "wind_kph": 10,
            "wind_degree": 200,
            "wind_dir": "SW",
            "vis_km": 10,
            "air_quality": {},
            "is_day": 1
        }
    })
}

fn lookup_service(
    server: &MockServer,
    clock: &ManualClock,
    ttl_secs: u64,
    max_entries: usize,
) -> WeatherLookupCache {
    let provider =
        WeatherProvider::new(&server.uri(), "test_key", Duration::from_secs(5)).unwrap();
    let cache = WeatherCache::with_clock(
        Duration::from_secs(ttl_secs),
        max_entries,
        Arc::new(clock.clone()),
    );
    WeatherLookupCache::new(provider, cache)
}

#[tokio::test]
async fn test_london_is_normalized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("q", "london"))
        .and(query_param("aqi", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let svc = lookup_service(&mock_server, &ManualClock::new(), 600, 100);
    let result = svc.lookup("london").await.unwrap();

    assert!(!result.from_cache);
    let w = result.weather;
    assert_eq!(w.city, "London");
    assert_eq!(w.temperature, 15);
    assert_eq!(w.feels_like, 14);
    assert_eq!(w.temp_min, 13);
    assert_eq!(w.temp_max, 17);
    assert_eq!(w.is_day, DayPeriod::Day);
    assert_eq!(w.is_day.as_str(), "day");
}

#[tokio::test]
async fn test_second_lookup_is_served_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let svc = lookup_service(&mock_server, &ManualClock::new(), 600, 100);

    let first = svc.lookup("London").await.unwrap();
    let second = svc.lookup("LONDON").await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.weather, second.weather);
}

#[tokio::test]
async fn test_lookup_after_ttl_goes_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let clock = ManualClock::new();
    let svc = lookup_service(&mock_server, &clock, 600, 100);

    assert!(!svc.lookup("london").await.unwrap().from_cache);
    assert!(svc.lookup("london").await.unwrap().from_cache);

    clock.advance(Duration::from_secs(601));
    assert!(!svc.lookup("london").await.unwrap().from_cache);
}

#[tokio::test]
async fn test_capacity_evicts_oldest_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .mount(&mock_server)
        .await;

    let svc = lookup_service(&mock_server, &ManualClock::new(), 600, 3);
    for city in ["a", "b", "c", "d", "e"] {
        svc.lookup(city).await.unwrap();
        assert!(svc.stats().entries <= 3);
    }

    let stats = svc.stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.keys, vec!["c", "d", "e"]);

    // "a" was evicted, so it must be fetched again
    assert!(!svc.lookup("a").await.unwrap().from_cache);
    assert!(svc.lookup("e").await.unwrap().from_cache);
}

#[tokio::test]
async fn test_blank_city_is_invalid_input() {
    let mock_server = MockServer::start().await;
    let svc = lookup_service(&mock_server, &ManualClock::new(), 600, 100);

    assert!(matches!(
        svc.lookup("").await,
        Err(WeatherError::InvalidInput(_))
    ));
    assert!(matches!(
        svc.lookup("   ").await,
        Err(WeatherError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_upstream_error_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "No matching location found."}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let svc = lookup_service(&mock_server, &ManualClock::new(), 600, 100);

    let err = svc.lookup("Atlantis").await.unwrap_err();
    match &err {
        WeatherError::Upstream { status, message } => {
            assert_eq!(*status, Some(400));
            assert_eq!(message, "No matching location found.");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.status_code(), 502);
    assert_eq!(svc.stats().entries, 0);

    // Errors are never cached, so the retry goes upstream again
    assert!(svc.lookup("atlantis").await.is_err());
}

#[tokio::test]
async fn test_concurrent_misses_share_one_upstream_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(london())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let svc = Arc::new(lookup_service(&mock_server, &ManualClock::new(), 600, 100));

    let handles: Vec<_> = ["London", "london", " LONDON "]
        .into_iter()
        .map(|city| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.lookup(city).await })
        })
        .collect();

    let mut fresh = 0;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        if !result.from_cache {
            fresh += 1;
        }
        assert_eq!(result.weather.temperature, 15);
    }
    assert_eq!(fresh, 1);
}

#[tokio::test]
async fn test_from_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("key", "configured_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = WeatherConfig {
        base_url: mock_server.uri(),
        api_key: "configured_key".to_string(),
        ttl_secs: 60,
        max_entries: 10,
        timeout_secs: 5,
    };

    let svc = WeatherLookupCache::from_config(&config).unwrap();
    svc.lookup("London").await.unwrap();

    let stats = svc.stats();
    assert_eq!(stats.ttl_secs, 60);
    assert_eq!(stats.max_entries, 10);
}
