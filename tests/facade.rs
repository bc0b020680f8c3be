//! End-to-end use of the `fixturedb` facade: one session records against a
//! fixture directory, a second session replays it offline.

use fixturedb::{
    CapabilityRegistry, FixtureBlob, FixtureStore, Matcher, MemoryFixtureIo, ReplayConfig,
    Resolver, Value,
};
use serde_json::json;
use std::sync::Arc;

/// Stand-in for a client of some remote service
struct WeatherClient<'a> {
    store: &'a mut FixtureStore,
}

impl WeatherClient<'_> {
    fn forecast(&mut self, city: &str, live: Option<&str>) -> Option<Value> {
        let parm = Value::from(json!({"city": city}));
        match live {
            Some(answer) => {
                self.store.record("weather.forecast", parm, answer).ok()?;
                Some(Value::from(answer))
            }
            None => self.store.playback("weather.forecast", &parm),
        }
    }
}

#[test]
fn test_record_session_then_replay_session() {
    let temp = tempfile::tempdir().unwrap();
    let config = ReplayConfig::default().with_directory(temp.path());

    let mut recording = FixtureStore::open(config.clone()).unwrap();
    let mut client = WeatherClient {
        store: &mut recording,
    };
    client.forecast("Oslo", Some("snow")).unwrap();
    client.forecast("Lima", Some("fog")).unwrap();
    client.forecast("Oslo", Some("sleet")).unwrap();

    let mut replay = FixtureStore::open(config).unwrap();
    let report = replay.load_directory();
    assert_eq!(report.loaded, 3);
    assert!(report.is_clean());

    let mut client = WeatherClient { store: &mut replay };
    assert_eq!(client.forecast("Oslo", None), Some(Value::from("snow")));
    assert_eq!(client.forecast("Oslo", None), Some(Value::from("sleet")));
    assert_eq!(client.forecast("Lima", None), Some(Value::from("fog")));
    assert_eq!(client.forecast("Quito", None), None);
}

#[test]
fn test_programmatic_fixture_shared_through_memory_io() {
    let io = Arc::new(MemoryFixtureIo::new());
    let registry = CapabilityRegistry::new()
        .with_matcher(Matcher::new("any-city", |ctx| ctx.call.parm.get("city").is_some()))
        .with_resolver(Resolver::new("sunny", |_| Value::single("sky", "clear")));

    let config = ReplayConfig::default().with_external_value_storage(false);
    let mut store = FixtureStore::with_io(config, Arc::clone(&io))
        .unwrap()
        .with_registry(registry);

    let any_city = store.registry().matcher("any-city").cloned().unwrap();
    store.record("weather.forecast", any_city, "rain").unwrap();
    assert_eq!(io.len(), 1);

    let parm = Value::from(json!({"city": "Rome"}));
    assert_eq!(store.playback("weather.forecast", &parm), Some(Value::from("rain")));

    let report = store.load([FixtureBlob::anonymous(json!({
        "key": "weather.today",
        "parm": {"$matcher": "any-city"},
        "value": {"func": "sunny"}
    }))]);
    assert!(report.is_clean());
    assert_eq!(
        store.playback("weather.today", &parm),
        Some(Value::single("sky", "clear"))
    );
}
