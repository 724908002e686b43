use super::*;

fn default_settings() -> Settings {
    Settings::from_raw(RawSettings::default()).expect("defaults must validate")
}

#[test]
fn defaults_resolve() {
    let settings = default_settings();

    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.scheduler.expire_interval, Duration::from_secs(60));
    assert_eq!(
        settings.scheduler.popularity_interval,
        Duration::from_secs(300)
    );
    assert_eq!(settings.scheduler.pass_timeout, Duration::from_secs(120));
    assert_eq!(settings.engine.popularity_threshold, 1000);
    assert_eq!(settings.engine.popular_cache_ttl, Duration::from_secs(3600));
    assert_eq!(
        settings.engine.view_dedup_window,
        Duration::from_secs(30 * 60)
    );
    assert_eq!(settings.engine.retention_window, time::Duration::days(30));
    assert_eq!(settings.outbound.queue_capacity, 1024);
    assert!(settings.database.url.is_none());
    assert!(settings.outbound.hash_service_url.is_none());
}

#[test]
fn default_cron_schedules_have_fire_times() {
    let settings = default_settings();

    assert!(
        settings
            .scheduler
            .purge_schedule
            .upcoming(chrono::Utc)
            .next()
            .is_some()
    );
    assert!(
        settings
            .scheduler
            .rating_schedule
            .upcoming(chrono::Utc)
            .next()
            .is_some()
    );
}

#[test]
fn serve_overrides_take_precedence() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://file/db".to_string());
    raw.engine.popularity_threshold = Some(500);

    let overrides = ServeOverrides {
        database_url: Some("postgres://cli/db".to_string()),
        popularity_threshold: Some(250),
        expire_interval_seconds: Some(5),
        retention_days: Some(7),
        ..ServeOverrides::default()
    };
    raw.apply_serve_overrides(&overrides);

    let settings = Settings::from_raw(raw).expect("overridden settings must validate");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://cli/db"));
    assert_eq!(settings.engine.popularity_threshold, 250);
    assert_eq!(settings.scheduler.expire_interval, Duration::from_secs(5));
    assert_eq!(settings.engine.retention_window, time::Duration::days(7));
}

#[test]
fn invalid_cron_is_rejected_at_load_time() {
    let mut raw = RawSettings::default();
    raw.scheduler.purge_cron = Some("every day at dawn".to_string());

    let error = Settings::from_raw(raw).expect_err("invalid cron must fail");
    assert!(matches!(
        error,
        LoadError::Invalid {
            key: "scheduler.purge_cron",
            ..
        }
    ));
}

#[test]
fn zero_durations_are_rejected() {
    let mut raw = RawSettings::default();
    raw.scheduler.expire_interval_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.engine.view_dedup_window_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.engine.retention_days = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn nonpositive_threshold_is_rejected() {
    let mut raw = RawSettings::default();
    raw.engine.popularity_threshold = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.engine.popularity_threshold = Some(-5);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn collaborator_urls_are_parsed_and_blank_means_disabled() {
    let mut raw = RawSettings::default();
    raw.outbound.hash_service_url = Some("http://hash.internal:8080/api/".to_string());
    raw.outbound.notification_url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid urls must load");
    assert_eq!(
        settings
            .outbound
            .hash_service_url
            .as_ref()
            .map(Url::as_str),
        Some("http://hash.internal:8080/api/")
    );
    assert!(settings.outbound.notification_url.is_none());

    let mut raw = RawSettings::default();
    raw.outbound.search_index_url = Some("not a url".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn empty_database_url_is_normalized_to_none() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("blank url is not an error");
    assert!(settings.database.url.is_none());
}
