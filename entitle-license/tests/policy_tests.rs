use chrono::TimeDelta;
use entitle_license::{
    ExpirationPolicy, LicenseError, GRACE_WARNING, LONG_RANGE_WARNING, SHORT_RANGE_WARNING,
};
use entitle_types::Timestamp;

fn expiry() -> Timestamp {
    Timestamp::from_millis(1_704_067_200_000) + TimeDelta::days(60)
}

fn policy(id: &str) -> ExpirationPolicy {
    ExpirationPolicy::defaults()
        .into_iter()
        .find(|p| p.id() == id)
        .unwrap()
}

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn default_set_has_three_policies() {
    let ids: Vec<String> = ExpirationPolicy::defaults()
        .iter()
        .map(|p| p.id().to_string())
        .collect();
    assert_eq!(ids, vec![LONG_RANGE_WARNING, SHORT_RANGE_WARNING, GRACE_WARNING]);
}

#[test]
fn before_window_returns_window_start() {
    let long = policy(LONG_RANGE_WARNING);
    let now = expiry() - TimeDelta::days(40);
    assert_eq!(long.next_fire_time(expiry(), now), Some(expiry() - TimeDelta::days(25)));
}

#[test]
fn inside_window_returns_next_multiple_after_now() {
    let long = policy(LONG_RANGE_WARNING);
    let opens = expiry() - TimeDelta::days(25);

    assert_eq!(long.next_fire_time(expiry(), opens), Some(opens + TimeDelta::days(1)));
    assert_eq!(
        long.next_fire_time(expiry(), opens + TimeDelta::hours(30)),
        Some(opens + TimeDelta::days(2))
    );
}

#[test]
fn bounded_window_is_exhausted_at_its_end() {
    let long = policy(LONG_RANGE_WARNING);
    let last = expiry() - TimeDelta::days(8);
    assert_eq!(long.next_fire_time(expiry(), last), None);
    assert_eq!(long.next_fire_time(expiry(), expiry()), None);
}

#[test]
fn short_range_fires_every_ten_minutes_until_expiry() {
    let short = policy(SHORT_RANGE_WARNING);
    let now = expiry() - TimeDelta::minutes(25);
    assert_eq!(short.next_fire_time(expiry(), now), Some(expiry() - TimeDelta::minutes(20)));
    assert_eq!(short.next_fire_time(expiry(), expiry() - TimeDelta::minutes(5)), None);
}

#[test]
fn grace_policy_is_unbounded() {
    let grace = policy(GRACE_WARNING);
    assert_eq!(grace.next_fire_time(expiry(), expiry() - TimeDelta::days(1)), Some(expiry()));
    let far = expiry() + TimeDelta::days(400) + TimeDelta::minutes(3);
    assert_eq!(
        grace.next_fire_time(expiry(), far),
        Some(expiry() + TimeDelta::days(400) + TimeDelta::minutes(10))
    );
    assert_eq!(grace.window_end(expiry()), None);
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn zero_frequency_is_rejected() {
    let result = ExpirationPolicy::new("p", TimeDelta::days(1), None, TimeDelta::zero());
    assert!(matches!(result, Err(LicenseError::InvalidPolicy(_))));
}

#[test]
fn empty_window_is_rejected() {
    let result = ExpirationPolicy::new(
        "p",
        TimeDelta::days(1),
        Some(TimeDelta::days(2)),
        TimeDelta::hours(1),
    );
    assert!(result.is_err());
}

#[test]
fn custom_post_expiry_window() {
    let p = ExpirationPolicy::new(
        "post",
        TimeDelta::days(-1),
        Some(TimeDelta::days(-3)),
        TimeDelta::hours(12),
    )
    .unwrap();
    assert_eq!(p.window_start(expiry()), expiry() + TimeDelta::days(1));
    assert_eq!(p.window_end(expiry()), Some(expiry() + TimeDelta::days(3)));
    assert_eq!(p.next_fire_time(expiry(), expiry()), Some(expiry() + TimeDelta::days(1)));
}
