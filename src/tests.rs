use super::*;

use chrono::NaiveDate;
use rocket::http::Status;
use rocket::local::asynchronous::Client;
use rocket::{Build, Rocket};
use std::collections::BTreeSet;

use config::config::{academic_year_name, branch_name, pickup_point_name, recurrence_days};
use json_format::json_format::{
    arrival_estimate, badges_for, estimate_ride_duration, rating_summary, ride_streak,
    route_match_score, time_diff_minutes, trust_level, urgent_window_ok,
};
use routes::email_domain_allowed;
use ODM::odm_utils::{generate_ride_pin, generate_session_token, recurrence_dates};

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn route_score_full_containment_scores_both_endpoints() {
    let score = route_match_score("Main Gate", "City Mall", Some("gate"), Some("city mall"));
    assert_eq!(score, 100);
}

#[test]
fn route_score_word_overlap_scores_quarter() {
    let score = route_match_score("North Campus Gate", "Library", Some("gate parking"), None);
    assert_eq!(score, 25);
}

#[test]
fn route_score_without_keywords_is_zero() {
    assert_eq!(route_match_score("Main Gate", "City Mall", None, None), 0);
    assert_eq!(route_match_score("Stadium", "Airport", Some("downtown"), Some("harbour")), 0);
}

#[test]
fn time_diff_counts_minutes_and_flags_garbage() {
    assert_eq!(time_diff_minutes("14:30", "15:00"), 30);
    assert_eq!(time_diff_minutes("09:15", "09:15"), 0);
    assert_eq!(time_diff_minutes("23:00", "01:00"), 1320);
    assert_eq!(time_diff_minutes("soon", "15:00"), 9999);
}

#[test]
fn urgent_window_accepts_only_imminent_rides() {
    let now = date("2026-08-04").and_hms_opt(10, 0, 0).unwrap();

    assert!(urgent_window_ok("2026-08-04", "10:30", now));
    assert!(urgent_window_ok("2026-08-04", "11:00", now));
    assert!(urgent_window_ok("2026-08-04", "09:55", now));
    assert!(!urgent_window_ok("2026-08-04", "11:30", now));
    assert!(!urgent_window_ok("2026-08-04", "09:45", now));
    // An unreadable schedule lets the request through.
    assert!(urgent_window_ok("someday", "later", now));
}

#[test]
fn trust_tiers_follow_the_thresholds() {
    assert_eq!(trust_level(None, 0)["level"], "new");
    assert_eq!(trust_level(Some(5.0), 3)["level"], "new");
    assert_eq!(trust_level(Some(2.0), 10)["level"], "low");
    assert_eq!(trust_level(Some(2.5), 10)["level"], "regular");
    assert_eq!(trust_level(Some(4.0), 5)["level"], "trusted");
    assert_eq!(trust_level(Some(4.9), 4)["level"], "regular");
    assert_eq!(trust_level(Some(3.5), 20)["level"], "regular");
}

#[test]
fn rating_summary_averages_and_distributes() {
    let (average, total, distribution) = rating_summary(&[5, 4, 4]);
    assert_eq!(average, Some(4.33));
    assert_eq!(total, 3);
    assert_eq!(distribution, [0, 0, 0, 2, 1]);

    let (average, total, distribution) = rating_summary(&[]);
    assert_eq!(average, None);
    assert_eq!(total, 0);
    assert_eq!(distribution, [0, 0, 0, 0, 0]);
}

#[test]
fn badges_unlock_with_ride_counts_and_co2() {
    assert!(badges_for(0).is_empty());

    let ids: Vec<String> = badges_for(5)
        .iter()
        .map(|badge| badge["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&"first_ride".to_string()));
    assert!(ids.contains(&"rides_5".to_string()));
    assert!(!ids.contains(&"rides_10".to_string()));

    // 30 rides * 8 km * 0.21 kg = 50.4 kg, past the first CO2 badge only.
    let ids: Vec<String> = badges_for(30)
        .iter()
        .map(|badge| badge["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&"eco_warrior".to_string()));
    assert!(!ids.contains(&"eco_champion".to_string()));

    let ids: Vec<String> = badges_for(60)
        .iter()
        .map(|badge| badge["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&"eco_champion".to_string()));
}

#[test]
fn recurrence_expands_matching_weekdays_only() {
    // 2026-08-07 is a Friday; a weekday pattern over the following
    // week yields Monday through Friday.
    let days = recurrence_days("weekdays").unwrap();
    let dates = recurrence_dates("2026-08-07", days, 7);
    assert_eq!(
        dates,
        vec!["2026-08-10", "2026-08-11", "2026-08-12", "2026-08-13", "2026-08-14"]
    );

    let days = recurrence_days("weekends").unwrap();
    let dates = recurrence_dates("2026-08-07", days, 7);
    assert_eq!(dates, vec!["2026-08-08", "2026-08-09"]);

    assert!(recurrence_dates("not-a-date", days, 7).is_empty());
}

#[test]
fn streaks_count_consecutive_days() {
    let today = date("2026-08-04");

    let mut dates = BTreeSet::new();
    dates.insert(date("2026-08-02"));
    dates.insert(date("2026-08-03"));
    dates.insert(date("2026-08-04"));
    assert_eq!(ride_streak(&dates, today), (3, 3));

    // No ride today: the streak may still end yesterday.
    let mut dates = BTreeSet::new();
    dates.insert(date("2026-08-03"));
    dates.insert(date("2026-08-01"));
    assert_eq!(ride_streak(&dates, today), (1, 1));

    // A gap resets the current streak but not the longest run.
    let mut dates = BTreeSet::new();
    dates.insert(date("2026-07-20"));
    dates.insert(date("2026-07-21"));
    dates.insert(date("2026-07-22"));
    dates.insert(date("2026-08-04"));
    assert_eq!(ride_streak(&dates, today), (1, 3));

    assert_eq!(ride_streak(&BTreeSet::new(), today), (0, 0));
}

#[test]
fn ride_pins_are_four_digits() {
    for _ in 0..50 {
        let pin = generate_ride_pin();
        assert_eq!(pin.len(), 4);
        let value: u32 = pin.parse().unwrap();
        assert!((1000..=9999).contains(&value));
    }
}

#[test]
fn session_tokens_are_long_and_alphanumeric() {
    let token = generate_session_token();
    assert_eq!(token.len(), 48);
    assert!(token.chars().all(|value| value.is_ascii_alphanumeric()));
    assert_ne!(token, generate_session_token());
}

#[test]
fn email_domain_gate_is_case_insensitive() {
    assert!(email_domain_allowed("Student@Campus.EDU", "@campus.edu"));
    assert!(email_domain_allowed("a.b@campus.edu", "@campus.edu"));
    assert!(!email_domain_allowed("someone@gmail.com", "@campus.edu"));
    assert!(!email_domain_allowed("campus.edu@gmail.com", "@campus.edu"));
}

#[test]
fn duration_estimate_grows_with_route_length() {
    assert_eq!(estimate_ride_duration("abcde", "fghij"), 25);
    assert_eq!(estimate_ride_duration("a", "b"), 20);
    assert!(estimate_ride_duration("a very long place name", "another long place name") > 25);
}

#[test]
fn arrival_estimate_adds_the_duration() {
    let eta = arrival_estimate("2026-08-04T10:00:00Z", 30);
    assert_eq!(eta.as_deref(), Some("2026-08-04T10:30:00Z"));
    assert!(arrival_estimate("whenever", 30).is_none());
}

#[test]
fn catalog_lookups_resolve_known_ids() {
    assert_eq!(pickup_point_name("main_gate"), Some("Main Gate"));
    assert_eq!(pickup_point_name("moon_base"), None);
    assert_eq!(branch_name("cse"), Some("Computer Science"));
    assert_eq!(academic_year_name("3"), Some("3rd Year"));
    assert_eq!(recurrence_days("tue_thu"), Some(&[1_u32, 3_u32][..]));
}

/// A full rocket with managed state but no live database; the driver
/// connects lazily, so routes that never reach a collection still run.
async fn test_rocket() -> Rocket<Build> {
    let config = config::config::ConfyConfig::default();
    let options = mongodb::options::ClientOptions::parse(&config.database_ip).await.unwrap();
    let client = mongodb::Client::with_options(options).unwrap();
    let db = client.database(&config.database);

    rocket::build()
        .mount("/", routes::routes())
        .register("/", routes::catchers())
        .manage(MongoState { db })
        .manage(Config { config })
}

#[rocket::async_test]
async fn index_reports_service_metadata() {
    let client = Client::tracked(test_rocket().await).await.unwrap();

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "Unipool Ride Sharing API");
}

#[rocket::async_test]
async fn catalog_routes_serve_the_fixed_lists() {
    let client = Client::tracked(test_rocket().await).await.unwrap();

    let response = client.get("/api/pickup-points").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["pickup_points"].as_array().unwrap().len(), 12);

    let response = client.get("/api/recurrence-patterns").dispatch().await;
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["patterns"].as_array().unwrap().len(), 5);

    let response = client.get("/api/branches").dispatch().await;
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["branches"].as_array().unwrap().len(), 10);
}

#[rocket::async_test]
async fn missing_token_gets_the_error_envelope() {
    let client = Client::tracked(test_rocket().await).await.unwrap();

    let response = client.get("/api/auth/me").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Authentication required");
}

#[rocket::async_test]
async fn unknown_routes_get_the_error_envelope() {
    let client = Client::tracked(test_rocket().await).await.unwrap();

    let response = client.get("/api/no-such-route").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Resource not found");
}
