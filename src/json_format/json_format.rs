//!
//! Documentation of the json_format module.
//!
//! Every reply the API sends is assembled here: the serializers join
//! data across collections (driver names onto rides, ride and vehicle
//! details onto requests, participants onto SOS events) and the derived
//! values (match scores, trust tiers, badges, ride stats) are computed
//! on every read, never stored.
//!

use super::*;
use ODM::models::*;
use ODM::odm;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use mongodb::bson::doc;
use mongodb::Database;
use serde_json::{json, Value};
use std::collections::BTreeSet;

//
// Pure derivations
//

///
/// Route similarity between a posted ride and the searched keywords,
/// 0 to 100. Containment either way counts 50 per endpoint, a single
/// shared word counts 25.
///
pub fn route_match_score(
    ride_source: &str,
    ride_destination: &str,
    source: Option<&str>,
    destination: Option<&str>,
) -> i64 {
    let mut score = 0;

    if let Some(keyword) = source {
        let keyword = keyword.to_lowercase();
        let ride_source = ride_source.to_lowercase();
        if ride_source.contains(&keyword) || keyword.contains(&ride_source) {
            score += 50;
        } else if keyword.split_whitespace().any(|word| ride_source.contains(word)) {
            score += 25;
        }
    }

    if let Some(keyword) = destination {
        let keyword = keyword.to_lowercase();
        let ride_destination = ride_destination.to_lowercase();
        if ride_destination.contains(&keyword) || keyword.contains(&ride_destination) {
            score += 50;
        } else if keyword.split_whitespace().any(|word| ride_destination.contains(word)) {
            score += 25;
        }
    }

    score
}

/// Minutes between two HH:MM times, 9999 when either is unparseable
pub fn time_diff_minutes(ride_time: &str, preferred: &str) -> i64 {
    let minutes_of = |value: &str| -> Option<i64> {
        let mut parts = value.split(':');
        let hours = parts.next()?.parse::<i64>().ok()?;
        let minutes = parts.next()?.parse::<i64>().ok()?;
        Some(hours * 60 + minutes)
    };

    match (minutes_of(ride_time), minutes_of(preferred)) {
        (Some(ride_minutes), Some(preferred_minutes)) => (ride_minutes - preferred_minutes).abs(),
        _ => 9999,
    }
}

/// Rough ride duration in minutes. Longer place names stand in for
/// farther destinations, 20 minutes base for a typical campus ride.
pub fn estimate_ride_duration(source: &str, destination: &str) -> i64 {
    let distance_factor = (source.len() + destination.len()) as i64 / 10;
    20 + distance_factor * 5
}

/// ETA from the ride start timestamp plus the estimated duration
pub fn arrival_estimate(started_at: &str, duration_minutes: i64) -> Option<String> {
    let started = DateTime::parse_from_rfc3339(started_at).ok()?;
    let eta = started.with_timezone(&Utc) + Duration::minutes(duration_minutes);
    Some(eta.to_rfc3339_opts(SecondsFormat::Secs, true))
}

///
/// Whether an urgent request is acceptable: the ride has to start
/// within the next 60 minutes (10 minutes past departure tolerated).
/// An unparseable ride schedule lets the request through.
///
pub fn urgent_window_ok(ride_date: &str, ride_time: &str, now: NaiveDateTime) -> bool {
    let ride_datetime = format!("{} {}", ride_date, ride_time);
    let ride_datetime = match NaiveDateTime::parse_from_str(&ride_datetime, "%Y-%m-%d %H:%M") {
        Ok(value) => value,
        Err(_) => return true,
    };

    let diff_minutes = (ride_datetime - now).num_minutes();
    !(diff_minutes > 60 || diff_minutes < -10)
}

/// Average (2 decimals), count and 1..5 star distribution of a rating list
pub fn rating_summary(scores: &[i64]) -> (Option<f64>, i64, [i64; 5]) {
    let mut distribution = [0_i64; 5];
    for score in scores {
        if (1..=5).contains(score) {
            distribution[(score - 1) as usize] += 1;
        }
    }

    let total = scores.len() as i64;
    if total == 0 {
        return (None, 0, distribution);
    }

    let sum: i64 = scores.iter().sum();
    let average = (sum as f64 / total as f64 * 100.0).round() / 100.0;
    (Some(average), total, distribution)
}

fn distribution_value(distribution: &[i64; 5]) -> Value {
    json!({
        "1": distribution[0],
        "2": distribution[1],
        "3": distribution[2],
        "4": distribution[3],
        "5": distribution[4],
    })
}

/// Trust tier from rating average and completed ride count
pub fn trust_level(average_rating: Option<f64>, ride_count: u64) -> Value {
    if ride_count < config::config::NEW_USER_MAX_RIDES {
        json!({"level": "new", "label": "New User", "color": "gray"})
    } else if average_rating.map_or(false, |avg| avg < config::config::NEEDS_REVIEW_MAX_RATING) {
        json!({"level": "low", "label": "Needs Review", "color": "red"})
    } else if average_rating.map_or(false, |avg| avg >= config::config::TRUSTED_MIN_RATING)
        && ride_count >= config::config::TRUSTED_MIN_RIDES
    {
        json!({"level": "trusted", "label": "Trusted", "color": "green"})
    } else {
        json!({"level": "regular", "label": "Regular", "color": "blue"})
    }
}

/// Badges earned from the completed ride count (and the CO2 derived from it)
pub fn badges_for(ride_count: u64) -> Vec<Value> {
    let co2_saved = ride_count as f64
        * config::config::AVG_RIDE_DISTANCE_KM
        * config::config::CO2_PER_KM_SAVED;

    let mut badges = vec![];
    for badge in &config::config::BADGE_DEFINITIONS {
        let earned = match (badge.min_rides, badge.min_co2_kg) {
            (Some(threshold), _) => ride_count >= threshold,
            (None, Some(threshold)) => co2_saved >= threshold,
            _ => false,
        };
        if earned {
            badges.push(json!({
                "id": badge.id,
                "name": badge.name,
                "description": badge.description,
                "icon": badge.icon,
                "earned": true,
            }));
        }
    }
    badges
}

///
/// Consecutive-day ride streak over a set of ride dates.
/// The current streak may end today or yesterday; the longest streak
/// is the longest run of consecutive days anywhere in the history.
///
pub fn ride_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> (i64, i64) {
    let yesterday = today - Duration::days(1);

    let mut check = today;
    if !dates.contains(&today) && dates.contains(&yesterday) {
        check = yesterday;
    }

    let mut current = 0;
    while dates.contains(&check) {
        current += 1;
        check = check - Duration::days(1);
    }

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        run = match previous {
            Some(value) if *date == value + Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*date);
    }

    (current, longest)
}

fn round0(value: f64) -> f64 {
    value.round()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// Collection-backed derivations
//

/// Completed rides of a user: rides driven for drivers, requests
/// travelled for riders
pub async fn completed_ride_count(db: &Database, user_id: &str, role: &str) -> mongodb::error::Result<u64> {
    if role == "driver" {
        odm::count_rides(db, doc! {"driver_id": user_id, "status": "completed"}).await
    } else {
        odm::count_ride_requests(db, doc! {"rider_id": user_id, "status": "completed"}).await
    }
}

/// Aggregated rating statistics of a user
pub async fn rating_stats(db: &Database, user_id: &str) -> mongodb::error::Result<(Option<f64>, i64, [i64; 5])> {
    let ratings = odm::get_ratings(db, doc! {"rated_user_id": user_id}, None).await?;
    let scores: Vec<i64> = ratings.iter().map(|rating| rating.rating).collect();
    Ok(rating_summary(&scores))
}

//
// Serializers
//

/// The full user shape every profile and admin view uses
pub async fn serialize_user(db: &Database, user: &User) -> mongodb::error::Result<Value> {
    let ride_count = completed_ride_count(db, &user.id, &user.role).await?;
    let (average_rating, total_ratings, distribution) = rating_stats(db, &user.id).await?;
    let trust = trust_level(average_rating, ride_count);
    let badges = badges_for(ride_count);

    let mut value = json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role,
        "is_admin": user.is_admin,
        "verification_status": user.verification_status,
        "rejection_reason": user.rejection_reason,
        "verified_at": user.verified_at,
        "ride_count": ride_count,
        "created_at": user.created_at,
        "average_rating": average_rating,
        "total_ratings": total_ratings,
        "rating_distribution": distribution_value(&distribution),
        "trust_level": trust,
        "branch": user.branch,
        "academic_year": user.academic_year,
        "badges": badges,
        "is_active": user.is_active,
        "is_suspended": user.is_suspended,
        "warning_count": user.warning_count,
    });

    if user.role == "driver" {
        value["vehicle_model"] = json!(user.vehicle_model);
        value["vehicle_number"] = json!(user.vehicle_number);
        value["vehicle_color"] = json!(user.vehicle_color);
    }

    Ok(value)
}

/// A ride with the driver, seat math and catalog names joined on
pub async fn serialize_ride(db: &Database, ride: &Ride) -> mongodb::error::Result<Value> {
    let driver = odm::get_user_by_id(db, &ride.driver_id).await?;
    let (driver_average, driver_total, _) = rating_stats(db, &ride.driver_id).await?;
    let driver_completed = odm::count_rides(db, doc! {"driver_id": &ride.driver_id, "status": "completed"}).await?;
    let driver_trust = trust_level(driver_average, driver_completed);

    // Completed rides keep counting their completed requests so past
    // rides still show who travelled.
    let seats_taken = odm::seats_taken(db, &ride.id, ride.status == "completed").await? as i64;
    let seats_available = ride.available_seats - seats_taken;
    let cost_per_rider = if seats_taken > 0 {
        ride.estimated_cost / (seats_taken as f64 + 1.0)
    } else {
        ride.estimated_cost
    };

    let pickup_point_name = ride
        .pickup_point
        .as_deref()
        .and_then(config::config::pickup_point_name);

    let event_tag_name = match &ride.event_tag {
        Some(tag_id) => odm::get_event_tag(db, tag_id).await?.map(|tag| tag.name),
        None => None,
    };

    let driver_branch = driver.as_ref().and_then(|value| value.branch.clone());
    let driver_academic_year = driver.as_ref().and_then(|value| value.academic_year.clone());

    Ok(json!({
        "id": ride.id,
        "driver_id": ride.driver_id,
        "driver_name": driver.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "driver_verification_status": driver.as_ref().map(|value| value.verification_status.clone()).unwrap_or_else(|| "unverified".to_string()),
        "driver_average_rating": driver_average,
        "driver_total_ratings": driver_total,
        "driver_trust_level": driver_trust,
        "driver_completed_rides": driver_completed,
        "source": ride.source,
        "destination": ride.destination,
        "source_lat": ride.source_lat,
        "source_lng": ride.source_lng,
        "destination_lat": ride.destination_lat,
        "destination_lng": ride.destination_lng,
        "date": ride.date,
        "time": ride.time,
        "available_seats": ride.available_seats,
        "seats_available": seats_available,
        "seats_taken": seats_taken,
        "estimated_cost": ride.estimated_cost,
        "cost_per_rider": round2(cost_per_rider),
        "status": ride.status,
        "pickup_point": ride.pickup_point,
        "pickup_point_name": pickup_point_name,
        "is_recurring": ride.is_recurring,
        "recurrence_pattern": ride.recurrence_pattern,
        "parent_ride_id": ride.parent_ride_id,
        "event_tag": ride.event_tag,
        "event_tag_name": event_tag_name,
        "driver_branch": driver_branch,
        "driver_branch_name": driver_branch.as_deref().and_then(config::config::branch_name),
        "driver_academic_year": driver_academic_year,
        "driver_academic_year_name": driver_academic_year.as_deref().and_then(config::config::academic_year_name),
        "created_at": ride.created_at,
    }))
}

/// A ride request with rider, ride, driver, vehicle and ETA joined on
pub async fn serialize_ride_request(db: &Database, request: &RideRequest) -> mongodb::error::Result<Value> {
    let rider = odm::get_user_by_id(db, &request.rider_id).await?;
    let ride = odm::get_ride(db, &request.ride_id).await?;
    let driver = match &ride {
        Some(value) => odm::get_user_by_id(db, &value.driver_id).await?,
        None => None,
    };

    let mut estimated_arrival = None;
    let mut estimated_duration = None;
    if let (Some(started_at), Some(ride)) = (&request.ride_started_at, &ride) {
        let duration = estimate_ride_duration(&ride.source, &ride.destination);
        estimated_duration = Some(duration);
        estimated_arrival = arrival_estimate(started_at, duration);
    }

    let pickup_point = ride.as_ref().and_then(|value| value.pickup_point.clone());

    Ok(json!({
        "id": request.id,
        "ride_id": request.ride_id,
        "rider_id": request.rider_id,
        "rider_name": rider.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "rider_email": rider.as_ref().map(|value| value.email.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "rider_verification_status": rider.as_ref().map(|value| value.verification_status.clone()).unwrap_or_else(|| "unverified".to_string()),
        "ride_source": ride.as_ref().map(|value| value.source.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_destination": ride.as_ref().map(|value| value.destination.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "source_lat": ride.as_ref().and_then(|value| value.source_lat),
        "source_lng": ride.as_ref().and_then(|value| value.source_lng),
        "destination_lat": ride.as_ref().and_then(|value| value.destination_lat),
        "destination_lng": ride.as_ref().and_then(|value| value.destination_lng),
        "ride_date": ride.as_ref().map(|value| value.date.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_time": ride.as_ref().map(|value| value.time.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_estimated_cost": ride.as_ref().map(|value| value.estimated_cost).unwrap_or(0.0),
        "status": request.status,
        "ride_pin": request.ride_pin,
        "ride_started_at": request.ride_started_at,
        "driver_id": ride.as_ref().map(|value| value.driver_id.clone()),
        "driver_name": driver.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "driver_verification_status": driver.as_ref().map(|value| value.verification_status.clone()).unwrap_or_else(|| "unverified".to_string()),
        "driver_vehicle_model": driver.as_ref().and_then(|value| value.vehicle_model.clone()),
        "driver_vehicle_number": driver.as_ref().and_then(|value| value.vehicle_number.clone()),
        "driver_vehicle_color": driver.as_ref().and_then(|value| value.vehicle_color.clone()),
        "estimated_arrival": estimated_arrival,
        "estimated_duration_minutes": estimated_duration,
        "reached_safely_at": request.reached_safely_at,
        "completed_at": request.completed_at,
        "is_urgent": request.is_urgent,
        "pickup_point": pickup_point,
        "pickup_point_name": pickup_point.as_deref().and_then(config::config::pickup_point_name),
        "accepted_at": request.accepted_at,
        "created_at": request.created_at,
    }))
}

/// A chat message with the sender joined on
pub async fn serialize_chat_message(db: &Database, message: &ChatMessage) -> mongodb::error::Result<Value> {
    let sender = odm::get_user_by_id(db, &message.sender_id).await?;

    Ok(json!({
        "id": message.id,
        "ride_request_id": message.ride_request_id,
        "sender_id": message.sender_id,
        "sender_name": sender.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "sender_role": sender.as_ref().map(|value| value.role.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "message": message.message,
        "created_at": message.created_at,
    }))
}

/// An SOS event with the ride and both participants joined on
pub async fn serialize_sos_event(db: &Database, sos: &SosEvent) -> mongodb::error::Result<Value> {
    let triggered_by_user = odm::get_user_by_id(db, &sos.triggered_by).await?;
    let request = odm::get_ride_request(db, &sos.ride_request_id).await?;

    let mut ride = None;
    let mut rider = None;
    let mut driver = None;
    if let Some(request) = &request {
        ride = odm::get_ride(db, &request.ride_id).await?;
        rider = odm::get_user_by_id(db, &request.rider_id).await?;
        if let Some(ride) = &ride {
            driver = odm::get_user_by_id(db, &ride.driver_id).await?;
        }
    }

    Ok(json!({
        "id": sos.id,
        "ride_request_id": sos.ride_request_id,
        "triggered_by": sos.triggered_by,
        "triggered_by_name": triggered_by_user.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "triggered_by_role": sos.triggered_by_role,
        "latitude": sos.latitude,
        "longitude": sos.longitude,
        "message": sos.message,
        "status": sos.status,
        "admin_notes": sos.admin_notes,
        "reviewed_at": sos.reviewed_at,
        "resolved_at": sos.resolved_at,
        "resolved_by": sos.resolved_by,
        "created_at": sos.created_at,
        "ride_source": ride.as_ref().map(|value| value.source.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_destination": ride.as_ref().map(|value| value.destination.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_date": ride.as_ref().map(|value| value.date.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "ride_time": ride.as_ref().map(|value| value.time.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "rider_name": rider.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "rider_email": rider.as_ref().map(|value| value.email.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "driver_name": driver.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
        "driver_email": driver.as_ref().map(|value| value.email.clone()).unwrap_or_else(|| "Unknown".to_string()),
    }))
}

//
// Ride statistics
//

/// Lifetime stats of a user: rides, distance, CO2, money saved, streaks
pub async fn user_stats(db: &Database, user: &User) -> mongodb::error::Result<Value> {
    let rides_offered = odm::count_rides(db, doc! {"driver_id": &user.id, "status": "completed"}).await?;
    let rides_taken = odm::count_ride_requests(db, doc! {"rider_id": &user.id, "status": "completed"}).await?;
    let total_rides = rides_offered + rides_taken;

    let total_distance_km = total_rides as f64 * config::config::AVG_RIDE_DISTANCE_KM;
    let total_co2_saved = total_distance_km * config::config::CO2_PER_KM_SAVED;
    let solo_cost = config::config::AVG_RIDE_DISTANCE_KM * config::config::COST_PER_KM_SOLO;

    let mut money_saved = 0.0;

    if user.role == "rider" || rides_taken > 0 {
        let completed_requests = odm::get_ride_requests(
            db,
            doc! {"rider_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
        )
        .await?;
        for request in &completed_requests {
            if let Some(ride) = odm::get_ride(db, &request.ride_id).await? {
                money_saved += (solo_cost - ride.estimated_cost).max(0.0);
            }
        }
    }

    if user.role == "driver" || rides_offered > 0 {
        let completed_rides = odm::get_rides(
            db,
            doc! {"driver_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
            None,
        )
        .await?;
        for ride in &completed_rides {
            let rider_count =
                odm::count_ride_requests(db, doc! {"ride_id": &ride.id, "status": "completed"}).await?;
            if rider_count > 0 {
                // The driver saves the share the riders chipped in.
                money_saved += solo_cost * rider_count as f64 / (rider_count as f64 + 1.0);
            }
        }
    }

    let (current_streak, longest_streak) = streak_for_user(db, user).await?;

    Ok(json!({
        "rides_offered": rides_offered,
        "rides_taken": rides_taken,
        "total_rides": total_rides,
        "total_distance_km": round1(total_distance_km),
        "total_co2_saved_kg": round2(total_co2_saved),
        "money_saved": round0(money_saved),
        "streak": {
            "current": current_streak,
            "longest": longest_streak,
        },
    }))
}

/// Consecutive-day streak over every completed ride of a user
async fn streak_for_user(db: &Database, user: &User) -> mongodb::error::Result<(i64, i64)> {
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();

    if user.role == "driver" {
        let rides = odm::get_rides(
            db,
            doc! {"driver_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
            None,
        )
        .await?;
        for ride in &rides {
            if let Ok(date) = NaiveDate::parse_from_str(&ride.date, "%Y-%m-%d") {
                dates.insert(date);
            }
        }
    }

    let requests = odm::get_ride_requests(
        db,
        doc! {"rider_id": &user.id, "status": "completed"},
        doc! {"created_at": -1},
    )
    .await?;
    for request in &requests {
        if let Some(ride) = odm::get_ride(db, &request.ride_id).await? {
            if let Ok(date) = NaiveDate::parse_from_str(&ride.date, "%Y-%m-%d") {
                dates.insert(date);
            }
        }
    }

    Ok(ride_streak(&dates, Utc::now().date_naive()))
}

/// Stats over the last 7 days
pub async fn weekly_summary(db: &Database, user: &User) -> mongodb::error::Result<Value> {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let week_ago = (Utc::now() - Duration::days(7)).format("%Y-%m-%d").to_string();
    let solo_cost = config::config::AVG_RIDE_DISTANCE_KM * config::config::COST_PER_KM_SOLO;
    let co2_per_ride = config::config::AVG_RIDE_DISTANCE_KM * config::config::CO2_PER_KM_SAVED;

    let mut rides_completed = 0;
    let mut co2_saved = 0.0;
    let mut money_saved = 0.0;

    if user.role == "driver" {
        let rides = odm::get_rides(
            db,
            doc! {
                "driver_id": &user.id,
                "status": "completed",
                "date": {"$gte": &week_ago, "$lte": &today},
            },
            doc! {"created_at": -1},
            None,
        )
        .await?;
        rides_completed += rides.len() as i64;
        for ride in &rides {
            let rider_count =
                odm::count_ride_requests(db, doc! {"ride_id": &ride.id, "status": "completed"}).await?;
            if rider_count > 0 {
                money_saved += solo_cost * rider_count as f64 / (rider_count as f64 + 1.0);
                co2_saved += co2_per_ride;
            }
        }
    }

    let requests = odm::get_ride_requests(
        db,
        doc! {"rider_id": &user.id, "status": "completed"},
        doc! {"created_at": -1},
    )
    .await?;
    for request in &requests {
        if let Some(ride) = odm::get_ride(db, &request.ride_id).await? {
            if ride.date >= week_ago && ride.date <= today {
                rides_completed += 1;
                money_saved += (solo_cost - ride.estimated_cost).max(0.0);
                co2_saved += co2_per_ride;
            }
        }
    }

    Ok(json!({
        "period": format!("{} to {}", week_ago, today),
        "rides_completed": rides_completed,
        "co2_saved_kg": round2(co2_saved),
        "money_saved": round0(money_saved),
    }))
}
