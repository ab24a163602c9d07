//!
//! Documentation of the Database Utilities module.
//! Contains the document converters and the small generators
//! (timestamps, PINs, session tokens, recurrence dates).
//!

use super::*;
use models::*;
use chrono::{Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Current UTC time as a fixed-width RFC 3339 string.
/// Fixed width keeps string comparisons in queries meaningful.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a 4-digit PIN for ride start verification
pub fn generate_ride_pin() -> String {
    rand::thread_rng().gen_range(1000..10000).to_string()
}

/// Generate an opaque bearer token for the sessions collection
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

///
/// Expand a recurring ride into the dates of its future instances.
///
/// # Arguments
///
/// * `base_date` - The parent ride date, YYYY-MM-DD
/// * `pattern_days` - Allowed weekdays, Monday = 0
/// * `days_ahead` - How many days forward to expand (the base day excluded)
///
/// An unparseable base date yields no instances.
///
pub fn recurrence_dates(base_date: &str, pattern_days: &[u32], days_ahead: i64) -> Vec<String> {
    let base = match NaiveDate::parse_from_str(base_date, "%Y-%m-%d") {
        Ok(value) => value,
        Err(_) => return vec![],
    };

    let mut dates = vec![];
    for offset in 1..=days_ahead {
        let day = base + Duration::days(offset);
        if pattern_days.contains(&day.weekday().num_days_from_monday()) {
            dates.push(day.format("%Y-%m-%d").to_string());
        }
    }
    dates
}

/// Converts a UserDocument to User
pub fn doc_to_user(document: &UserDocument) -> User {
    User {
        id: document._id.unwrap_or_default().to_hex(),
        email: document.email.clone(),
        password_hash: document.password_hash.clone(),
        name: document.name.clone(),
        role: document.role.clone(),
        is_admin: document.is_admin,
        verification_status: document.verification_status.clone(),
        student_id_image: document.student_id_image.clone(),
        rejection_reason: document.rejection_reason.clone(),
        submitted_at: document.submitted_at.clone(),
        verified_at: document.verified_at.clone(),
        vehicle_model: document.vehicle_model.clone(),
        vehicle_number: document.vehicle_number.clone(),
        vehicle_color: document.vehicle_color.clone(),
        branch: document.branch.clone(),
        academic_year: document.academic_year.clone(),
        is_active: document.is_active,
        is_suspended: document.is_suspended,
        warning_count: document.warning_count,
        last_warning_at: document.last_warning_at.clone(),
        status_reason: document.status_reason.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a SessionDocument to Session
pub fn doc_to_session(document: &SessionDocument) -> Session {
    Session {
        token: document.token.clone(),
        user_id: document.user_id.clone(),
        expires_at: document.expires_at.clone(),
    }
}

/// Converts a RideDocument to Ride
pub fn doc_to_ride(document: &RideDocument) -> Ride {
    Ride {
        id: document._id.unwrap_or_default().to_hex(),
        driver_id: document.driver_id.clone(),
        source: document.source.clone(),
        destination: document.destination.clone(),
        source_lat: document.source_lat,
        source_lng: document.source_lng,
        destination_lat: document.destination_lat,
        destination_lng: document.destination_lng,
        date: document.date.clone(),
        time: document.time.clone(),
        available_seats: document.available_seats,
        estimated_cost: document.estimated_cost,
        status: document.status.clone(),
        pickup_point: document.pickup_point.clone(),
        is_recurring: document.is_recurring,
        recurrence_pattern: document.recurrence_pattern.clone(),
        parent_ride_id: document.parent_ride_id.clone(),
        event_tag: document.event_tag.clone(),
        cancelled_reason: document.cancelled_reason.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a RideRequestDocument to RideRequest
pub fn doc_to_ride_request(document: &RideRequestDocument) -> RideRequest {
    RideRequest {
        id: document._id.unwrap_or_default().to_hex(),
        ride_id: document.ride_id.clone(),
        rider_id: document.rider_id.clone(),
        status: document.status.clone(),
        ride_pin: document.ride_pin.clone(),
        is_urgent: document.is_urgent,
        accepted_at: document.accepted_at.clone(),
        ride_started_at: document.ride_started_at.clone(),
        reached_safely_at: document.reached_safely_at.clone(),
        completed_at: document.completed_at.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a ChatMessageDocument to ChatMessage
pub fn doc_to_chat_message(document: &ChatMessageDocument) -> ChatMessage {
    ChatMessage {
        id: document._id.unwrap_or_default().to_hex(),
        ride_request_id: document.ride_request_id.clone(),
        ride_id: document.ride_id.clone(),
        sender_id: document.sender_id.clone(),
        message: document.message.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a SosEventDocument to SosEvent
pub fn doc_to_sos_event(document: &SosEventDocument) -> SosEvent {
    SosEvent {
        id: document._id.unwrap_or_default().to_hex(),
        ride_request_id: document.ride_request_id.clone(),
        ride_id: document.ride_id.clone(),
        triggered_by: document.triggered_by.clone(),
        triggered_by_role: document.triggered_by_role.clone(),
        latitude: document.latitude,
        longitude: document.longitude,
        message: document.message.clone(),
        status: document.status.clone(),
        admin_notes: document.admin_notes.clone(),
        reviewed_at: document.reviewed_at.clone(),
        reviewed_by: document.reviewed_by.clone(),
        resolved_at: document.resolved_at.clone(),
        resolved_by: document.resolved_by.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a RatingDocument to Rating
pub fn doc_to_rating(document: &RatingDocument) -> Rating {
    Rating {
        id: document._id.unwrap_or_default().to_hex(),
        ride_request_id: document.ride_request_id.clone(),
        ride_id: document.ride_id.clone(),
        rater_id: document.rater_id.clone(),
        rater_role: document.rater_role.clone(),
        rated_user_id: document.rated_user_id.clone(),
        rating: document.rating,
        feedback: document.feedback.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts an EventTagDocument to EventTag
pub fn doc_to_event_tag(document: &EventTagDocument) -> EventTag {
    EventTag {
        id: document._id.unwrap_or_default().to_hex(),
        name: document.name.clone(),
        description: document.description.clone(),
        is_active: document.is_active,
        created_by: document.created_by.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts a ReportDocument to Report
pub fn doc_to_report(document: &ReportDocument) -> Report {
    Report {
        id: document._id.unwrap_or_default().to_hex(),
        reporter_id: document.reporter_id.clone(),
        reporter_name: document.reporter_name.clone(),
        reported_user_id: document.reported_user_id.clone(),
        reported_user_name: document.reported_user_name.clone(),
        ride_id: document.ride_id.clone(),
        category: document.category.clone(),
        description: document.description.clone(),
        status: document.status.clone(),
        admin_notes: document.admin_notes.clone(),
        action_taken: document.action_taken.clone(),
        handled_by: document.handled_by.clone(),
        handled_at: document.handled_at.clone(),
        created_at: document.created_at.clone(),
    }
}

/// Converts an AuditLogDocument to AuditLogEntry
pub fn doc_to_audit_entry(document: &AuditLogDocument) -> AuditLogEntry {
    AuditLogEntry {
        id: document._id.unwrap_or_default().to_hex(),
        admin_id: document.admin_id.clone(),
        admin_name: document.admin_name.clone(),
        action_type: document.action_type.clone(),
        target_type: document.target_type.clone(),
        target_id: document.target_id.clone(),
        details: document.details.clone(),
        timestamp: document.timestamp.clone(),
    }
}
