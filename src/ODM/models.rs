//!
//! Documentation of the Models module.
//! Contains all the models needed for a Unipool connection.
//!



use serde::{Serialize, Deserialize};
use bson::oid::ObjectId;

fn default_active() -> bool {
    true
}

/*
Models for the MongoDB operations
*/

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserDocument {
    /// The ID of the model.
    pub _id: Option<ObjectId>,
    /// The user's campus email address, lowercased.
    pub email: String,
    /// The argon2 password hash.
    pub password_hash: String,
    pub name: String,
    /// Either "rider" or "driver" ("admin" once promoted).
    pub role: String,
    pub is_admin: bool,
    /// unverified | pending | verified | rejected
    pub verification_status: String,
    /// Base64 data URL of the uploaded student ID.
    pub student_id_image: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<String>,
    pub verified_at: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub branch: Option<String>,
    pub academic_year: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default)]
    pub warning_count: i64,
    pub last_warning_at: Option<String>,
    pub status_reason: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// The ID of the model, as a hex string.
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_admin: bool,
    pub verification_status: String,
    pub student_id_image: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<String>,
    pub verified_at: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub branch: Option<String>,
    pub academic_year: Option<String>,
    pub is_active: bool,
    pub is_suspended: bool,
    pub warning_count: i64,
    pub last_warning_at: Option<String>,
    pub status_reason: Option<String>,
    pub created_at: String,
}

/// A bearer session, looked up on every authenticated request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionDocument {
    pub _id: Option<ObjectId>,
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideDocument {
    pub _id: Option<ObjectId>,
    pub driver_id: String,
    pub source: String,
    pub destination: String,
    pub source_lat: Option<f64>,
    pub source_lng: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    /// Trip date, YYYY-MM-DD.
    pub date: String,
    /// Departure time, HH:MM.
    pub time: String,
    pub available_seats: i64,
    pub estimated_cost: f64,
    /// active | completed | cancelled
    pub status: String,
    pub pickup_point: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    /// Set on expanded recurring instances, pointing at the parent offer.
    pub parent_ride_id: Option<String>,
    pub event_tag: Option<String>,
    pub cancelled_reason: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ride {
    pub id: String,
    pub driver_id: String,
    pub source: String,
    pub destination: String,
    pub source_lat: Option<f64>,
    pub source_lng: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub date: String,
    pub time: String,
    pub available_seats: i64,
    pub estimated_cost: f64,
    pub status: String,
    pub pickup_point: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub parent_ride_id: Option<String>,
    pub event_tag: Option<String>,
    pub cancelled_reason: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideRequestDocument {
    pub _id: Option<ObjectId>,
    pub ride_id: String,
    pub rider_id: String,
    /// requested | accepted | rejected | ongoing | completed
    pub status: String,
    /// The 4 digit PIN, assigned when the driver accepts.
    pub ride_pin: Option<String>,
    pub is_urgent: bool,
    pub accepted_at: Option<String>,
    pub ride_started_at: Option<String>,
    pub reached_safely_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RideRequest {
    pub id: String,
    pub ride_id: String,
    pub rider_id: String,
    pub status: String,
    pub ride_pin: Option<String>,
    pub is_urgent: bool,
    pub accepted_at: Option<String>,
    pub ride_started_at: Option<String>,
    pub reached_safely_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessageDocument {
    pub _id: Option<ObjectId>,
    pub ride_request_id: String,
    pub ride_id: String,
    pub sender_id: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub ride_request_id: String,
    pub ride_id: String,
    pub sender_id: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SosEventDocument {
    pub _id: Option<ObjectId>,
    pub ride_request_id: String,
    pub ride_id: String,
    pub triggered_by: String,
    pub triggered_by_role: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
    /// active | under_review | resolved
    pub status: String,
    pub admin_notes: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SosEvent {
    pub id: String,
    pub ride_request_id: String,
    pub ride_id: String,
    pub triggered_by: String,
    pub triggered_by_role: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RatingDocument {
    pub _id: Option<ObjectId>,
    pub ride_request_id: String,
    pub ride_id: String,
    pub rater_id: String,
    pub rater_role: String,
    pub rated_user_id: String,
    /// 1 to 5 stars.
    pub rating: i64,
    pub feedback: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rating {
    pub id: String,
    pub ride_request_id: String,
    pub ride_id: String,
    pub rater_id: String,
    pub rater_role: String,
    pub rated_user_id: String,
    pub rating: i64,
    pub feedback: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventTagDocument {
    pub _id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventTag {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportDocument {
    pub _id: Option<ObjectId>,
    pub reporter_id: String,
    pub reporter_name: String,
    pub reported_user_id: Option<String>,
    pub reported_user_name: Option<String>,
    pub ride_id: Option<String>,
    /// safety | behavior | misuse | other
    pub category: String,
    pub description: String,
    /// pending | under_review | resolved | dismissed
    pub status: String,
    pub admin_notes: Option<String>,
    pub action_taken: Option<String>,
    pub handled_by: Option<String>,
    pub handled_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub reported_user_id: Option<String>,
    pub reported_user_name: Option<String>,
    pub ride_id: Option<String>,
    pub category: String,
    pub description: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub action_taken: Option<String>,
    pub handled_by: Option<String>,
    pub handled_at: Option<String>,
    pub created_at: String,
}

/// Append-only trace of every admin action
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLogDocument {
    pub _id: Option<ObjectId>,
    pub admin_id: String,
    pub admin_name: String,
    pub action_type: String,
    pub target_type: String,
    pub target_id: String,
    pub details: bson::Document,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLogEntry {
    pub id: String,
    pub admin_id: String,
    pub admin_name: String,
    pub action_type: String,
    pub target_type: String,
    pub target_id: String,
    pub details: bson::Document,
    pub timestamp: String,
}

/*
Models for route input payloads
*/

#[derive(Debug, Deserialize)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_number: Option<String>,
    pub vehicle_color: Option<String>,
    pub branch: Option<String>,
    pub academic_year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RideCreate {
    pub source: String,
    pub destination: String,
    pub source_lat: Option<f64>,
    pub source_lng: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub date: String,
    pub time: String,
    pub available_seats: i64,
    pub estimated_cost: f64,
    pub pickup_point: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub recurrence_days_ahead: Option<i64>,
    pub event_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RideUpdate {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub source_lat: Option<f64>,
    pub source_lng: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub available_seats: Option<i64>,
    pub estimated_cost: Option<f64>,
    pub pickup_point: Option<String>,
    pub event_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RideCancel {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RideRequestCreate {
    pub ride_id: String,
    #[serde(default)]
    pub is_urgent: bool,
}

#[derive(Debug, Deserialize)]
pub struct RideRequestAction {
    /// "accept" or "reject"
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRideInput {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct VerificationUpload {
    /// Base64 encoded image as a data URL
    pub student_id_image: String,
}

#[derive(Debug, Deserialize)]
pub struct VerificationAction {
    /// "approve" or "reject"
    pub action: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageInput {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SosCreate {
    pub ride_request_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SosAction {
    /// "review" or "resolve"
    pub action: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatingCreate {
    pub ride_request_id: String,
    pub rating: i64,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportCreate {
    pub reported_user_id: Option<String>,
    pub ride_id: Option<String>,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportAction {
    /// "warn", "suspend", "disable" or "dismiss"
    pub action: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusUpdate {
    pub is_active: bool,
    pub reason: Option<String>,
}

fn default_confirm() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PromoteUserInput {
    #[serde(default = "default_confirm")]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventTagCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventTagUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
