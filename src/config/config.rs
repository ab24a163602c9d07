//!
//! Documentation of the config module.
//! Sets up the 'config' and 'logger', and holds the fixed campus catalogs
//! (pickup points, recurrence patterns, branches, badges, trust thresholds).
//!



extern crate confy;

use serde::{Serialize, Deserialize};
use std::default::Default;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfyConfig {
    pub print_log: bool,
    pub log_file: String,
    pub database: String,
    pub database_ip: String,
    pub timeout: u64,
    pub allowed_email_domain: String,
    pub token_ttl_minutes: i64,
}

///Config check
impl Default for ConfyConfig {
    fn default() -> Self {
        ConfyConfig {
            print_log: false,
            log_file: "output.log".to_string(),
            database: "unipool".to_string(),
            database_ip: "mongodb://localhost:27017/".to_string(),
            timeout: 2,
            allowed_email_domain: "@campus.edu".to_string(),
            token_ttl_minutes: 1440,
        }
    }
}

/// Initialize config and load
pub async fn init() -> Result<ConfyConfig, confy::ConfyError> {
    let cfg: ConfyConfig = confy::load_path("unipool.toml").unwrap_or_default();
    Ok(cfg)
}

/// Sets up logger
pub async fn setup_logger(file: &ConfyConfig) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(fern::log_file(&file.log_file)?);

    if file.print_log {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch.apply()?;
    Ok(())
}

//
// Campus catalogs
//

/// Campus pickup points: (id, name, description)
pub const PICKUP_POINTS: [(&str, &str, &str); 12] = [
    ("main_gate", "Main Gate", "Main campus entrance"),
    ("library", "Central Library", "Near the library building"),
    ("canteen", "Main Canteen", "Central canteen area"),
    ("cse_block", "CSE Block", "Computer science building"),
    ("ece_block", "ECE Block", "Electronics building"),
    ("mech_block", "Mechanical Block", "Mechanical engineering building"),
    ("civil_block", "Civil Block", "Civil engineering building"),
    ("admin_block", "Admin Block", "Administrative building"),
    ("hostel_gate", "Hostel Gate", "Hostel entrance"),
    ("sports_complex", "Sports Complex", "Near the playground and gym"),
    ("parking_lot", "Parking Lot", "Main parking area"),
    ("back_gate", "Back Gate", "Rear campus exit"),
];

/// Recurrence patterns: (id, name, weekdays with Monday = 0)
pub const RECURRENCE_PATTERNS: [(&str, &str, &[u32]); 5] = [
    ("weekdays", "Weekdays", &[0, 1, 2, 3, 4]),
    ("weekends", "Weekends", &[5, 6]),
    ("daily", "Daily", &[0, 1, 2, 3, 4, 5, 6]),
    ("mon_wed_fri", "Mon/Wed/Fri", &[0, 2, 4]),
    ("tue_thu", "Tue/Thu", &[1, 3]),
];

/// Engineering branches: (id, name)
pub const BRANCHES: [(&str, &str); 10] = [
    ("cse", "Computer Science"),
    ("ise", "Information Science"),
    ("ece", "Electronics & Communication"),
    ("eee", "Electrical & Electronics"),
    ("me", "Mechanical Engineering"),
    ("cv", "Civil Engineering"),
    ("bt", "Biotechnology"),
    ("ch", "Chemical Engineering"),
    ("im", "Industrial Management"),
    ("te", "Telecommunication"),
];

/// Academic years: (id, name)
pub const ACADEMIC_YEARS: [(&str, &str); 4] = [
    ("1", "1st Year"),
    ("2", "2nd Year"),
    ("3", "3rd Year"),
    ("4", "4th Year"),
];

/// A badge definition, earned either by ride count or by saved CO2
pub struct BadgeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub min_rides: Option<u64>,
    pub min_co2_kg: Option<f64>,
}

pub const BADGE_DEFINITIONS: [BadgeDef; 6] = [
    BadgeDef { id: "first_ride", name: "First Ride", description: "Completed your first ride", icon: "\u{1F389}", min_rides: Some(1), min_co2_kg: None },
    BadgeDef { id: "rides_5", name: "Rising Star", description: "Completed 5 rides", icon: "\u{2B50}", min_rides: Some(5), min_co2_kg: None },
    BadgeDef { id: "rides_10", name: "Road Warrior", description: "Completed 10 rides", icon: "\u{1F3C6}", min_rides: Some(10), min_co2_kg: None },
    BadgeDef { id: "rides_25", name: "Campus Hero", description: "Completed 25 rides", icon: "\u{1F9B8}", min_rides: Some(25), min_co2_kg: None },
    BadgeDef { id: "eco_warrior", name: "Eco Warrior", description: "Saved 50kg CO2", icon: "\u{1F331}", min_rides: None, min_co2_kg: Some(50.0) },
    BadgeDef { id: "eco_champion", name: "Eco Champion", description: "Saved 100kg CO2", icon: "\u{1F30D}", min_rides: None, min_co2_kg: Some(100.0) },
];

// CO2 and cost constants for the derived ride stats
pub const CO2_PER_KM_SAVED: f64 = 0.21;
pub const AVG_RIDE_DISTANCE_KM: f64 = 8.0;
pub const COST_PER_KM_SOLO: f64 = 12.0;

// Trust tier thresholds
pub const TRUSTED_MIN_RATING: f64 = 4.0;
pub const TRUSTED_MIN_RIDES: u64 = 5;
pub const NEW_USER_MAX_RIDES: u64 = 4;
pub const NEEDS_REVIEW_MAX_RATING: f64 = 2.5;

/// Resolve a pickup point id to its display name
pub fn pickup_point_name(id: &str) -> Option<&'static str> {
    PICKUP_POINTS.iter().find(|(point_id, _, _)| *point_id == id).map(|(_, name, _)| *name)
}

/// Resolve a recurrence pattern id to its weekdays
pub fn recurrence_days(id: &str) -> Option<&'static [u32]> {
    RECURRENCE_PATTERNS.iter().find(|(pattern_id, _, _)| *pattern_id == id).map(|(_, _, days)| *days)
}

/// Resolve a branch id to its display name
pub fn branch_name(id: &str) -> Option<&'static str> {
    BRANCHES.iter().find(|(branch_id, _)| *branch_id == id).map(|(_, name)| *name)
}

/// Resolve an academic year id to its display name
pub fn academic_year_name(id: &str) -> Option<&'static str> {
    ACADEMIC_YEARS.iter().find(|(year_id, _)| *year_id == id).map(|(_, name)| *name)
}
