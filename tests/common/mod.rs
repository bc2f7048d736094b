//! Shared fixtures: a synthetic hotel reservations table and configs for it

#![allow(dead_code)]

use hotel_reservation::config::AppConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use std::path::Path;

pub const BUCKET: &str = "hotel-bucket";
pub const OBJECT: &str = "Hotel_Reservations.csv";

// Category labels as they appear in the reservations file
pub const MEALS: [&str; 4] = ["Not Selected", "Meal Plan 1", "Meal Plan 2", "Meal Plan 3"];
pub const ROOMS: [&str; 7] = [
    "Room_Type 4",
    "Room_Type 1",
    "Room_Type 2",
    "Room_Type 6",
    "Room_Type 5",
    "Room_Type 7",
    "Room_Type 3",
];
pub const SEGMENTS: [&str; 5] = ["Offline", "Online", "Corporate", "Aviation", "Complementary"];

/// Reservations CSV where long lead times without special requests tend to cancel
pub fn reservations_csv(rows: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut csv = String::from(
        "Booking_ID,no_of_adults,no_of_weekend_nights,no_of_week_nights,type_of_meal_plan,\
room_type_reserved,lead_time,arrival_month,arrival_date,market_segment_type,\
no_of_special_requests,avg_price_per_room,booking_status\n",
    );
    for i in 0..rows {
        let lead_time: i64 = rng.gen_range(0..300);
        let special: i64 = rng.gen_range(0..3);
        let price: f64 = (rng.gen_range(50.0..200.0_f64) * 100.0).round() / 100.0;
        let canceled = (lead_time > 120 && special == 0) || rng.gen_bool(0.08);
        let _ = writeln!(
            csv,
            "INN{:05},{},{},{},{},{},{},{},{},{},{},{},{}",
            i,
            rng.gen_range(1..4),
            rng.gen_range(0..3),
            rng.gen_range(0..6),
            MEALS[rng.gen_range(0..MEALS.len())],
            ROOMS[rng.gen_range(0..ROOMS.len())],
            lead_time,
            rng.gen_range(1..13),
            rng.gen_range(1..29),
            SEGMENTS[rng.gen_range(0..SEGMENTS.len())],
            special,
            price,
            if canceled { "Canceled" } else { "Not_Canceled" },
        );
    }
    csv
}

/// Place the reservations object under `{root}/{bucket}/{object}`
pub fn seed_bucket(root: &Path, rows: usize) {
    let dir = root.join(BUCKET);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(OBJECT), reservations_csv(rows, 11)).unwrap();
}

/// Small, fast configuration reading from a local bucket and writing under `artifacts`
pub fn config_yaml(bucket_root: &Path, artifacts: &Path) -> String {
    format!(
        r#"
DataIngestion:
  bucket_name: {bucket}
  bucket_file_name: {object}
  train_ratio: 0.8
  storage:
    kind: local
    root: {root}
DataProcessing:
  categorical_columns: [type_of_meal_plan, room_type_reserved, market_segment_type, booking_status]
  numerical_columns: [lead_time, avg_price_per_room, no_of_week_nights, no_of_weekend_nights]
  skewness_threshold: 5
  numerical_features_to_select: 10
  selection_estimators: 20
ModelTraining:
  n_iter: 2
  cv: 2
  n_jobs: 2
  scoring: f1
  min_child_samples: 2
  param_distributions:
    n_estimators: {{ low: 10, high: 20 }}
    max_depth: {{ low: 3, high: 6 }}
    learning_rate: {{ low: 0.05, width: 0.1 }}
    num_leaves: {{ low: 4, high: 8 }}
    boosting_type: [gbdt, goss]
Paths:
  artifacts_dir: {artifacts}
"#,
        bucket = BUCKET,
        object = OBJECT,
        root = bucket_root.display(),
        artifacts = artifacts.display(),
    )
}

pub fn app_config(bucket_root: &Path, artifacts: &Path) -> AppConfig {
    AppConfig::from_yaml_str(&config_yaml(bucket_root, artifacts)).unwrap()
}
