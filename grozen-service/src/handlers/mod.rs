pub mod admin;
pub mod face_validation;
pub mod grocery;
pub mod health;
pub mod leaderboard;
pub mod metrics;
pub mod moods;
pub mod plan;
pub mod schedule;
pub mod share_image;
pub mod users;
