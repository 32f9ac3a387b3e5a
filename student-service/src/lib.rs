//! student-service: owns the student collection.
//!
//! Keeps `student.classrooms` consistent with the classroom service's
//! `classroom.students` via bus notifications, never shared transactions.

pub mod api;
pub mod config;
pub mod dtos;
pub mod events;
pub mod models;
pub mod services;
pub mod store;
