//! Command handlers

pub mod attendance;
pub mod auth;
pub mod config;
pub mod dept;
pub mod marks;
pub mod staff;
pub mod status;
pub mod student;
pub mod timetable;
