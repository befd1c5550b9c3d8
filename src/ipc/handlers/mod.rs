pub mod announcements;
pub mod attendance;
pub mod classes;
pub mod core;
pub mod grades;
pub mod schedule;
pub mod students;
pub mod subjects;
pub mod teachers;
