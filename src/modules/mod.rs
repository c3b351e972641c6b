pub mod audit;
pub mod courses;
pub mod enrollments;
pub mod principals;
pub mod students;
