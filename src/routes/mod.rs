pub mod applications;
pub mod communications;
pub mod extract;
pub mod interviews;
pub mod jobs;
pub mod profile;
