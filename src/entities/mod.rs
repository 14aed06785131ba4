pub mod application;
pub mod communication;
pub mod interview_round;
pub mod job;
pub mod user_profile;

pub use application::Entity as Application;
pub use communication::Entity as Communication;
pub use interview_round::Entity as InterviewRound;
pub use job::Entity as Job;
pub use user_profile::Entity as UserProfile;
