pub mod group;
pub mod location;
pub mod user;
