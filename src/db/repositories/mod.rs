pub mod user;
pub mod weather;
