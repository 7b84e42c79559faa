pub mod prelude;

pub mod users;
pub mod weather_logs;
