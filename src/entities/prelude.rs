pub use super::users::Entity as Users;
pub use super::weather_logs::Entity as WeatherLogs;
