pub mod export;
pub mod insights;
pub use insights::{InsightGenerator, WeatherInsights};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthSession, AuthenticatedUser, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UpdateUser, UserError, UserProfile, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod weather_service;
pub mod weather_service_impl;
pub use weather_service::{WeatherError, WeatherLogDto, WeatherService};
pub use weather_service_impl::SeaOrmWeatherService;
