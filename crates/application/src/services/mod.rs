mod stats_service;
mod user_service;

pub use stats_service::{StatsService, StatsSnapshot};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UpdateProfileRequest, UserService,
    UserServiceDependencies,
};
