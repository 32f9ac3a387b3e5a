mod user;

pub use user::{AuthResponse, User, UserResponse};
