pub mod auth;
pub mod directory;
pub mod profiles;
pub mod settings;
pub mod users;
