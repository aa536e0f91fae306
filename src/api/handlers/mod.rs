pub mod auth;
pub mod health;
mod pages;
pub mod search;
pub mod state;

pub use self::state::AuthState;
