pub mod health;
pub mod trigger;
