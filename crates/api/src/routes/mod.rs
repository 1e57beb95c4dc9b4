pub mod health;
pub mod machines;
