pub mod health;
pub mod predictions;
pub mod prices;
