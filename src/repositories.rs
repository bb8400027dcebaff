pub mod purchases;
pub mod raffles;
pub mod users;
