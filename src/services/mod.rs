pub mod booking;
pub mod jwt;
pub mod media;
pub mod password;
