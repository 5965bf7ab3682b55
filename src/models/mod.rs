pub mod user;
pub mod genre;
pub mod actor;
pub mod cinema_hall;
pub mod movie;
pub mod movie_session;
pub mod order;
pub mod datetime;

pub use user::User;
pub use genre::Genre;
pub use actor::Actor;
pub use cinema_hall::CinemaHall;
pub use movie::Movie;
pub use movie_session::MovieSession;
pub use order::{Order, Ticket};
