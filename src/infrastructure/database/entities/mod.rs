//! Database entities module

pub mod place;
pub mod user;
pub mod user_place;

pub use place::Entity as Place;
pub use user::Entity as User;
pub use user_place::Entity as UserPlace;
