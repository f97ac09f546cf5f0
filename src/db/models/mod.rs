mod photo;
mod user;

pub use photo::*;
pub use user::*;
