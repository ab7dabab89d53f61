mod user;
mod verification_token;

pub use user::*;
pub use verification_token::*;
