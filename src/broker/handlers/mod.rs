pub mod health;
pub use self::health::health;

pub mod pipeline;

pub mod userinfo;
pub use self::userinfo::{userinfo_get, userinfo_post};
