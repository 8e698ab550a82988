pub mod access_log;
pub mod group;
pub mod key_binding;
pub mod user;

pub use access_log::{AccessLogEntry, NewLogEntry};
pub use group::{Group, Tag};
pub use key_binding::KeyBinding;
pub use user::{NewUser, User, UserField, UserUpdate};
