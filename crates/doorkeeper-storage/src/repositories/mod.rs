pub mod access_log;
pub mod group;
pub mod key;
pub mod tag;
pub mod user;

pub use access_log::{AccessLogRepository, LogFilter, SqliteAccessLogRepository};
pub use group::{GroupRepository, SqliteGroupRepository};
pub use key::{KeyRepository, SqliteKeyRepository};
pub use tag::{SqliteTagRepository, TagRepository};
pub use user::{SqliteUserRepository, UserRepository};
