use serde::{Deserialize, Serialize};
use std::fmt;

/// A named set of users that holds authorization tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,

    /// Names of the tags this group holds, sorted.
    #[sqlx(skip)]
    #[serde(default)]
    pub tags: Vec<String>,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{} members\t[{}]\t{}",
            self.id,
            self.name,
            self.member_count,
            self.tags.join(", "),
            self.description.as_deref().unwrap_or("")
        )
    }
}

/// An authorization tag, e.g. `front-door` or `woodshop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}", self.id, self.name)
    }
}
