use std::collections::HashMap;
use async_trait::async_trait;
use anyhow::Result;

/// Resolves which candidate groups a user belongs to. Authentication itself
/// happens elsewhere.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn groups_of(&self, user_id: &str) -> Result<Vec<String>>;
}

/// Fixed membership table. Unknown users belong to no group.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    users: HashMap<String, Vec<String>>,
}

impl StaticIdentityProvider {
    pub fn new(users: HashMap<String, Vec<String>>) -> Self {
        Self { users }
    }

    pub fn with_user<I, S>(mut self, user_id: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(user_id.to_string(), groups.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn groups_of(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.users.get(user_id).cloned().unwrap_or_default())
    }
}
