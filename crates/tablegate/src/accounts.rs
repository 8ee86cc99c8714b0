//! Configured store accounts.

use std::sync::Arc;

use tablegate_core::store::{AccountRole, TableStore};

use crate::config::Config;

/// The primary account and an optional secondary replica.
#[derive(Clone)]
pub struct AccountSet {
    primary: Arc<dyn TableStore>,
    secondary: Option<Arc<dyn TableStore>>,
}

impl AccountSet {
    pub fn new(primary: Arc<dyn TableStore>, secondary: Option<Arc<dyn TableStore>>) -> Self {
        Self { primary, secondary }
    }

    /// Opens a handle per configured account.
    #[cfg(feature = "inmemory")]
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        use crate::storage::InMemoryTableStore;

        let primary: Arc<dyn TableStore> =
            Arc::new(InMemoryTableStore::new(&config.primary.account_name));
        let secondary = config.secondary.as_ref().map(|descriptor| {
            Arc::new(InMemoryTableStore::new(&descriptor.account_name)) as Arc<dyn TableStore>
        });

        Ok(Self::new(primary, secondary))
    }

    /// Opens a handle per configured account.
    #[cfg(feature = "azure")]
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        use crate::storage::AzureTableStore;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let primary: Arc<dyn TableStore> =
            Arc::new(AzureTableStore::new(client.clone(), &config.primary)?);
        let secondary = config
            .secondary
            .as_ref()
            .map(|descriptor| AzureTableStore::new(client.clone(), descriptor))
            .transpose()?
            .map(|store| Arc::new(store) as Arc<dyn TableStore>);

        Ok(Self::new(primary, secondary))
    }

    pub fn primary(&self) -> &Arc<dyn TableStore> {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Arc<dyn TableStore>> {
        self.secondary.as_ref()
    }

    /// Every configured account, primary first.
    pub fn iter(&self) -> impl Iterator<Item = (AccountRole, &Arc<dyn TableStore>)> {
        std::iter::once((AccountRole::Primary, &self.primary))
            .chain(self.secondary.iter().map(|s| (AccountRole::Secondary, s)))
    }

    /// Account serving a request's second table: the secondary if configured.
    pub fn for_second_table(&self) -> (AccountRole, &Arc<dyn TableStore>) {
        match &self.secondary {
            Some(secondary) => (AccountRole::Secondary, secondary),
            None => (AccountRole::Primary, &self.primary),
        }
    }
}

impl std::fmt::Debug for AccountSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSet")
            .field("primary", &self.primary.account_name())
            .field(
                "secondary",
                &self.secondary.as_ref().map(|s| s.account_name()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::inmemory::InMemoryTableStore;

    fn store(name: &str) -> Arc<dyn TableStore> {
        Arc::new(InMemoryTableStore::new(name))
    }

    #[test]
    fn test_primary_only() {
        let accounts = AccountSet::new(store("p"), None);

        let roles: Vec<AccountRole> = accounts.iter().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![AccountRole::Primary]);

        let (role, second) = accounts.for_second_table();
        assert_eq!(role, AccountRole::Primary);
        assert_eq!(second.account_name(), "p");
    }

    #[test]
    fn test_with_secondary() {
        let accounts = AccountSet::new(store("p"), Some(store("s")));

        let names: Vec<&str> = accounts.iter().map(|(_, s)| s.account_name()).collect();
        assert_eq!(names, vec!["p", "s"]);

        let (role, second) = accounts.for_second_table();
        assert_eq!(role, AccountRole::Secondary);
        assert_eq!(second.account_name(), "s");
    }

    #[cfg(feature = "inmemory")]
    #[test]
    fn test_connect_builds_one_store_per_descriptor() {
        let config = Config::from_lookup(|key| match key {
            "TABLE_STORE_CONNECTION" => Some("one:a2V5".to_string()),
            "TABLE_STORE_CONNECTION_SECONDARY" => Some("two:a2V5".to_string()),
            _ => None,
        })
        .unwrap();

        let accounts = AccountSet::connect(&config).unwrap();

        assert_eq!(accounts.primary().account_name(), "one");
        assert_eq!(accounts.secondary().unwrap().account_name(), "two");
    }
}
