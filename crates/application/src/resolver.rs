//! Host-scoped resolution
//!
//! Decides which variables apply to the page being edited and runs the
//! substitution engine with that subset.

use std::sync::Arc;

use hostvar_domain::{Variable, match_host};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::VariableStore;
use crate::substitution::{Substitution, substitute};

/// Returns true if the variable applies to every host.
#[must_use]
pub fn is_global_variable(variable: &Variable) -> bool {
    variable.is_global()
}

/// Returns true if the variable is visible on this host and port.
#[must_use]
pub fn is_visible_on(variable: &Variable, hostname: &str, port: Option<&str>) -> bool {
    variable.is_global()
        || variable
            .hosts
            .iter()
            .any(|pattern| match_host(pattern, hostname, port))
}

/// Keeps the variables visible on this host, in their original order.
///
/// Disabled variables are not removed here; the substitution engine skips
/// them on its own.
#[must_use]
pub fn filter_variables_by_host(
    variables: &[Variable],
    hostname: &str,
    port: Option<&str>,
) -> Vec<Variable> {
    variables
        .iter()
        .filter(|variable| is_visible_on(variable, hostname, port))
        .cloned()
        .collect()
}

/// Composes the store with host filtering and substitution.
#[derive(Clone)]
pub struct HostResolver {
    store: Arc<VariableStore>,
}

impl HostResolver {
    /// Creates a resolver reading from `store`.
    #[must_use]
    pub const fn new(store: Arc<VariableStore>) -> Self {
        Self { store }
    }

    /// Returns the store this resolver reads from.
    #[must_use]
    pub const fn store(&self) -> &Arc<VariableStore> {
        &self.store
    }

    /// Returns every variable visible on this host.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn variables_for(
        &self,
        hostname: &str,
        port: Option<&str>,
    ) -> StoreResult<Vec<Variable>> {
        let variables = self.store.get_variables().await?;
        Ok(filter_variables_by_host(&variables, hostname, port))
    }

    /// Counts the enabled variables visible on this host.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn available_count(&self, hostname: &str, port: Option<&str>) -> StoreResult<usize> {
        let variables = self.store.get_variables().await?;
        Ok(variables
            .iter()
            .filter(|v| v.enabled && is_visible_on(v, hostname, port))
            .count())
    }

    /// Substitutes `text` with the variables visible on this host.
    ///
    /// Returns the text unchanged when the global switch is off.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn substitute(
        &self,
        text: &str,
        hostname: &str,
        port: Option<&str>,
    ) -> StoreResult<Substitution> {
        let data = self.store.get_data().await?;
        if !data.settings.enabled {
            debug!("Substitution skipped, globally disabled");
            return Ok(Substitution::unchanged(text));
        }

        let visible = filter_variables_by_host(&data.variables, hostname, port);
        let result = substitute(text, &visible);
        debug!(
            host = hostname,
            port = port.unwrap_or_default(),
            visible = visible.len(),
            changed = result.changed,
            "Resolved text"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use crate::test_support::{FixedClock, MockBackend, SequentialIds};
    use chrono::Utc;
    use hostvar_domain::VariableDraft;
    use pretty_assertions::assert_eq;

    fn scoped(key: &str, hosts: &[&str]) -> Variable {
        Variable::create(
            key,
            VariableDraft::new(key, key.to_lowercase()).with_hosts(hosts.iter().copied()),
            Utc::now(),
        )
    }

    fn keys(variables: &[Variable]) -> Vec<&str> {
        variables.iter().map(|v| v.key.as_str()).collect()
    }

    #[test]
    fn global_variables_pass_everywhere() {
        let variables = [scoped("G", &[])];
        for (host, port) in [("a.com", None), ("b.org", Some("8080")), ("", Some("1"))] {
            assert_eq!(keys(&filter_variables_by_host(&variables, host, port)), vec!["G"]);
        }
        assert!(is_global_variable(&variables[0]));
    }

    #[test]
    fn scoped_variables_need_a_matching_pattern() {
        let variables = [
            scoped("API", &["api.x.com:8080"]),
            scoped("G", &[]),
            scoped("ANY_PORT", &["api.x.com"]),
            scoped("LOCAL", &["localhost:*", "127.0.0.1"]),
        ];

        assert_eq!(
            keys(&filter_variables_by_host(&variables, "api.x.com", Some("8080"))),
            vec!["API", "G", "ANY_PORT"]
        );
        assert_eq!(
            keys(&filter_variables_by_host(&variables, "API.X.COM", Some("9090"))),
            vec!["G", "ANY_PORT"]
        );
        assert_eq!(
            keys(&filter_variables_by_host(&variables, "api.x.com", None)),
            vec!["G", "ANY_PORT"]
        );
        assert_eq!(
            keys(&filter_variables_by_host(&variables, "localhost", Some("3000"))),
            vec!["G", "LOCAL"]
        );
        assert!(!is_global_variable(&variables[0]));
    }

    #[test]
    fn wildcard_pattern_is_visible_everywhere() {
        let variables = [scoped("W", &["*"])];
        assert_eq!(keys(&filter_variables_by_host(&variables, "x", Some("1"))), vec!["W"]);
    }

    async fn resolver() -> HostResolver {
        let store = VariableStore::open(
            Arc::new(MockBackend::new()),
            Arc::new(FixedClock::new()),
            Arc::new(SequentialIds::default()),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        for draft in [
            VariableDraft::new("HOST", "prod.example.com").with_hosts(["app.example.com"]),
            VariableDraft::new("LOCAL_HOST", "localhost:3000").with_hosts(["localhost"]),
            VariableDraft::new("USER", "admin"),
            VariableDraft::new("OFF", "nope").with_enabled(false),
        ] {
            store.save_variable(draft).await.unwrap();
        }

        HostResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn substitutes_with_visible_variables_only() {
        let resolver = resolver().await;

        let result = resolver
            .substitute("{{USER}}@{{HOST}} {{LOCAL_HOST}}", "app.example.com", None)
            .await
            .unwrap();
        assert_eq!(result.text, "admin@prod.example.com {{LOCAL_HOST}}");
        assert!(result.changed);

        let result = resolver
            .substitute("{{HOST}}", "other.com", Some("443"))
            .await
            .unwrap();
        assert_eq!(result, Substitution::unchanged("{{HOST}}"));
    }

    #[tokio::test]
    async fn counts_enabled_visible_variables() {
        let resolver = resolver().await;
        assert_eq!(resolver.available_count("app.example.com", None).await.unwrap(), 2);
        assert_eq!(resolver.available_count("localhost", Some("3000")).await.unwrap(), 2);
        assert_eq!(resolver.available_count("elsewhere.io", None).await.unwrap(), 1);
        assert_eq!(resolver.variables_for("elsewhere.io", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_globally_returns_input() {
        let resolver = resolver().await;
        assert!(!resolver.store().toggle_enabled().await.unwrap());

        let result = resolver
            .substitute("{{USER}}", "app.example.com", None)
            .await
            .unwrap();
        assert_eq!(result, Substitution::unchanged("{{USER}}"));
    }
}
