//! Fluent builder for [`RunSpec`] test inputs.

use std::path::Path;

use navrun::model::{
    ArtifactQuery, ContainerEngine, Inventory, KnownHost, Operation, PrivateKey, RunId, RunSpec,
};

/// Default playbook used by [`RunSpecBuilder`].
pub const DEFAULT_PLAYBOOK: &str = "- hosts: all\n  gather_facts: false\n  tasks:\n    - ansible.builtin.ping:\n";

/// Fluent builder for constructing [`RunSpec`] objects in tests.
///
/// Starts from a minimal spec: the default playbook, one `hosts.ini`
/// inventory, and the execution environment disabled.
#[derive(Debug, Clone)]
pub struct RunSpecBuilder {
    spec: RunSpec,
}

impl RunSpecBuilder {
    #[must_use]
    pub fn new(working_directory: &Path) -> Self {
        let mut spec = RunSpec::new(DEFAULT_PLAYBOOK, working_directory);
        spec.inventories
            .push(Inventory::new("hosts.ini", "[all]\nlocalhost ansible_connection=local\n"));
        Self { spec }
    }

    #[must_use]
    pub fn with_id(mut self, id: RunId) -> Self {
        self.spec.id = id;
        self
    }

    #[must_use]
    pub fn with_run_counter(mut self, counter: u64) -> Self {
        self.spec.run_counter = counter;
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.spec.operation = operation;
        self
    }

    #[must_use]
    pub fn with_playbook(mut self, playbook: &str) -> Self {
        self.spec.playbook = playbook.to_string();
        self
    }

    #[must_use]
    pub fn with_inventory(mut self, name: &str, content: &str) -> Self {
        self.spec.inventories.push(Inventory::new(name, content));
        self
    }

    #[must_use]
    pub fn with_previous_inventory(mut self, name: &str, content: &str) -> Self {
        self.spec
            .previous_inventories
            .push(Inventory::new(name, content));
        self
    }

    #[must_use]
    pub fn with_navigator_binary(mut self, path: &Path) -> Self {
        self.spec.navigator_binary = Some(path.display().to_string());
        self
    }

    #[must_use]
    pub fn with_execution_environment(mut self, engine: ContainerEngine) -> Self {
        self.spec.execution_environment.enabled = true;
        self.spec.execution_environment.container_engine = Some(engine);
        self
    }

    #[must_use]
    pub fn with_private_key(mut self, name: &str, data: &str) -> Self {
        self.spec.private_keys.push(PrivateKey::new(name, data));
        self
    }

    #[must_use]
    pub fn with_known_hosts(mut self, hosts: &[&str]) -> Self {
        self.spec.known_hosts = Some(hosts.iter().map(|h| KnownHost::new(*h)).collect());
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, filter: &str) -> Self {
        self.spec
            .artifact_queries
            .insert(name.to_string(), ArtifactQuery::new(filter));
        self
    }

    #[must_use]
    pub fn with_extra_var(mut self, key: &str, value: serde_json::Value) -> Self {
        self.spec.options.extra_vars.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.spec.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn without_host_key_checking(mut self) -> Self {
        self.spec.options.host_key_checking = false;
        self
    }

    /// Adjust anything the builder has no shortcut for.
    #[must_use]
    pub fn map(mut self, f: impl FnOnce(&mut RunSpec)) -> Self {
        f(&mut self.spec);
        self
    }

    #[must_use]
    pub fn build(self) -> RunSpec {
        self.spec
    }
}
