//! Scripted agent answering from in-process state.

use crate::gateway::domain::{AgentNamespaces, ServiceList, ServiceName};
use crate::gateway::ports::{AgentGateway, AgentGatewayError, AgentGatewayResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

/// Status a probe answers with when nothing was scripted for the endpoint.
const DEFAULT_PROBE_STATUS: u16 = 401;

/// A probe relayed through [`ScriptedAgent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProbe {
    /// Namespace of the probed service.
    pub namespace: String,
    /// Probed service id.
    pub service_id: String,
    /// Upper-cased HTTP method.
    pub method: String,
    /// Requested path.
    pub path: String,
}

#[derive(Debug, Default)]
struct AgentScript {
    cloud_name: String,
    namespaces: Vec<String>,
    service_names: BTreeMap<String, Vec<ServiceName>>,
    service_lists: VecDeque<ServiceList>,
    specifications: BTreeMap<(String, String), Vec<u8>>,
    probe_answers: BTreeMap<(String, String), Result<u16, String>>,
    discovery_failure: Option<String>,
    listing_failure: Option<String>,
    discovery_starts: Vec<(String, String)>,
    probes: Vec<RecordedProbe>,
}

/// Agent gateway double driven by a script.
///
/// Every agent URL reaches the same script. Service listings are consumed
/// in order and the last one keeps being returned. Probes answer 401 unless
/// an answer was scripted for the method and path.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    script: Arc<RwLock<AgentScript>>,
}

impl ScriptedAgent {
    /// Creates an agent running in `cloud_name` that sees no namespaces.
    #[must_use]
    pub fn new(cloud_name: impl Into<String>) -> Self {
        let agent = Self::default();
        agent.edit(|script| script.cloud_name = cloud_name.into());
        agent
    }

    fn edit<T>(&self, change: impl FnOnce(&mut AgentScript) -> T) -> T {
        let mut script = self.script.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut script)
    }

    fn write_script(&self) -> AgentGatewayResult<RwLockWriteGuard<'_, AgentScript>> {
        self.script
            .write()
            .map_err(|err| AgentGatewayError::transport(std::io::Error::other(err.to_string())))
    }

    /// Makes `namespace` visible.
    pub fn add_namespace(&self, namespace: impl Into<String>) {
        self.edit(|script| script.namespaces.push(namespace.into()));
    }

    /// Sets the service names listed for `namespace`.
    pub fn set_service_names(&self, namespace: impl Into<String>, names: Vec<ServiceName>) {
        self.edit(|script| script.service_names.insert(namespace.into(), names));
    }

    /// Queues a service listing.
    pub fn push_service_list(&self, list: ServiceList) {
        self.edit(|script| script.service_lists.push_back(list));
    }

    /// Serves `content` for the file `file_id` of `service_id`.
    pub fn add_specification(
        &self,
        service_id: impl Into<String>,
        file_id: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) {
        self.edit(|script| {
            script
                .specifications
                .insert((service_id.into(), file_id.into()), content.into())
        });
    }

    /// Answers probes of `method` and `path` with `status`.
    pub fn respond_to_probe(&self, method: &str, path: impl Into<String>, status: u16) {
        let key = (method.to_ascii_uppercase(), path.into());
        self.edit(|script| script.probe_answers.insert(key, Ok(status)));
    }

    /// Makes probes of `method` and `path` fail in the proxy.
    pub fn fail_probe(&self, method: &str, path: impl Into<String>, message: impl Into<String>) {
        let key = (method.to_ascii_uppercase(), path.into());
        self.edit(|script| script.probe_answers.insert(key, Err(message.into())));
    }

    /// Makes discovery triggers fail with `message`.
    pub fn fail_discovery(&self, message: impl Into<String>) {
        self.edit(|script| script.discovery_failure = Some(message.into()));
    }

    /// Makes every service listing fail with status 500 and `message`.
    pub fn fail_listing(&self, message: impl Into<String>) {
        self.edit(|script| script.listing_failure = Some(message.into()));
    }

    /// Returns the `(namespace, workspace)` pairs discovery was started for.
    #[must_use]
    pub fn discovery_starts(&self) -> Vec<(String, String)> {
        self.edit(|script| script.discovery_starts.clone())
    }

    /// Returns the probes relayed so far.
    #[must_use]
    pub fn probes(&self) -> Vec<RecordedProbe> {
        self.edit(|script| script.probes.clone())
    }
}

#[async_trait]
impl AgentGateway for ScriptedAgent {
    async fn list_namespaces(&self, _agent_url: &str) -> AgentGatewayResult<AgentNamespaces> {
        let script = self.write_script()?;
        Ok(AgentNamespaces {
            namespaces: script.namespaces.clone(),
            cloud_name: script.cloud_name.clone(),
        })
    }

    async fn list_service_names(
        &self,
        _agent_url: &str,
        namespace: &str,
    ) -> AgentGatewayResult<Vec<ServiceName>> {
        let script = self.write_script()?;
        Ok(script
            .service_names
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn start_discovery(
        &self,
        _agent_url: &str,
        namespace: &str,
        workspace_id: &str,
        _fail_on_error: bool,
    ) -> AgentGatewayResult<()> {
        let mut script = self.write_script()?;
        if let Some(message) = &script.discovery_failure {
            return Err(AgentGatewayError::Rejected {
                status: 500,
                message: message.clone(),
            });
        }
        script
            .discovery_starts
            .push((namespace.to_owned(), workspace_id.to_owned()));
        Ok(())
    }

    async fn list_services(
        &self,
        _agent_url: &str,
        _namespace: &str,
        _workspace_id: &str,
    ) -> AgentGatewayResult<ServiceList> {
        let mut script = self.write_script()?;
        if let Some(message) = &script.listing_failure {
            return Err(AgentGatewayError::Rejected {
                status: 500,
                message: message.clone(),
            });
        }
        let next = if script.service_lists.len() > 1 {
            script.service_lists.pop_front()
        } else {
            script.service_lists.front().cloned()
        };
        Ok(next.unwrap_or_default())
    }

    async fn fetch_specification(
        &self,
        _agent_url: &str,
        _namespace: &str,
        _workspace_id: &str,
        service_id: &str,
        file_id: &str,
    ) -> AgentGatewayResult<Vec<u8>> {
        let script = self.write_script()?;
        script
            .specifications
            .get(&(service_id.to_owned(), file_id.to_owned()))
            .cloned()
            .ok_or_else(|| {
                AgentGatewayError::SpecificationNotFound(format!("{service_id}/{file_id}"))
            })
    }

    async fn probe_endpoint(
        &self,
        _agent_url: &str,
        namespace: &str,
        service_id: &str,
        method: &str,
        path: &str,
    ) -> AgentGatewayResult<u16> {
        let mut script = self.write_script()?;
        let upper = method.to_ascii_uppercase();
        script.probes.push(RecordedProbe {
            namespace: namespace.to_owned(),
            service_id: service_id.to_owned(),
            method: upper.clone(),
            path: path.to_owned(),
        });
        match script.probe_answers.get(&(upper, path.to_owned())) {
            Some(Ok(status)) => Ok(*status),
            Some(Err(message)) => Err(AgentGatewayError::Proxy(message.clone())),
            None => Ok(DEFAULT_PROBE_STATUS),
        }
    }
}
