//! Given steps for security audit BDD scenarios.

use std::sync::Arc;

use super::world::{AuditWorld, run_async};
use apihub_agents::agent::domain::AgentHeartbeat;
use apihub_agents::gateway::adapters::memory::ScriptedAgent;
use apihub_agents::gateway::domain::{
    ApiKeyInfo, DiscoveredService, DocumentType, OperationDocument, RestOperation, ServiceDocument,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::json;

#[given(r#"an active agent for namespace "{namespace}" in cloud "{cloud}""#)]
fn active_agent(
    world: &mut AuditWorld,
    namespace: String,
    cloud: String,
) -> Result<(), eyre::Report> {
    let agent = ScriptedAgent::new(cloud.as_str());
    agent.add_namespace(namespace.as_str());
    world.agent = Arc::new(agent);
    let heartbeat = AgentHeartbeat::new(cloud.as_str(), namespace, "http://agent", "1.0.0")
        .with_agent_version("2.0.0");
    let record = run_async(world.agents().heartbeat(heartbeat)).wrap_err("register agent")?;
    world.agent_id = Some(record.id().clone());
    world.cloud = cloud;
    Ok(())
}

#[given(r#"a workspace "{workspace}" in the catalog"#)]
fn workspace_in_catalog(world: &mut AuditWorld, workspace: String) {
    world.catalog.add_workspace(&workspace, "Workspace");
}

#[given(r#"the namespace runs an OpenAPI service "{service}""#)]
fn openapi_service(world: &mut AuditWorld, service: String) {
    let file = format!("{service}.json");
    world
        .agent
        .add_specification(service.as_str(), file.as_str(), b"{\"openapi\":\"3.0.0\"}".to_vec());
    world.services.push(
        DiscoveredService::new(service.as_str(), service.as_str())
            .with_document(ServiceDocument::new(file, DocumentType::OPENAPI_3_0)),
    );
}

#[given(r#"the namespace runs an undocumented service "{service}""#)]
fn undocumented_service(world: &mut AuditWorld, service: String) {
    world
        .services
        .push(DiscoveredService::new(service.as_str(), service.as_str()));
}

#[given(r#"the service "{service}" declares a secured "{method}" operation on "{path}""#)]
fn secured_operation(
    world: &mut AuditWorld,
    service: String,
    method: String,
    path: String,
) -> Result<(), eyre::Report> {
    let data: OperationDocument = serde_json::from_value(json!({
        "security": [{"apiKey": []}],
        "paths": {path.as_str(): {}}
    }))
    .wrap_err("build operation fragment")?;
    let operation = RestOperation {
        operation_id: format!("{method}-{path}"),
        title: path.clone(),
        api_type: "rest".to_owned(),
        path,
        method,
        data: Some(data),
    };
    let package_id = world.package_id(&service);
    let operations = world.operations.entry(package_id.clone()).or_default();
    operations.push(operation);
    world.catalog.set_operations(&package_id, operations.clone());
    Ok(())
}

#[given(r#"the agent answers "{method}" "{path}" with status {status:u16}"#)]
fn agent_answers(world: &mut AuditWorld, method: String, path: String, status: u16) {
    world.agent.respond_to_probe(&method, path, status);
}

#[given(r#"the catalog knows the API key "{id}" named "{name}""#)]
fn catalog_api_key(world: &mut AuditWorld, id: String, name: String) {
    world.catalog.add_api_key(ApiKeyInfo {
        id,
        package_id: "WS".to_owned(),
        name,
        revoked: false,
        roles: Vec::new(),
    });
}
