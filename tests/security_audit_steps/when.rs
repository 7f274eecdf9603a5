//! When steps for security audit BDD scenarios.

use super::world::{AuditWorld, run_async};
use apihub_agents::agent::domain::AgentId;
use apihub_agents::gateway::domain::{DiscoveryStatus, ServiceList};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::when;

#[when(
    r#"a security check of namespace "{namespace}" into workspace "{workspace}" is started by "{principal}""#
)]
fn start_check(
    world: &mut AuditWorld,
    namespace: String,
    workspace: String,
    principal: String,
) -> Result<(), eyre::Report> {
    world.agent.push_service_list(ServiceList {
        services: world.services.clone(),
        status: DiscoveryStatus::Complete,
        debug: String::new(),
    });
    let agent_id = world
        .agent_id
        .clone()
        .ok_or_else(|| eyre!("no agent registered in scenario world"))?;
    let process_id = run_async(world.checks().start_check(
        &agent_id,
        &namespace,
        &workspace,
        &principal,
    ))
    .wrap_err("start security check")?;
    world.process_id = Some(process_id);
    Ok(())
}

#[when(r#"a security check through agent "{agent_id}" is requested"#)]
fn request_through_agent(world: &mut AuditWorld, agent_id: String) {
    let result = run_async(world.checks().start_check(
        &AgentId::new(agent_id),
        "team",
        "WS",
        "user-1",
    ));
    match result {
        Ok(process_id) => world.process_id = Some(process_id),
        Err(err) => world.last_error = Some(err),
    }
}
