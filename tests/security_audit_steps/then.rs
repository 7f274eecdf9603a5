//! Then steps for security audit BDD scenarios.

use super::world::{AuditWorld, run_async};
use apihub_agents::security_check::domain::{ReportFilter, ReportPrincipal};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;

#[then(r#"the security check finishes with status "{status}""#)]
fn finishes_with_status(world: &AuditWorld, status: String) -> Result<(), eyre::Report> {
    let summary = world.finished()?;
    if summary.process.status.as_str() != status {
        return Err(eyre!(
            "expected status {status}, got {} ({})",
            summary.process.status,
            summary.process.details
        ));
    }
    Ok(())
}

#[then("{processed:u64} of {total:u64} services are processed")]
fn services_processed(world: &AuditWorld, processed: u64, total: u64) -> Result<(), eyre::Report> {
    let summary = world.finished()?;
    if (summary.services_processed, summary.services_total) != (processed, total) {
        return Err(eyre!(
            "expected {processed} of {total} services, got {} of {}",
            summary.services_processed,
            summary.services_total
        ));
    }
    Ok(())
}

#[then(r#"the security check details read "{details}""#)]
fn details_read(world: &AuditWorld, details: String) -> Result<(), eyre::Report> {
    let summary = world.finished()?;
    if summary.process.details != details {
        return Err(eyre!(
            "expected details {details:?}, got {:?}",
            summary.process.details
        ));
    }
    Ok(())
}

#[then(r#"the service "{service}" is rated "{verdict}""#)]
fn service_rated(world: &AuditWorld, service: String, verdict: String) -> Result<(), eyre::Report> {
    let process_id = world
        .process_id
        .ok_or_else(|| eyre!("no security check was started"))?;
    let report = run_async(world.reports().export_report(process_id)).wrap_err("export report")?;
    let rollup = report
        .services
        .iter()
        .find(|rollup| rollup.service.service_id == service)
        .ok_or_else(|| eyre!("service {service} is not part of the report"))?;
    if rollup.verdict.as_str() != verdict {
        return Err(eyre!("expected {service} rated {verdict}, got {}", rollup.verdict));
    }
    Ok(())
}

#[then(r#"the request fails with error code "{code}""#)]
fn request_fails(world: &AuditWorld, code: String) -> Result<(), eyre::Report> {
    let err = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre!("expected the request to fail"))?;
    let actual = err.code().map(|value| value.as_str());
    if actual != Some(code.as_str()) {
        return Err(eyre!("expected error code {code}, got {actual:?} for {err}"));
    }
    Ok(())
}

#[then(r#"the latest report was started by the API key "{name}""#)]
fn latest_report_principal(world: &AuditWorld, name: String) -> Result<(), eyre::Report> {
    let reports =
        run_async(world.reports().list_reports(&ReportFilter::default())).wrap_err("list reports")?;
    let latest = reports.first().ok_or_else(|| eyre!("no reports listed"))?;
    match &latest.created_by {
        ReportPrincipal::ApiKey { name: key_name, .. } if *key_name == name => Ok(()),
        other => Err(eyre!("expected API key {name}, got {other:?}")),
    }
}
