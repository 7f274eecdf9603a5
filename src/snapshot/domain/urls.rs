//! Catalog portal links.

use urlencoding::encode;

/// Returns the portal overview link of `package_id` at `version`.
#[must_use]
pub fn package_overview_url(catalog_url: &str, package_id: &str, version: &str) -> String {
    format!(
        "{catalog_url}/portal/packages/{package_id}/{}/overview/summary",
        encode(version)
    )
}

/// Returns the portal link comparing `version` of `package_id` with
/// `previous_version` of `previous_package_id`.
#[must_use]
pub fn compare_url(
    catalog_url: &str,
    package_id: &str,
    version: &str,
    api_type: &str,
    previous_package_id: &str,
    previous_version: &str,
) -> String {
    format!(
        "{catalog_url}/portal/packages/{package_id}/{}/compare?apiType={api_type}&package={previous_package_id}&version={}",
        encode(version),
        encode(previous_version)
    )
}
