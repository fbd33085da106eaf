//! Platform configuration.

use std::collections::HashMap;

use eoslink_protocol::{AuthScopes, InitParams};
use serde::Deserialize;

use crate::SessionError;

// ---------------------------------------------------------------------------
// PlatformConfig
// ---------------------------------------------------------------------------

/// Product and SDK settings sent to the connector at initialization, plus
/// the scopes requested with every login.
///
/// Supplied once when the session is created and never mutated afterwards.
/// The deserialized form follows the host project's exported-properties
/// keys (`product-name`, `client-id`, `scope-presence`, …).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ExportedProperties")]
pub struct PlatformConfig {
    pub product_name: String,
    pub product_version: String,
    pub product_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub sandbox_id: String,
    pub deployment_id: String,

    /// Authorization scopes requested by every login flow.
    pub scopes: AuthScopes,
}

/// Flat exported-properties layout. Missing keys take the defaults,
/// `scope-basic-profile` included.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ExportedProperties {
    product_name: String,
    product_version: String,
    product_id: String,
    client_id: String,
    client_secret: String,
    sandbox_id: String,
    deployment_id: String,
    scope_basic_profile: bool,
    scope_friends_list: bool,
    scope_presence: bool,
    scope_country: bool,
}

impl Default for ExportedProperties {
    fn default() -> Self {
        let scopes = AuthScopes::default();
        Self {
            product_name: String::new(),
            product_version: String::new(),
            product_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            sandbox_id: String::new(),
            deployment_id: String::new(),
            scope_basic_profile: scopes.basic_profile,
            scope_friends_list: scopes.friends_list,
            scope_presence: scopes.presence,
            scope_country: scopes.country,
        }
    }
}

impl From<ExportedProperties> for PlatformConfig {
    fn from(props: ExportedProperties) -> Self {
        Self {
            product_name: props.product_name,
            product_version: props.product_version,
            product_id: props.product_id,
            client_id: props.client_id,
            client_secret: props.client_secret,
            sandbox_id: props.sandbox_id,
            deployment_id: props.deployment_id,
            scopes: AuthScopes {
                basic_profile: props.scope_basic_profile,
                friends_list: props.scope_friends_list,
                presence: props.scope_presence,
                country: props.scope_country,
            },
        }
    }
}

/// The slice of a host project's `package.json` the loader cares about.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ProjectManifest {
    project_details: ProjectDetails,
    exported_properties: HashMap<String, PlatformConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectDetails {
    name: String,
    version: String,
}

impl PlatformConfig {
    /// Loads the configuration exported for `component_id` from a host
    /// project manifest.
    ///
    /// Empty product name/version fall back to the project's own
    /// name/version. Scope flags absent from the manifest keep their
    /// defaults.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if the manifest is not valid JSON or
    /// exports nothing for `component_id`.
    pub fn from_package_json(json: &str, component_id: &str) -> Result<Self, SessionError> {
        let mut manifest: ProjectManifest = serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;

        let config = manifest
            .exported_properties
            .remove(component_id)
            .ok_or_else(|| {
                SessionError::InvalidConfig(format!(
                    "no exported properties for component `{component_id}`"
                ))
            })?;

        let details = manifest.project_details;
        Ok(config.with_project_fallback(&details.name, &details.version))
    }

    /// Substitutes the project's name/version for an empty product
    /// name/version.
    pub fn with_project_fallback(mut self, project_name: &str, project_version: &str) -> Self {
        if self.product_name.is_empty() {
            self.product_name = project_name.to_owned();
        }
        if self.product_version.is_empty() {
            self.product_version = project_version.to_owned();
        }
        self
    }

    /// Replaces the login scopes.
    pub fn with_scopes(mut self, scopes: AuthScopes) -> Self {
        self.scopes = scopes;
        self
    }

    /// Payload of the `init` request.
    pub fn init_params(&self) -> InitParams {
        InitParams {
            product_name: self.product_name.clone(),
            product_version: self.product_version.clone(),
            product_id: self.product_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            sandbox_id: self.sandbox_id.clone(),
            deployment_id: self.deployment_id.clone(),
        }
    }
}
