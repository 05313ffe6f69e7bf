pub mod license;
pub mod remote;

use async_trait::async_trait;

use crate::config::{AuthorizationConfig, AuthorizationMode, RunConfig};

pub use license::LicenseAuthorization;
pub use remote::RemoteAuthorization;

/// Gate consulted once per batch. Anything but `true` aborts the batch.
#[async_trait]
pub trait Authorization: Send + Sync {
    async fn is_authorized(&self) -> bool;
}

/// Development mode: every run is allowed.
pub struct AlwaysAuthorized;

#[async_trait]
impl Authorization for AlwaysAuthorized {
    async fn is_authorized(&self) -> bool {
        true
    }
}

/// Build the configured gate. `disable_security` forces `AlwaysAuthorized`.
pub fn from_config(
    config: &AuthorizationConfig,
    run: &RunConfig,
    disable_security: bool,
) -> Box<dyn Authorization> {
    let mode = if disable_security {
        AuthorizationMode::Disabled
    } else {
        config.mode
    };
    tracing::info!(mode = ?mode, "authorization configured");
    match mode {
        AuthorizationMode::Disabled => {
            tracing::warn!("security disabled, running without authorization");
            Box::new(AlwaysAuthorized)
        }
        AuthorizationMode::License => Box::new(LicenseAuthorization::from_config(config, run)),
        AuthorizationMode::Remote => Box::new(RemoteAuthorization::from_config(config)),
    }
}
