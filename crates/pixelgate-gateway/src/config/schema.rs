use serde::Deserialize;
use pixelgate_core::error::{PixelGateError, Result};

use crate::pipeline::OnFail;
use crate::policy::SecurityPolicy;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub image_processor: ImageProcessorConfig,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PixelGateError::Config(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.image_processor.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory served as the upstream of the image processor.
    #[serde(default = "default_root")]
    pub root: String,

    /// Largest upstream body the middleware buffers for transformation.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            root: default_root(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.root.trim().is_empty() {
            return Err(PixelGateError::Config("gateway.root must not be empty".into()));
        }
        if !(1024..=512 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(PixelGateError::Config(
                "gateway.max_body_bytes must be between 1KiB and 512MiB".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_root() -> String {
    "./public".into()
}
fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

/// Middleware-level settings: failure policy for transform errors plus the
/// optional parameter security policy.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageProcessorConfig {
    #[serde(default)]
    pub on_fail: OnFail,

    #[serde(default)]
    pub security: Option<SecurityPolicy>,
}

impl ImageProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(security) = &self.security {
            security.validate()?;
        }
        Ok(())
    }
}
