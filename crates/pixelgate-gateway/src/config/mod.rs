//! Gateway config loader (strict parsing).
//!
//! YAML is the native format; `.json` files are accepted as well so configs
//! exported from other tooling load unchanged. Either way the result is
//! validated before it is returned: a config that loads is a config that
//! may serve traffic.

pub mod schema;

use std::fs;
use std::path::Path;

use pixelgate_core::error::{PixelGateError, Result};

pub use schema::{GatewayConfig, GatewaySection, ImageProcessorConfig};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PixelGateError::Config(format!("read config failed ({path}): {e}")))?;

    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        load_from_json_str(&s)
    } else {
        load_from_str(&s)
    }
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| PixelGateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_json_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_json::from_str(s)
        .map_err(|e| PixelGateError::Config(format!("invalid json: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
