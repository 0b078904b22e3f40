//! Loading rule, net, route and scenario files.

use std::path::Path;

use dsc_petrinet::{AppRoute, NetDefinition, PetriNet, RouteNetBuilder};
use serde::de::DeserializeOwned;

use crate::error::{CliError, CliResult};

/// Parse a YAML (`.yaml` / `.yml`) or JSON file.
pub fn load<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Build a net from either a net definition or an application route file.
pub fn load_net(net: Option<&Path>, route: Option<&Path>) -> CliResult<PetriNet> {
    match (net, route) {
        (Some(path), None) => Ok(load::<NetDefinition>(path)?.build()?),
        (None, Some(path)) => {
            let route: AppRoute = load(path)?;
            Ok(RouteNetBuilder::new().build(&route)?)
        }
        _ => Err(CliError::InvalidInput(
            "exactly one of --net or --route is required".into(),
        )),
    }
}
