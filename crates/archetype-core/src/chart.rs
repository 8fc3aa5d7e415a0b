//! Chart metadata written as the new chart's `Chart.yaml`

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::templates::Value;

pub const DEFAULT_DESCRIPTION: &str = "A Helm chart for Kubernetes";
pub const DEFAULT_VERSION: &str = "0.1.0";
pub const DEFAULT_APP_VERSION: &str = "0.1.0";
pub const API_VERSION: &str = "v2";
pub const CHART_TYPE: &str = "application";

/// Chart metadata
///
/// Fields are declared in key order so the serialized `Chart.yaml` matches
/// what `helm create` writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub api_version: String,
    pub app_version: String,
    pub description: String,
    pub name: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub version: String,
}

impl ChartMetadata {
    /// Build metadata for `name`, reading overrides from the `Chart` sub-tree
    /// of `values`.
    ///
    /// A `Chart` entry that is not a map, or an override that is not a
    /// string, is ignored with a warning and the default is used.
    pub fn from_values(name: &str, values: &Value) -> Self {
        let chart = match values.lookup(&["Chart"]) {
            None | Some(Value::Nil) => None,
            Some(Value::Map(map)) => Some(map),
            Some(other) => {
                warn!(
                    found = other.type_name(),
                    "Chart values are not a map, using default chart metadata"
                );
                None
            }
        };

        let field = |key: &str, default: &str| -> String {
            match chart.and_then(|c| c.get(key)) {
                None | Some(Value::Nil) => default.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    warn!(
                        key,
                        found = other.type_name(),
                        "Chart.{} is not a string, using {:?}",
                        key,
                        default
                    );
                    default.to_string()
                }
            }
        };

        Self {
            api_version: API_VERSION.to_string(),
            app_version: field("appVersion", DEFAULT_APP_VERSION),
            description: field("description", DEFAULT_DESCRIPTION),
            name: name.to_string(),
            chart_type: CHART_TYPE.to_string(),
            version: field("version", DEFAULT_VERSION),
        }
    }

    /// Serialize as `Chart.yaml` content
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
