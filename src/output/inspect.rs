use serde_json::Value;

use crate::docker::EngineError;

/// One parsed JSON document from `docker inspect` / `docker network inspect`.
pub type InspectionNode = Value;

/// Parse CLI JSON output. `command` is only used in the error message.
pub fn parse_inspection(command: &str, raw: &str) -> Result<InspectionNode, EngineError> {
    serde_json::from_str(raw).map_err(|e| EngineError::malformed(command, e.to_string()))
}

/// Walk `path` through nested objects.
///
/// Returns `None` as soon as a segment is missing or the value being walked is
/// not an object. An empty path returns `node` itself.
pub fn lookup<'a>(node: &'a InspectionNode, path: &[&str]) -> Option<&'a InspectionNode> {
    path.iter()
        .try_fold(node, |current, segment| current.as_object()?.get(*segment))
}

/// [`lookup`] with a dotted path such as `"Config.Image"`.
pub fn lookup_dotted<'a>(node: &'a InspectionNode, path: &str) -> Option<&'a InspectionNode> {
    let segments: Vec<&str> = path.split('.').collect();
    lookup(node, &segments)
}

/// First element of an array node.
pub fn first_element(node: &InspectionNode) -> Option<&InspectionNode> {
    node.as_array()?.first()
}
