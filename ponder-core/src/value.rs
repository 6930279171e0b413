/// JSON value passed to callbacks and carried by stream metadata.
pub type Value = serde_json::Value;
