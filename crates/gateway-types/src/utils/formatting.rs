//! String formatting utilities for logs.

/// Shortens a hex identifier for log output: the first 10 characters
/// followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}
