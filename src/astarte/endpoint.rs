//! Endpoint paths as declared by interface mappings (`/a/%{param}/c`) and as
//! used when querying or sending device data (`/a/b/c`).

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("missing value for endpoint parameter `{0}`")]
    MissingParameter(String),

    #[error("invalid value for endpoint parameter `{0}`")]
    InvalidParameter(String),
}

/// Splits an endpoint into its segments. The root endpoint (`/` or `""`)
/// has no segments.
pub fn segments(endpoint: &str) -> Vec<&str> {
    endpoint
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

pub fn is_parametric(segment: &str) -> bool {
    segment.len() > 3 && segment.starts_with("%{") && segment.ends_with('}')
}

fn parameter_name(segment: &str) -> Option<&str> {
    is_parametric(segment).then(|| &segment[2..segment.len() - 1])
}

/// Names of the parametric segments of an endpoint, in path order.
pub fn parameters(endpoint: &str) -> Vec<&str> {
    segments(endpoint)
        .into_iter()
        .filter_map(parameter_name)
        .collect()
}

/// Whether a concrete `path` is covered by the mapping endpoint `pattern`.
pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern = segments(pattern);
    let path = segments(path);

    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(expected, actual)| is_parametric(expected) || expected == actual)
}

/// Replaces every `%{name}` segment of `pattern` with its value.
pub fn substitute(
    pattern: &str,
    values: &HashMap<String, String>,
) -> Result<String, EndpointError> {
    let mut path = String::new();

    for segment in segments(pattern) {
        let segment = match parameter_name(segment) {
            Some(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| EndpointError::MissingParameter(name.to_string()))?;
                if value.is_empty() || value.contains('/') {
                    return Err(EndpointError::InvalidParameter(name.to_string()));
                }
                value.as_str()
            }
            None => segment,
        };
        path = join(&path, segment);
    }

    Ok(path)
}

pub fn join(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}
