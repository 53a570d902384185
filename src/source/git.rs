//! Git ref parsing: turns a user-authored URL into the `host-and-path`
//! remote the `git://` identifier scheme wants, accepting both scp-like
//! SSH shorthand and `ssh://`/`http(s)://` forms.

use crate::error::{EngineResult, Error};

/// Parses `url` into the bare `host[:port]/path` remote used to build a
/// `git://<remote>#<commit>` identifier. The original `url` is kept
/// verbatim by the caller for the `git.fullurl` attribute.
pub fn parse_remote(url: &str) -> EngineResult<String> {
    if let Some(rest) = url.strip_prefix("ssh://") {
        return Ok(rest.trim_end_matches('/').to_string());
    }
    if let Some(rest) = url.strip_prefix("https://") {
        return Ok(rest.trim_end_matches('/').to_string());
    }
    if let Some(rest) = url.strip_prefix("http://") {
        return Ok(rest.trim_end_matches('/').to_string());
    }

    // scp-like shorthand: [user@]host[:port]:path
    let after_user = url.split_once('@').map(|(_, rest)| rest).unwrap_or(url);
    let parts: Vec<&str> = after_user.splitn(3, ':').collect();
    match parts.as_slice() {
        [host, path] if !host.is_empty() && !path.is_empty() => Ok(format!("{host}/{path}")),
        [host, port, path] if !host.is_empty() && !port.is_empty() && !path.is_empty() => {
            Ok(format!("{host}:{port}/{path}"))
        }
        _ => Err(Error::InvalidGitRef {
            url: url.to_string(),
        }),
    }
}
