//! Session id extraction from the page route.
//!
//! Mix pages live at `/mixes/:id`; the id segment is the opaque session id
//! the connection binds to.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

const MIX_ROUTE_PREFIX: &str = "mixes";

/// Return the session id from a path such as `/mixes/3f2a.../`.
///
/// Query strings and fragments are ignored. Returns `None` for any other
/// route or an empty id.
#[must_use]
pub fn session_id_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    if segments.next()? != MIX_ROUTE_PREFIX {
        return None;
    }
    let id = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    Some(id)
}

/// Path of the mix page for `session_id`.
#[must_use]
pub fn mix_path(session_id: &str) -> String {
    format!("/{MIX_ROUTE_PREFIX}/{session_id}")
}
