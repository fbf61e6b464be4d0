//! Dropping privileges after the listener is bound.

use nix::unistd::{setgid, setuid, Group, Uid, User};

/// Switch to `group` then `user`. Failures are logged and startup continues.
///
/// The group goes first: once the user is switched the process can no
/// longer change its group.
pub fn drop_privileges(user: Option<&str>, group: Option<&str>) {
    if let Some(name) = group {
        match Group::from_name(name) {
            Ok(Some(group)) => match setgid(group.gid) {
                Ok(()) => tracing::info!(group = name, "Switched group"),
                Err(e) => tracing::error!(group = name, error = %e, "Set gid failed"),
            },
            Ok(None) => tracing::error!(group = name, "Unknown group"),
            Err(e) => tracing::error!(group = name, error = %e, "Group lookup failed"),
        }
    }

    if let Some(name) = user {
        match User::from_name(name) {
            Ok(Some(user)) => match setuid(user.uid) {
                Ok(()) => tracing::info!(user = name, "Switched user"),
                Err(e) => tracing::error!(user = name, error = %e, "Set uid failed"),
            },
            Ok(None) => tracing::error!(user = name, "Unknown user"),
            Err(e) => tracing::error!(user = name, error = %e, "User lookup failed"),
        }
    }

    if Uid::current().is_root() {
        tracing::warn!("Running as root user, it's dangerous");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_are_logged_not_fatal() {
        let before = (Uid::effective(), nix::unistd::Gid::effective());
        drop_privileges(Some("memserve-no-such-user"), Some("memserve-no-such-group"));
        assert_eq!((Uid::effective(), nix::unistd::Gid::effective()), before);
    }

    #[test]
    fn nothing_configured_is_a_no_op() {
        let before = Uid::effective();
        drop_privileges(None, None);
        assert_eq!(Uid::effective(), before);
    }
}
