//! Pre-commit legality checks shared by all switch families

use fabric_net_core::{ActionType, Channel, NetworkAttachment, NetworkError, Result};

/// Enforce the port invariants on a nic's committed attachments:
///
/// - at most one native attachment;
/// - tagged attachments need a native attachment first (the native VLAN is
///   what powers the port on);
/// - the native attachment cannot be detached while tagged ones remain.
///
/// `revert_port` is always legal: it tears down in a safe order by itself.
pub fn check_native_networks(
    attachments: &[NetworkAttachment],
    op: ActionType,
    channel: Option<&Channel>,
) -> Result<()> {
    if op == ActionType::RevertPort {
        return Ok(());
    }

    let channel = channel.ok_or_else(|| {
        NetworkError::bad_argument(format!("{} requires a channel", op))
    })?;

    let has_native = attachments.iter().any(|a| a.channel.is_native());
    let tagged = attachments.iter().filter(|a| !a.channel.is_native()).count();

    match (op, channel) {
        (ActionType::Connect, Channel::Native) if has_native => Err(
            NetworkError::illegal_operation("port already has a native network attached"),
        ),
        (ActionType::Connect, Channel::Tagged(_)) if !has_native => {
            Err(NetworkError::illegal_operation(
                "a native network must be attached before tagged networks",
            ))
        }
        (ActionType::Detach, Channel::Native) if tagged > 0 => {
            Err(NetworkError::illegal_operation(format!(
                "cannot detach the native network while {} tagged network(s) remain attached",
                tagged
            )))
        }
        _ => Ok(()),
    }
}
