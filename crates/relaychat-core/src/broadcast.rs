//! Broadcast routing: one sender's message to every other peer.

use bytes::BytesMut;

use relaychat_proto::Frame;

use crate::{driver::RelayAction, registry::PeerRegistry};

/// Fan a chat event out to every registered peer except the sender.
///
/// The wire payload is the sender's identity frame followed by the
/// content frame, concatenated once and refcount-shared across
/// destinations. The destination list is materialized from the registry
/// before any delivery, so removals triggered by failed sends cannot
/// invalidate an in-progress iteration.
///
/// Each destination becomes its own [`RelayAction::SendToConn`]; the
/// executor delivers them independently, so one peer's dead socket
/// never blocks delivery to the rest. Broadcast order across receivers
/// is unspecified.
#[must_use]
pub fn route(
    sender: u64,
    registry: &PeerRegistry,
    identity: &Frame,
    message: &Frame,
) -> Vec<RelayAction> {
    let mut wire = BytesMut::with_capacity(identity.wire_len() + message.wire_len());
    identity.write_to(&mut wire);
    message.write_to(&mut wire);
    let wire = wire.freeze();

    registry
        .all_except(sender)
        .map(|(conn_id, _)| RelayAction::SendToConn { conn_id, bytes: wire.clone() })
        .collect()
}
