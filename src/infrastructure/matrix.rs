//! # Matrix Transport Adapter
//!
//! Implements the `ChatTransport` trait on top of the `matrix_sdk` client
//! and translates raw sync events into the closed `InboundEvent` set at
//! this boundary, so the core never sees protocol types.
//!
//! Room-level probes are notices addressed to the bot's own nickname; the
//! sync echo of such a notice is the probe response. If the server stopped
//! considering us a room member, the echo never arrives and the presence
//! monitor rejoins.

use crate::domain::traits::{ChatTransport, InboundEvent};
use async_trait::async_trait;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::events::room::member::{
    MembershipState, StrippedRoomMemberEvent, SyncRoomMemberEvent,
};
use matrix_sdk::ruma::events::room::message::{
    MessageType, RoomMessageEventContent, SyncRoomMessageEvent,
};
use matrix_sdk::ruma::OwnedRoomId;
use matrix_sdk::Client;
use tokio::sync::mpsc;

const PROBE_MARKER: &str = "presence-probe";
const PING_COMMAND: &str = "!ping";

pub struct MatrixTransport {
    client: Client,
    room_id: OwnedRoomId,
    nickname: String,
}

impl MatrixTransport {
    pub fn new(client: Client, room_id: OwnedRoomId, nickname: String) -> Self {
        Self {
            client,
            room_id,
            nickname,
        }
    }

    fn room(&self) -> Result<Room, String> {
        self.client
            .get_room(&self.room_id)
            .ok_or_else(|| format!("room {} not present in client state", self.room_id))
    }

    async fn send_notice(&self, body: String) -> Result<(), String> {
        self.room()?
            .send(RoomMessageEventContent::notice_plain(body))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Register sync handlers that translate raw events into `InboundEvent`s
    /// on the given channel. Only traffic for the configured room is kept.
    pub fn install_handlers(&self, tx: mpsc::Sender<InboundEvent>) {
        let tx_messages = tx.clone();
        let nickname = self.nickname.clone();
        let room_id = self.room_id.clone();
        self.client
            .add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
                let tx = tx_messages.clone();
                let nickname = nickname.clone();
                let room_id = room_id.clone();
                async move {
                    if room.room_id() != room_id {
                        return;
                    }
                    let Some(original) = ev.as_original() else {
                        return;
                    };
                    let body = match &original.content.msgtype {
                        MessageType::Text(text) => text.body.as_str(),
                        MessageType::Notice(notice) => notice.body.as_str(),
                        _ => return,
                    };
                    let from_self = original.sender == room.own_user_id();
                    let event = classify_inbound(
                        body,
                        original.sender.as_str(),
                        from_self,
                        &nickname,
                        original.event_id.as_str(),
                    );
                    if let Some(event) = event {
                        let _ = tx.send(event).await;
                    }
                }
            });

        let tx_members = tx.clone();
        let room_id = self.room_id.clone();
        self.client
            .add_event_handler(move |ev: SyncRoomMemberEvent, room: Room| {
                let tx = tx_members.clone();
                let room_id = room_id.clone();
                async move {
                    if room.room_id() != room_id {
                        return;
                    }
                    let Some(original) = ev.as_original() else {
                        return;
                    };
                    if original.state_key.as_str() != room.own_user_id().as_str() {
                        return;
                    }
                    match original.content.membership {
                        MembershipState::Leave | MembershipState::Ban => {
                            let _ = tx
                                .send(InboundEvent::MembershipError {
                                    from: original.sender.to_string(),
                                })
                                .await;
                        }
                        _ => {}
                    }
                }
            });

        // Accept invites back into the announcement room.
        let room_id = self.room_id.clone();
        self.client
            .add_event_handler(move |ev: StrippedRoomMemberEvent, room: Room| {
                let room_id = room_id.clone();
                async move {
                    if ev.content.membership == MembershipState::Invite
                        && room.room_id() == room_id
                    {
                        let _ = room.join().await;
                    }
                }
            });
    }
}

#[async_trait]
impl ChatTransport for MatrixTransport {
    async fn send_announcement(&self, text: &str) -> Result<(), String> {
        tracing::info!(room = %self.room_id, "Posting announcement");
        self.room()?
            .send(RoomMessageEventContent::text_markdown(text))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn send_probe(&self, correlation: &str) -> Result<(), String> {
        self.send_notice(format!("{}: {} {}", self.nickname, PROBE_MARKER, correlation))
            .await
    }

    async fn send_affirmative(&self, correlation: &str, to: &str) -> Result<(), String> {
        self.send_notice(format!("{to}: pong ({correlation})")).await
    }

    async fn send_unavailable(&self, to: &str, correlation: &str) -> Result<(), String> {
        self.send_notice(format!("{to}: service unavailable ({correlation})"))
            .await
    }

    async fn join_room(&self) -> Result<(), String> {
        self.client
            .join_room_by_id(&self.room_id)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn keepalive(&self) -> Result<(), String> {
        self.client
            .whoami()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Decide once, at the boundary, what kind of inbound event a message is.
fn classify_inbound(
    body: &str,
    sender: &str,
    from_self: bool,
    nickname: &str,
    event_id: &str,
) -> Option<InboundEvent> {
    if from_self {
        // Only our probe echoes are interesting; our announcements are not.
        let marker = format!("{nickname}: {PROBE_MARKER} ");
        return body.strip_prefix(&marker).map(|id| InboundEvent::LivenessResponse {
            correlation: id.trim().to_string(),
        });
    }

    let trimmed = body.trim();
    if trimmed == PING_COMMAND || trimmed.starts_with(&format!("{PING_COMMAND} ")) {
        return Some(InboundEvent::LivenessRequest {
            correlation: event_id.to_string(),
            from: sender.to_string(),
        });
    }
    if trimmed.starts_with('!') {
        return Some(InboundEvent::GenericRequest {
            correlation: event_id.to_string(),
            from: sender.to_string(),
        });
    }

    Some(InboundEvent::RoomMessage {
        from: sender.to_string(),
        body: body.to_string(),
    })
}
