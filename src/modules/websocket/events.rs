/// WebSocket Actor Events
///
/// Messages trao đổi giữa Session actors và HubServer actor. Mỗi thao tác
/// trên PresenceRegistry là một message — mailbox của HubServer chính là
/// critical section, không lock nào bị giữ qua I/O.
use actix::prelude::*;
use uuid::Uuid;

use super::message::ServerFrame;
use super::session::WebSocketSession;

/// Event: session mới connect (attach vào registry).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: Uuid,
    pub addr: Addr<WebSocketSession>,
}

/// Event: session disconnect — detach toàn bộ account nó giữ,
/// persist is_online = 0 cho từng account.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: Uuid,
}

/// Event: session đã auth, gắn user vào entry của session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct BindUser {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// Event: gắn account vào session (go_online / restore).
/// Trả về false nếu session đã detach — caller phải bỏ cuộc.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct ClaimAccount {
    pub session_id: Uuid,
    pub account: String,
}

/// Event: gỡ account khỏi session (go_offline).
/// Trả về false nếu session không thực sự giữ account.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct ReleaseAccount {
    pub session_id: Uuid,
    pub account: String,
}

/// Event: gỡ toàn bộ account của session, giữ session attach (logout).
/// Trả về danh sách account vừa gỡ để caller persist offline.
#[derive(Message)]
#[rtype(result = "Vec<String>")]
pub struct ReleaseAll {
    pub session_id: Uuid,
}

/// Event: session này có đang giữ account không?
#[derive(Message)]
#[rtype(result = "bool")]
pub struct OwnsAccount {
    pub session_id: Uuid,
    pub account: String,
}

/// Event: danh sách account session đang giữ.
#[derive(Message)]
#[rtype(result = "Vec<String>")]
pub struct OwnedAccounts {
    pub session_id: Uuid,
}

/// Event: account có đang reachable không (theo registry, không theo DB).
#[derive(Message)]
#[rtype(result = "bool")]
pub struct IsAccountOnline {
    pub account: String,
}

/// Event: toàn bộ account đang online.
#[derive(Message)]
#[rtype(result = "Vec<String>")]
pub struct OnlineAccounts;

/// Event: push một frame tới session đang giữ account.
/// Trả về true nếu account online và frame đã được chuyển cho session.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct SendToAccount {
    pub account: String,
    pub frame: ServerFrame,
}

/// Event: push một frame tới nhiều account (broadcast group, typing).
/// Best-effort: account offline bị bỏ qua. Trả về số session đã nhận.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct SendToAccounts {
    pub accounts: Vec<String>,
    pub frame: ServerFrame,
    /// Không gửi cho account này (ví dụ: sender của typing indicator).
    pub skip_account: Option<String>,
}

/// Thống kê cho health endpoint.
#[derive(MessageResponse)]
pub struct HubStats {
    pub connections: usize,
    pub online_accounts: usize,
}

#[derive(Message)]
#[rtype(result = "HubStats")]
pub struct GetStats;

/// ServerFrame gửi thẳng tới session actor để đẩy xuống client.
impl Message for ServerFrame {
    type Result = ();
}
