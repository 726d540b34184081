/// WebSocket Wire Protocol
///
/// Mọi frame là một JSON object với discriminator `type`. Tên field trên
/// wire giữ nguyên quy ước `wx_account` của client role-play.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::character::model::{CharacterBrief, CharacterResponse, SearchCharacter};
use crate::modules::friend::model::FriendRequestResponse;
use crate::modules::group::model::{GroupMemberResponse, GroupMessageResponse, GroupResponse};
use crate::modules::message::model::DirectMessage;
use crate::modules::redpacket::model::RedpacketContent;
use crate::modules::user::model::UserResponse;

/// Frame từ client đến server. `type` lạ sẽ fail deserialization —
/// handler trả frame `error`, không bao giờ drop connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Register {
        username: String,
        email: Option<String>,
        password: String,
    },

    Login {
        username: String,
        password: String,
    },

    /// Xác thực session với token đã cấp lúc register/login.
    Auth {
        token: String,
    },

    Logout,

    /// Đưa một nhân vật online trên session này.
    GoOnline {
        wx_account: String,
        nickname: String,
        avatar: Option<String>,
        bio: Option<String>,
    },

    GoOffline {
        wx_account: String,
    },

    GetOnlineCharacters,

    /// Tạo nhân vật mới và đưa online luôn trên session này.
    RegisterCharacter {
        wx_account: String,
        nickname: String,
        avatar: Option<String>,
        bio: Option<String>,
    },

    /// Tìm nhân vật theo account, không phân biệt hoa thường.
    SearchUser {
        wx_account: String,
    },

    FriendRequest {
        from_wx_account: String,
        to_wx_account: String,
        message: Option<String>,
    },

    AcceptFriendRequest {
        request_id: Uuid,
    },

    RejectFriendRequest {
        request_id: Uuid,
    },

    /// Tin nhắn 1:1. Người nhận offline thì vào offline queue.
    Message {
        from_wx_account: String,
        to_wx_account: String,
        content: String,
    },

    GetPendingRequests {
        wx_account: String,
    },

    CreateOnlineGroup {
        wx_account: String,
        group_name: String,
        group_avatar: Option<String>,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
        #[serde(default)]
        invite_accounts: Vec<String>,
    },

    InviteToGroup {
        group_id: Uuid,
        wx_account: String,
        invitee_wx_account: String,
    },

    JoinOnlineGroup {
        group_id: Uuid,
        wx_account: String,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
    },

    GetOnlineGroups {
        wx_account: String,
    },

    /// Ba chế độ đọc lịch sử: since (exclusive) > limit (N tin cuối) > full.
    GetGroupMessages {
        group_id: Uuid,
        wx_account: String,
        since: Option<i64>,
        limit: Option<i64>,
    },

    SendGroupMessage {
        group_id: Uuid,
        wx_account: String,
        sender_type: String,
        sender_name: Option<String>,
        character_name: Option<String>,
        content: String,
        msg_type: Option<String>,
    },

    GetGroupMembers {
        group_id: Uuid,
        wx_account: String,
    },

    UpdateGroupCharacter {
        group_id: Uuid,
        wx_account: String,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
    },

    GroupTypingStart {
        group_id: Uuid,
        wx_account: String,
    },

    GroupTypingStop {
        group_id: Uuid,
        wx_account: String,
    },

    ClaimGroupRedpacket {
        group_id: Uuid,
        message_id: Uuid,
        wx_account: String,
    },

    /// Ping mức ứng dụng — reset liveness flag, server trả `pong`.
    Ping,
}

/// Frame từ server đến client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    RegisterSuccess {
        token: String,
        user: UserResponse,
    },

    LoginSuccess {
        token: String,
        user: UserResponse,
    },

    AuthSuccess {
        user: UserResponse,
    },

    AuthFailed {
        reason: String,
    },

    CharacterOnline {
        character: CharacterResponse,
    },

    CharacterOffline {
        wx_account: String,
    },

    OnlineCharacters {
        characters: Vec<SearchCharacter>,
    },

    SearchResult {
        found: bool,
        character: Option<SearchCharacter>,
    },

    /// Push friend request đến người nhận (online hoặc lúc bring-online).
    FriendRequest {
        request: FriendRequestResponse,
    },

    FriendRequestAccepted {
        request_id: Uuid,
        friend: Option<CharacterBrief>,
    },

    PendingFriendRequests {
        requests: Vec<FriendRequestResponse>,
    },

    Message {
        message: DirectMessage,
    },

    OnlineGroupCreated {
        group: GroupResponse,
    },

    GroupInvite {
        group: GroupResponse,
        inviter_wx_account: String,
    },

    GroupMemberJoined {
        group_id: Uuid,
        member: GroupMemberResponse,
    },

    OnlineGroupJoined {
        group: GroupResponse,
        members: Vec<GroupMemberResponse>,
    },

    OnlineGroupsList {
        groups: Vec<GroupResponse>,
    },

    GroupMessages {
        group_id: Uuid,
        messages: Vec<GroupMessageResponse>,
    },

    GroupMessage {
        message: GroupMessageResponse,
    },

    GroupMembers {
        group_id: Uuid,
        members: Vec<GroupMemberResponse>,
    },

    GroupCharacterUpdated {
        group_id: Uuid,
        member: GroupMemberResponse,
    },

    GroupTypingStart {
        group_id: Uuid,
        wx_account: String,
    },

    GroupTypingStop {
        group_id: Uuid,
        wx_account: String,
    },

    RedpacketClaimed {
        group_id: Uuid,
        message_id: Uuid,
        wx_account: String,
        amount: f64,
        redpacket: RedpacketContent,
    },

    Error {
        message: String,
    },

    Pong,
}

impl ClientFrame {
    /// Tag của frame, dùng cho log khi handler lỗi.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ClientFrame::Register { .. } => "register",
            ClientFrame::Login { .. } => "login",
            ClientFrame::Auth { .. } => "auth",
            ClientFrame::Logout => "logout",
            ClientFrame::GoOnline { .. } => "go_online",
            ClientFrame::GoOffline { .. } => "go_offline",
            ClientFrame::GetOnlineCharacters => "get_online_characters",
            ClientFrame::RegisterCharacter { .. } => "register_character",
            ClientFrame::SearchUser { .. } => "search_user",
            ClientFrame::FriendRequest { .. } => "friend_request",
            ClientFrame::AcceptFriendRequest { .. } => "accept_friend_request",
            ClientFrame::RejectFriendRequest { .. } => "reject_friend_request",
            ClientFrame::Message { .. } => "message",
            ClientFrame::GetPendingRequests { .. } => "get_pending_requests",
            ClientFrame::CreateOnlineGroup { .. } => "create_online_group",
            ClientFrame::InviteToGroup { .. } => "invite_to_group",
            ClientFrame::JoinOnlineGroup { .. } => "join_online_group",
            ClientFrame::GetOnlineGroups { .. } => "get_online_groups",
            ClientFrame::GetGroupMessages { .. } => "get_group_messages",
            ClientFrame::SendGroupMessage { .. } => "send_group_message",
            ClientFrame::GetGroupMembers { .. } => "get_group_members",
            ClientFrame::UpdateGroupCharacter { .. } => "update_group_character",
            ClientFrame::GroupTypingStart { .. } => "group_typing_start",
            ClientFrame::GroupTypingStop { .. } => "group_typing_stop",
            ClientFrame::ClaimGroupRedpacket { .. } => "claim_group_redpacket",
            ClientFrame::Ping => "ping",
        }
    }
}

/// Message đẩy xuống client qua mpsc channel của session:
/// frame JSON hoặc ping mức transport cho heartbeat.
#[derive(Debug)]
pub enum Outbound {
    Frame(String),
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_frames_parse_by_type_tag() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"go_online","wx_account":"a_wx","nickname":"Alice"}"#,
        )
        .unwrap();
        assert!(matches!(
            frame,
            ClientFrame::GoOnline { ref wx_account, ref nickname, avatar: None, bio: None }
                if wx_account == "a_wx" && nickname == "Alice"
        ));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"search_user","wx_account":"A_WX"}"#).unwrap();
        assert_eq!(frame.type_tag(), "search_user");

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Ping));
    }

    #[test]
    fn unknown_type_fails_parse() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"no_such_frame"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"no_type":true}"#).is_err());
    }

    #[test]
    fn outbound_frames_carry_snake_case_type() {
        let json = serde_json::to_string(&ServerFrame::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let json = serde_json::to_string(&ServerFrame::AuthFailed {
            reason: "Invalid or expired token".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"auth_failed""#));

        let json = serde_json::to_string(&ServerFrame::CharacterOffline {
            wx_account: "a_wx".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"character_offline""#));
        assert!(json.contains(r#""wx_account":"a_wx""#));
    }

    #[test]
    fn group_message_defaults() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{
                "type": "send_group_message",
                "group_id": "018f3a0e-7c1d-7b4a-9a2f-111111111111",
                "wx_account": "a_wx",
                "sender_type": "character",
                "character_name": "Knight",
                "content": "hello"
            }"#,
        )
        .unwrap();
        let ClientFrame::SendGroupMessage { msg_type, sender_name, .. } = frame else {
            panic!("wrong variant");
        };
        assert_eq!(msg_type, None);
        assert_eq!(sender_name, None);
    }
}
