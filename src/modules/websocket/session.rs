/// WebSocket Session Actor
///
/// Mỗi connection có một Session actor riêng. Actor giữ state auth
/// (user đã bind hay chưa) và liveness flag cho heartbeat; mọi frame của
/// một session được xử lý tuần tự bằng `ctx.wait` nên thứ tự causal theo
/// người gửi được bảo toàn — các session khác nhau vẫn chạy song song.
///
/// Heartbeat: mỗi 30s một tick. Nếu flag chưa được reset từ tick trước
/// thì terminate connection; ngược lại hạ flag và gửi ping transport.
/// Pong transport và frame `ping` mức ứng dụng đều reset flag.
use actix::prelude::*;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::character::model::{BringOnline, SearchCharacter};
use crate::modules::character::repository_pg::CharacterRepositoryPg;
use crate::modules::character::service::CharacterService;
use crate::modules::friend::repository_pg::FriendRepositoryPg;
use crate::modules::friend::service::FriendService;
use crate::modules::group::repository_pg::GroupRepositoryPg;
use crate::modules::group::service::GroupService;
use crate::modules::message::repository_pg::MessageRepositoryPg;
use crate::modules::message::service::DirectMessageService;
use crate::modules::redpacket::service::RedpacketService;
use crate::modules::user::model::{LoginModel, RegisterModel, UserResponse};
use crate::modules::user::repository_pg::UserRepositoryPg;
use crate::modules::user::service::UserService;

use super::events::*;
use super::message::{ClientFrame, Outbound, ServerFrame};
use super::server::HubServer;

/// Type alias cho các service với concrete Postgres repository.
pub type UserSvc = UserService<UserRepositoryPg>;
pub type CharacterSvc = CharacterService<CharacterRepositoryPg>;
pub type FriendSvc = FriendService<FriendRepositoryPg, CharacterRepositoryPg>;
pub type DirectMessageSvc = DirectMessageService<MessageRepositoryPg, FriendRepositoryPg>;
pub type GroupSvc = GroupService<GroupRepositoryPg, CharacterRepositoryPg>;
pub type RedpacketSvc = RedpacketService<GroupRepositoryPg>;

/// Toàn bộ service của hub, share cho mọi session qua web::Data.
pub struct Services {
    pub user: UserSvc,
    pub character: CharacterSvc,
    pub friend: FriendSvc,
    pub dm: DirectMessageSvc,
    pub group: GroupSvc,
    pub redpacket: RedpacketSvc,
}

/// Chu kỳ heartbeat: session không phản hồi trong một chu kỳ là bị terminate.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub struct WebSocketSession {
    /// Unique session ID
    pub id: Uuid,

    /// (user_id, username) sau khi register/login/auth thành công
    pub user: Option<(Uuid, String)>,

    /// Address của hub server actor
    pub server: Addr<HubServer>,

    /// Channel đẩy frame/ping tới client (bridge trong handler.rs)
    pub tx: mpsc::UnboundedSender<Outbound>,

    pub services: actix_web::web::Data<Services>,

    /// Liveness flag — hạ mỗi tick, reset bởi pong hoặc frame ping.
    pub alive: bool,
}

/// Serialize và đẩy một frame xuống client qua channel.
pub(super) fn push_frame(tx: &mpsc::UnboundedSender<Outbound>, frame: &ServerFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if let Err(e) = tx.send(Outbound::Frame(json)) {
                tracing::error!("Không thể gửi frame tới client: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("Không thể serialize ServerFrame: {}", e);
        }
    }
}

pub(super) fn mailbox_err(e: actix::MailboxError) -> error::SystemError {
    error::SystemError::Internal(Box::new(e))
}

/// Session phải đang giữ account trong Presence Registry.
pub(super) async fn require_owned(
    server: &Addr<HubServer>,
    session_id: Uuid,
    account: &str,
) -> Result<(), error::SystemError> {
    let owns = server
        .send(OwnsAccount { session_id, account: account.to_string() })
        .await
        .map_err(mailbox_err)?;
    if owns {
        Ok(())
    } else {
        Err(error::SystemError::forbidden("You do not own this character on this session"))
    }
}

/// Flush mọi delivery đang chờ cho một account vừa reachable:
/// offline message (push xong mới đánh dấu delivered — at-least-once),
/// rồi danh sách friend request pending.
pub(super) async fn deliver_pending(
    services: &Services,
    tx: &mpsc::UnboundedSender<Outbound>,
    account: &str,
) -> Result<(), error::SystemError> {
    let pending = services.dm.pending_for(account).await?;
    if !pending.is_empty() {
        let ids: Vec<Uuid> = pending.iter().map(|m| m.id).collect();
        for message in pending {
            push_frame(tx, &ServerFrame::Message { message });
        }
        services.dm.mark_delivered(&ids).await?;
    }

    let requests = services.friend.pending_for(account).await?;
    if !requests.is_empty() {
        push_frame(tx, &ServerFrame::PendingFriendRequests { requests });
    }

    Ok(())
}

impl WebSocketSession {
    pub fn new(
        server: Addr<HubServer>,
        tx: mpsc::UnboundedSender<Outbound>,
        services: actix_web::web::Data<Services>,
    ) -> Self {
        Self { id: Uuid::now_v7(), user: None, server, tx, services, alive: true }
    }

    pub(super) fn send_to_client(&self, frame: &ServerFrame) {
        push_frame(&self.tx, frame);
    }

    pub(super) fn send_error(&self, message: &str) {
        self.send_to_client(&ServerFrame::Error { message: message.to_string() });
    }

    /// Kiểm tra session đã có user chưa, trả về (user_id, username) nếu có.
    pub(super) fn require_user(&self) -> Option<(Uuid, String)> {
        if self.user.is_none() {
            self.send_error(&error::SystemError::AuthRequired.wire_message());
            tracing::warn!("Session {} chưa authenticate, từ chối request", self.id);
        }
        self.user.clone()
    }

    /// Chạy một handler async tuần tự trong session: `ctx.wait` chặn các
    /// frame sau cho tới khi handler xong. Lỗi được log kèm type tag và
    /// trả về client dưới dạng một frame `error` duy nhất — không bao giờ
    /// drop connection vì lỗi handler.
    pub(super) fn run_handler<F>(&self, ctx: &mut Context<Self>, tag: &'static str, fut: F)
    where
        F: std::future::Future<Output = Result<(), error::SystemError>> + 'static,
    {
        ctx.wait(fut.into_actor(self).map(move |res, act, _ctx| {
            if let Err(e) = res {
                tracing::error!("Handler {} lỗi (session {}): {}", tag, act.id, e);
                act.send_error(&e.wire_message());
            }
        }));
    }

    /// Dispatch: mỗi frame đúng một handler.
    fn handle_client_frame(&mut self, frame: ClientFrame, ctx: &mut Context<Self>) {
        match frame {
            ClientFrame::Register { username, email, password } => {
                self.handle_register(username, email, password, ctx);
            }
            ClientFrame::Login { username, password } => {
                self.handle_login(username, password, ctx);
            }
            ClientFrame::Auth { token } => {
                self.handle_auth(token, ctx);
            }
            ClientFrame::Logout => {
                self.handle_logout(ctx);
            }
            ClientFrame::GoOnline { wx_account, nickname, avatar, bio } => {
                self.handle_go_online(wx_account, nickname, avatar, bio, ctx);
            }
            ClientFrame::GoOffline { wx_account } => {
                self.handle_go_offline(wx_account, ctx);
            }
            ClientFrame::GetOnlineCharacters => {
                self.handle_get_online_characters(ctx);
            }
            ClientFrame::RegisterCharacter { wx_account, nickname, avatar, bio } => {
                self.handle_register_character(wx_account, nickname, avatar, bio, ctx);
            }
            ClientFrame::SearchUser { wx_account } => {
                self.handle_search_user(wx_account, ctx);
            }
            ClientFrame::FriendRequest { from_wx_account, to_wx_account, message } => {
                self.handle_friend_request(from_wx_account, to_wx_account, message, ctx);
            }
            ClientFrame::AcceptFriendRequest { request_id } => {
                self.handle_accept_friend_request(request_id, ctx);
            }
            ClientFrame::RejectFriendRequest { request_id } => {
                self.handle_reject_friend_request(request_id, ctx);
            }
            ClientFrame::Message { from_wx_account, to_wx_account, content } => {
                self.handle_direct_message(from_wx_account, to_wx_account, content, ctx);
            }
            ClientFrame::GetPendingRequests { wx_account } => {
                self.handle_get_pending_requests(wx_account, ctx);
            }
            ClientFrame::CreateOnlineGroup {
                wx_account,
                group_name,
                group_avatar,
                character_name,
                character_avatar,
                character_desc,
                invite_accounts,
            } => {
                self.handle_create_group(
                    wx_account,
                    group_name,
                    group_avatar,
                    character_name,
                    character_avatar,
                    character_desc,
                    invite_accounts,
                    ctx,
                );
            }
            ClientFrame::InviteToGroup { group_id, wx_account, invitee_wx_account } => {
                self.handle_invite_to_group(group_id, wx_account, invitee_wx_account, ctx);
            }
            ClientFrame::JoinOnlineGroup {
                group_id,
                wx_account,
                character_name,
                character_avatar,
                character_desc,
            } => {
                self.handle_join_group(
                    group_id,
                    wx_account,
                    character_name,
                    character_avatar,
                    character_desc,
                    ctx,
                );
            }
            ClientFrame::GetOnlineGroups { wx_account } => {
                self.handle_get_groups(wx_account, ctx);
            }
            ClientFrame::GetGroupMessages { group_id, wx_account, since, limit } => {
                self.handle_get_group_messages(group_id, wx_account, since, limit, ctx);
            }
            ClientFrame::SendGroupMessage {
                group_id,
                wx_account,
                sender_type,
                sender_name,
                character_name,
                content,
                msg_type,
            } => {
                self.handle_send_group_message(
                    group_id,
                    wx_account,
                    sender_type,
                    sender_name,
                    character_name,
                    content,
                    msg_type,
                    ctx,
                );
            }
            ClientFrame::GetGroupMembers { group_id, wx_account } => {
                self.handle_get_group_members(group_id, wx_account, ctx);
            }
            ClientFrame::UpdateGroupCharacter {
                group_id,
                wx_account,
                character_name,
                character_avatar,
                character_desc,
            } => {
                self.handle_update_group_character(
                    group_id,
                    wx_account,
                    character_name,
                    character_avatar,
                    character_desc,
                    ctx,
                );
            }
            ClientFrame::GroupTypingStart { group_id, wx_account } => {
                self.handle_group_typing(group_id, wx_account, true, ctx);
            }
            ClientFrame::GroupTypingStop { group_id, wx_account } => {
                self.handle_group_typing(group_id, wx_account, false, ctx);
            }
            ClientFrame::ClaimGroupRedpacket { group_id, message_id, wx_account } => {
                self.handle_claim_redpacket(group_id, message_id, wx_account, ctx);
            }
            ClientFrame::Ping => {
                // frame ping mức ứng dụng: reset liveness và trả pong
                self.alive = true;
                self.send_to_client(&ServerFrame::Pong);
            }
        }
    }

    // === Identity & presence handlers ===

    fn handle_register(
        &mut self,
        username: String,
        email: Option<String>,
        password: String,
        ctx: &mut Context<Self>,
    ) {
        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        ctx.wait(
            async move {
                let (token, user) =
                    services.user.register(RegisterModel { username, email, password }).await?;

                server
                    .send(BindUser { session_id, user_id: user.id })
                    .await
                    .map_err(mailbox_err)?;

                push_frame(&tx, &ServerFrame::RegisterSuccess { token, user: user.clone() });
                Ok::<_, error::SystemError>((user.id, user.username))
            }
            .into_actor(self)
            .map(|res, act, _ctx| match res {
                Ok(user) => act.user = Some(user),
                Err(e) => {
                    tracing::error!("Handler register lỗi (session {}): {}", act.id, e);
                    act.send_error(&e.wire_message());
                }
            }),
        );
    }

    fn handle_login(&mut self, username: String, password: String, ctx: &mut Context<Self>) {
        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        ctx.wait(
            async move {
                let (token, user) =
                    services.user.login(LoginModel { username, password }).await?;

                server
                    .send(BindUser { session_id, user_id: user.id })
                    .await
                    .map_err(mailbox_err)?;

                push_frame(&tx, &ServerFrame::LoginSuccess { token, user: user.clone() });
                Ok::<_, error::SystemError>((user.id, user.username))
            }
            .into_actor(self)
            .map(|res, act, _ctx| match res {
                Ok(user) => act.user = Some(user),
                Err(e) => {
                    tracing::error!("Handler login lỗi (session {}): {}", act.id, e);
                    act.send_error(&e.wire_message());
                }
            }),
        );
    }

    /// Auth: verify token, bind user, rồi restore — mọi nhân vật của user
    /// còn cờ is_online trong DB được gắn lại vào session này (reconnect
    /// trong suốt, kể cả handoff từ session cũ), và mọi delivery đang chờ
    /// của các nhân vật user sở hữu được flush xuống session.
    fn handle_auth(&mut self, token: String, ctx: &mut Context<Self>) {
        if self.user.is_some() {
            self.send_error("Session đã được xác thực");
            return;
        }

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        ctx.wait(
            async move {
                let user = match services.user.verify_token(&token).await {
                    Ok(user) => user,
                    Err(e) => {
                        push_frame(&tx, &ServerFrame::AuthFailed { reason: e.wire_message() });
                        return Ok::<_, error::SystemError>(None);
                    }
                };

                server
                    .send(BindUser { session_id, user_id: user.id })
                    .await
                    .map_err(mailbox_err)?;

                // restore routing cho các nhân vật còn cờ online trong DB
                let online = services.character.online_for_user(&user.id).await?;
                for character in &online {
                    server
                        .send(ClaimAccount {
                            session_id,
                            account: character.wx_account.clone(),
                        })
                        .await
                        .map_err(mailbox_err)?;
                }

                let response = UserResponse::from(user.clone());
                push_frame(&tx, &ServerFrame::AuthSuccess { user: response });

                // flush offline message + friend request pending cho mọi
                // nhân vật của user (kể cả nhân vật đã offline sạch sẽ —
                // client resume bằng token phải nhận được tin đang chờ)
                let characters = services.character.find_for_user(&user.id).await?;
                for character in characters {
                    deliver_pending(&services, &tx, &character.wx_account).await?;
                }

                Ok(Some((user.id, user.username)))
            }
            .into_actor(self)
            .map(|res, act, _ctx| match res {
                Ok(Some(user)) => act.user = Some(user),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Handler auth lỗi (session {}): {}", act.id, e);
                    act.send_error(&e.wire_message());
                }
            }),
        );
    }

    /// Logout: gỡ mọi account khỏi registry, persist offline, unbind user.
    /// Connection giữ nguyên — client có thể auth lại.
    fn handle_logout(&mut self, ctx: &mut Context<Self>) {
        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        ctx.wait(
            async move {
                let accounts =
                    server.send(ReleaseAll { session_id }).await.map_err(mailbox_err)?;
                services.character.mark_offline_many(&accounts).await?;
                Ok::<_, error::SystemError>(())
            }
            .into_actor(self)
            .map(|res, act, _ctx| match res {
                Ok(()) => act.user = None,
                Err(e) => {
                    tracing::error!("Handler logout lỗi (session {}): {}", act.id, e);
                    act.send_error(&e.wire_message());
                }
            }),
        );
    }

    fn handle_go_online(
        &mut self,
        wx_account: String,
        nickname: String,
        avatar: Option<String>,
        bio: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some((user_id, _)) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "go_online", async move {
            let entity = services
                .character
                .bring_online(&user_id, BringOnline { wx_account, nickname, avatar, bio })
                .await?;

            let account = entity.wx_account.clone();
            let claimed = server
                .send(ClaimAccount { session_id, account: account.clone() })
                .await
                .map_err(mailbox_err)?;
            if !claimed {
                // session đã detach giữa chừng — không hồi sinh presence
                return Ok(());
            }

            push_frame(&tx, &ServerFrame::CharacterOnline { character: entity.into() });

            deliver_pending(&services, &tx, &account).await
        });
    }

    fn handle_go_offline(&mut self, wx_account: String, ctx: &mut Context<Self>) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "go_offline", async move {
            let released = server
                .send(ReleaseAccount { session_id, account: wx_account.clone() })
                .await
                .map_err(mailbox_err)?;
            if !released {
                return Err(error::SystemError::forbidden(
                    "You do not own this character on this session",
                ));
            }

            services.character.bring_offline(&wx_account).await?;
            push_frame(&tx, &ServerFrame::CharacterOffline { wx_account });
            Ok(())
        });
    }

    /// Danh sách nhân vật đang online toàn hub (lobby discovery):
    /// registry là nguồn sự thật, DB chỉ hydrate profile.
    fn handle_get_online_characters(&mut self, ctx: &mut Context<Self>) {
        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();

        self.run_handler(ctx, "get_online_characters", async move {
            let accounts = server.send(OnlineAccounts).await.map_err(mailbox_err)?;
            let entities = services.character.find_by_accounts(&accounts).await?;
            let characters = entities
                .into_iter()
                .map(|e| SearchCharacter::from_entity(e, true))
                .collect();
            push_frame(&tx, &ServerFrame::OnlineCharacters { characters });
            Ok(())
        });
    }

    fn handle_register_character(
        &mut self,
        wx_account: String,
        nickname: String,
        avatar: Option<String>,
        bio: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some((user_id, _)) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "register_character", async move {
            let entity = services
                .character
                .register(&user_id, BringOnline { wx_account, nickname, avatar, bio })
                .await?;

            let claimed = server
                .send(ClaimAccount { session_id, account: entity.wx_account.clone() })
                .await
                .map_err(mailbox_err)?;
            if claimed {
                push_frame(&tx, &ServerFrame::CharacterOnline { character: entity.into() });
            }
            Ok(())
        });
    }

    fn handle_search_user(&mut self, wx_account: String, ctx: &mut Context<Self>) {
        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();

        self.run_handler(ctx, "search_user", async move {
            let Some(entity) = services.character.search(&wx_account).await? else {
                push_frame(&tx, &ServerFrame::SearchResult { found: false, character: None });
                return Ok(());
            };

            // is_online lấy từ registry, không tin cờ trong DB
            let is_online = server
                .send(IsAccountOnline { account: entity.wx_account.clone() })
                .await
                .map_err(mailbox_err)?;

            push_frame(
                &tx,
                &ServerFrame::SearchResult {
                    found: true,
                    character: Some(SearchCharacter::from_entity(entity, is_online)),
                },
            );
            Ok(())
        });
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session started: {}", self.id);

        // attach vào hub ngay khi upgrade xong
        self.server.do_send(Connect { id: self.id, addr: ctx.address() });

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if !act.alive {
                tracing::warn!("Session {} heartbeat timeout, disconnecting", act.id);
                ctx.stop();
                return;
            }
            act.alive = false;
            if act.tx.send(Outbound::Ping).is_err() {
                ctx.stop();
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session stopped: {}", self.id);
        // hub detach toàn bộ account và persist offline
        self.server.do_send(Disconnect { id: self.id });
    }
}

impl Message for ClientFrame {
    type Result = ();
}

/// Nhận ClientFrame từ handler.rs
impl Handler<ClientFrame> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientFrame, ctx: &mut Context<Self>) {
        self.handle_client_frame(msg, ctx);
    }
}

/// Nhận ServerFrame từ hub actor → serialize → đẩy xuống client
impl Handler<ServerFrame> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ServerFrame, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}

/// Pong transport từ client — reset liveness flag.
#[derive(Message)]
#[rtype(result = "()")]
pub struct PongReceived;

impl Handler<PongReceived> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, _: PongReceived, _ctx: &mut Context<Self>) {
        self.alive = true;
    }
}
