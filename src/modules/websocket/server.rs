/// Hub Server Actor
///
/// Actor trung tâm sở hữu PresenceRegistry và map session_id → Addr.
/// Mọi mutation/query registry đi qua mailbox nên tự serialize; riêng
/// trường hợp handoff (account online trên session khác của cùng user)
/// được xử lý trong một lần handle duy nhất: gỡ binding cũ + cài binding
/// mới + báo session cũ, nguyên tử với nhau.
use actix::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::modules::character::repository::CharacterRepository;
use crate::modules::character::repository_pg::CharacterRepositoryPg;
use crate::utils::now_ms;

use super::events::*;
use super::message::ServerFrame;
use super::registry::{ClaimResult, PresenceRegistry};
use super::session::WebSocketSession;

pub struct HubServer {
    sessions: HashMap<Uuid, Addr<WebSocketSession>>,
    registry: PresenceRegistry,
    /// Repo để persist is_online = 0 khi session disconnect; việc ghi DB
    /// được spawn ra ngoài, không bao giờ await trong handler của actor.
    character_repo: CharacterRepositoryPg,
}

impl HubServer {
    pub fn new(character_repo: CharacterRepositoryPg) -> Self {
        Self { sessions: HashMap::new(), registry: PresenceRegistry::new(), character_repo }
    }

    fn send_to_session(&self, session_id: &Uuid, frame: ServerFrame) {
        if let Some(addr) = self.sessions.get(session_id) {
            addr.do_send(frame);
        }
    }

    fn persist_offline(&self, accounts: Vec<String>) {
        if accounts.is_empty() {
            return;
        }
        let repo = self.character_repo.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = repo.set_offline_many(&accounts, now_ms()).await {
                tracing::error!("Không thể persist offline cho {:?}: {}", accounts, e);
            }
        });
    }
}

impl Actor for HubServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Hub server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Hub server stopped");
    }
}

impl Handler<Connect> for HubServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        tracing::debug!("Session {} connected", msg.id);
        self.sessions.insert(msg.id, msg.addr);
        self.registry.attach(msg.id);
    }
}

impl Handler<Disconnect> for HubServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.id);
        let accounts = self.registry.detach(msg.id);
        tracing::debug!("Session {} disconnected, released {} account(s)", msg.id, accounts.len());
        self.persist_offline(accounts);
    }
}

impl Handler<BindUser> for HubServer {
    type Result = ();

    fn handle(&mut self, msg: BindUser, _: &mut Context<Self>) {
        self.registry.bind_user(msg.session_id, msg.user_id);
    }
}

impl Handler<ClaimAccount> for HubServer {
    type Result = bool;

    fn handle(&mut self, msg: ClaimAccount, _: &mut Context<Self>) -> Self::Result {
        match self.registry.claim(msg.session_id, &msg.account) {
            ClaimResult::Claimed => true,
            ClaimResult::TakenOver { from_session } => {
                // handoff: session cũ được báo để client cũ cập nhật UI.
                // Ownership đã kiểm ở DB nên hai session phải thuộc cùng user.
                if self.registry.user_of(&msg.session_id) != self.registry.user_of(&from_session)
                {
                    tracing::warn!(
                        "Handoff {} giữa hai session khác user ({} → {})",
                        msg.account,
                        from_session,
                        msg.session_id
                    );
                }
                tracing::info!(
                    "Account {} handed over from session {} to {}",
                    msg.account,
                    from_session,
                    msg.session_id
                );
                self.send_to_session(
                    &from_session,
                    ServerFrame::CharacterOffline { wx_account: msg.account },
                );
                true
            }
            ClaimResult::SessionGone => {
                tracing::warn!(
                    "Session {} claimed {} after detach, refused",
                    msg.session_id,
                    msg.account
                );
                false
            }
        }
    }
}

impl Handler<ReleaseAccount> for HubServer {
    type Result = bool;

    fn handle(&mut self, msg: ReleaseAccount, _: &mut Context<Self>) -> Self::Result {
        self.registry.release(msg.session_id, &msg.account)
    }
}

impl Handler<ReleaseAll> for HubServer {
    type Result = Vec<String>;

    fn handle(&mut self, msg: ReleaseAll, _: &mut Context<Self>) -> Self::Result {
        self.registry.release_all(msg.session_id)
    }
}

impl Handler<OwnsAccount> for HubServer {
    type Result = bool;

    fn handle(&mut self, msg: OwnsAccount, _: &mut Context<Self>) -> Self::Result {
        self.registry.owns(&msg.session_id, &msg.account)
    }
}

impl Handler<OwnedAccounts> for HubServer {
    type Result = Vec<String>;

    fn handle(&mut self, msg: OwnedAccounts, _: &mut Context<Self>) -> Self::Result {
        self.registry.owned_accounts(&msg.session_id)
    }
}

impl Handler<IsAccountOnline> for HubServer {
    type Result = bool;

    fn handle(&mut self, msg: IsAccountOnline, _: &mut Context<Self>) -> Self::Result {
        self.registry.session_for(&msg.account).is_some()
    }
}

impl Handler<OnlineAccounts> for HubServer {
    type Result = Vec<String>;

    fn handle(&mut self, _: OnlineAccounts, _: &mut Context<Self>) -> Self::Result {
        self.registry.online_accounts()
    }
}

impl Handler<SendToAccount> for HubServer {
    type Result = bool;

    fn handle(&mut self, msg: SendToAccount, _: &mut Context<Self>) -> Self::Result {
        match self.registry.session_for(&msg.account) {
            Some(session_id) => {
                self.send_to_session(&session_id, msg.frame);
                true
            }
            None => false,
        }
    }
}

impl Handler<SendToAccounts> for HubServer {
    type Result = usize;

    fn handle(&mut self, msg: SendToAccounts, _: &mut Context<Self>) -> Self::Result {
        let mut sent = 0;
        for account in &msg.accounts {
            if msg.skip_account.as_deref() == Some(account.as_str()) {
                continue;
            }
            if let Some(session_id) = self.registry.session_for(account) {
                self.send_to_session(&session_id, msg.frame.clone());
                sent += 1;
            }
        }
        tracing::debug!("Broadcast tới {}/{} account", sent, msg.accounts.len());
        sent
    }
}

impl Handler<GetStats> for HubServer {
    type Result = HubStats;

    fn handle(&mut self, _: GetStats, _: &mut Context<Self>) -> Self::Result {
        HubStats {
            connections: self.registry.session_count(),
            online_accounts: self.registry.online_account_count(),
        }
    }
}
