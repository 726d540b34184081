/// Session handlers: group chat và redpacket.
///
/// Broadcast group là best-effort qua registry — member offline không có
/// offline queue cho tin group.
use actix::prelude::*;
use uuid::Uuid;

use crate::modules::group::model::{
    GroupPersona, GroupResponse, HistoryQuery, MSG_TYPE_SYSTEM, MSG_TYPE_TEXT,
};

use super::events::{SendToAccount, SendToAccounts};
use super::message::ServerFrame;
use super::session::{WebSocketSession, mailbox_err, push_frame, require_owned};

impl WebSocketSession {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn handle_create_group(
        &mut self,
        wx_account: String,
        group_name: String,
        group_avatar: Option<String>,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
        invite_accounts: Vec<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "create_online_group", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let persona = GroupPersona { character_name, character_avatar, character_desc };
            let group =
                services.group.create(&wx_account, &group_name, group_avatar, persona).await?;

            push_frame(&tx, &ServerFrame::OnlineGroupCreated { group: group.clone() });

            // invite chỉ push cho người đang online, không persist
            for invitee in invite_accounts {
                if invitee == wx_account {
                    continue;
                }
                server
                    .send(SendToAccount {
                        account: invitee,
                        frame: ServerFrame::GroupInvite {
                            group: group.clone(),
                            inviter_wx_account: wx_account.clone(),
                        },
                    })
                    .await
                    .map_err(mailbox_err)?;
            }

            Ok(())
        });
    }

    pub(super) fn handle_invite_to_group(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        invitee_wx_account: String,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "invite_to_group", async move {
            require_owned(&server, session_id, &wx_account).await?;
            services.group.require_member(&group_id, &wx_account).await?;

            let group = services.group.require_group(&group_id).await?;
            server
                .send(SendToAccount {
                    account: invitee_wx_account,
                    frame: ServerFrame::GroupInvite {
                        group: GroupResponse::from(group),
                        inviter_wx_account: wx_account,
                    },
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_join_group(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "join_online_group", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let persona = GroupPersona { character_name, character_avatar, character_desc };
            let (group, member) = services.group.join(&group_id, &wx_account, persona).await?;

            let members = services.group.members(&group_id, &wx_account).await?;
            let accounts: Vec<String> = members.iter().map(|m| m.wx_account.clone()).collect();

            push_frame(
                &tx,
                &ServerFrame::OnlineGroupJoined { group: GroupResponse::from(group), members },
            );

            // báo các member còn lại về người mới vào
            server
                .send(SendToAccounts {
                    accounts,
                    frame: ServerFrame::GroupMemberJoined { group_id, member: member.into() },
                    skip_account: Some(wx_account),
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_get_groups(&mut self, wx_account: String, ctx: &mut Context<Self>) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "get_online_groups", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let groups = services.group.groups_for(&wx_account).await?;
            push_frame(&tx, &ServerFrame::OnlineGroupsList { groups });
            Ok(())
        });
    }

    pub(super) fn handle_get_group_messages(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        since: Option<i64>,
        limit: Option<i64>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "get_group_messages", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let query = match (since, limit) {
                (Some(since), _) => HistoryQuery::Since(since),
                (None, Some(limit)) => HistoryQuery::Recent(limit),
                (None, None) => HistoryQuery::All,
            };

            let messages = services.group.history(&group_id, &wx_account, query).await?;
            push_frame(&tx, &ServerFrame::GroupMessages { group_id, messages });
            Ok(())
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn handle_send_group_message(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        sender_type: String,
        sender_name: Option<String>,
        character_name: Option<String>,
        content: String,
        msg_type: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "send_group_message", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let message = services
                .group
                .send_message(
                    &group_id,
                    &wx_account,
                    &sender_type,
                    sender_name,
                    character_name,
                    content,
                    msg_type.unwrap_or_else(|| MSG_TYPE_TEXT.to_string()),
                )
                .await?;

            // persist xong mới broadcast; gửi cả cho sender như một ack
            let accounts = services.group.member_accounts(&group_id).await?;
            server
                .send(SendToAccounts {
                    accounts,
                    frame: ServerFrame::GroupMessage { message },
                    skip_account: None,
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_get_group_members(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "get_group_members", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let members = services.group.members(&group_id, &wx_account).await?;
            push_frame(&tx, &ServerFrame::GroupMembers { group_id, members });
            Ok(())
        });
    }

    pub(super) fn handle_update_group_character(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        character_name: Option<String>,
        character_avatar: Option<String>,
        character_desc: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let session_id = self.id;

        self.run_handler(ctx, "update_group_character", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let persona = GroupPersona { character_name, character_avatar, character_desc };
            let member = services.group.update_persona(&group_id, &wx_account, persona).await?;

            // chỉ ack cho caller; client khác refresh ở lần tương tác sau
            push_frame(
                &tx,
                &ServerFrame::GroupCharacterUpdated { group_id, member: member.into() },
            );
            Ok(())
        });
    }

    /// Typing indicator: broadcast cho member trừ sender, không persist,
    /// mất frame chấp nhận được.
    pub(super) fn handle_group_typing(
        &mut self,
        group_id: Uuid,
        wx_account: String,
        start: bool,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        let tag = if start { "group_typing_start" } else { "group_typing_stop" };
        self.run_handler(ctx, tag, async move {
            require_owned(&server, session_id, &wx_account).await?;
            services.group.require_member(&group_id, &wx_account).await?;

            let accounts = services.group.member_accounts(&group_id).await?;
            let frame = if start {
                ServerFrame::GroupTypingStart { group_id, wx_account: wx_account.clone() }
            } else {
                ServerFrame::GroupTypingStop { group_id, wx_account: wx_account.clone() }
            };

            server
                .send(SendToAccounts { accounts, frame, skip_account: Some(wx_account) })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_claim_redpacket(
        &mut self,
        group_id: Uuid,
        message_id: Uuid,
        wx_account: String,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "claim_group_redpacket", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let outcome = services.redpacket.claim(&group_id, &message_id, &wx_account).await?;

            // tên hiển thị của người claim: persona trong group nếu có
            let member = services.group.require_member(&group_id, &wx_account).await?;
            let display_name =
                member.character_name.clone().unwrap_or_else(|| wx_account.clone());

            let announcement = services
                .group
                .send_message(
                    &group_id,
                    &wx_account,
                    "system",
                    Some(display_name.clone()),
                    None,
                    format!("{} claimed ¥{:.2}", display_name, outcome.amount),
                    MSG_TYPE_SYSTEM.to_string(),
                )
                .await?;

            let accounts = services.group.member_accounts(&group_id).await?;
            server
                .send(SendToAccounts {
                    accounts: accounts.clone(),
                    frame: ServerFrame::GroupMessage { message: announcement },
                    skip_account: None,
                })
                .await
                .map_err(mailbox_err)?;

            server
                .send(SendToAccounts {
                    accounts,
                    frame: ServerFrame::RedpacketClaimed {
                        group_id,
                        message_id,
                        wx_account,
                        amount: outcome.amount,
                        redpacket: outcome.content,
                    },
                    skip_account: None,
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }
}
