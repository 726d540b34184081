/// Session handlers: friend graph và tin nhắn 1:1.
///
/// Mọi handler chạy qua `run_handler` (tuần tự trong session, lỗi thành
/// frame `error`). Ownership của wx_account luôn được kiểm qua registry,
/// không bao giờ qua cờ DB.
use actix::prelude::*;
use uuid::Uuid;

use crate::modules::friend::model::FriendRequestResponse;

use super::events::{OwnedAccounts, SendToAccount};
use super::message::ServerFrame;
use super::session::{WebSocketSession, mailbox_err, push_frame, require_owned};

impl WebSocketSession {
    pub(super) fn handle_friend_request(
        &mut self,
        from_wx_account: String,
        to_wx_account: String,
        message: Option<String>,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "friend_request", async move {
            require_owned(&server, session_id, &from_wx_account).await?;

            let request = services
                .friend
                .send_request(&from_wx_account, &to_wx_account, message)
                .await?;

            // push ngay nếu người nhận online; offline thì request nằm chờ
            // tới lần bring-online kế tiếp (deliver_pending)
            let from_character = services
                .character
                .find_by_account(&from_wx_account)
                .await?
                .map(Into::into);
            let to_account = request.to_account.clone();
            server
                .send(SendToAccount {
                    account: to_account,
                    frame: ServerFrame::FriendRequest {
                        request: FriendRequestResponse::from_entity(request, from_character),
                    },
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_accept_friend_request(
        &mut self,
        request_id: Uuid,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "accept_friend_request", async move {
            let owned =
                server.send(OwnedAccounts { session_id }).await.map_err(mailbox_err)?;

            let accepted = services.friend.accept_request(&request_id, &owned).await?;

            // cả hai phía nhận event accepted kèm profile rút gọn phía bên kia
            server
                .send(SendToAccount {
                    account: accepted.request.to_account.clone(),
                    frame: ServerFrame::FriendRequestAccepted {
                        request_id,
                        friend: accepted.from_character,
                    },
                })
                .await
                .map_err(mailbox_err)?;

            server
                .send(SendToAccount {
                    account: accepted.request.from_account.clone(),
                    frame: ServerFrame::FriendRequestAccepted {
                        request_id,
                        friend: accepted.to_character,
                    },
                })
                .await
                .map_err(mailbox_err)?;

            Ok(())
        });
    }

    pub(super) fn handle_reject_friend_request(
        &mut self,
        request_id: Uuid,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "reject_friend_request", async move {
            let owned =
                server.send(OwnedAccounts { session_id }).await.map_err(mailbox_err)?;

            // reject không thông báo cho người gửi
            services.friend.reject_request(&request_id, &owned).await?;
            Ok(())
        });
    }

    pub(super) fn handle_get_pending_requests(
        &mut self,
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

        self.run_handler(ctx, "get_pending_requests", async move {
            require_owned(&server, session_id, &wx_account).await?;

            let requests = services.friend.pending_for(&wx_account).await?;
            push_frame(&tx, &ServerFrame::PendingFriendRequests { requests });
            Ok(())
        });
    }

    /// Tin nhắn 1:1: push nếu người nhận trong registry, ngược lại persist
    /// vào offline queue — at-least-once, client phải chịu được duplicate.
    pub(super) fn handle_direct_message(
        &mut self,
        from_wx_account: String,
        to_wx_account: String,
        content: String,
        ctx: &mut Context<Self>,
    ) {
        let Some(_) = self.require_user() else {
            return;
        };

        let services = self.services.clone();
        let server = self.server.clone();
        let session_id = self.id;

        self.run_handler(ctx, "message", async move {
            require_owned(&server, session_id, &from_wx_account).await?;

            let message =
                services.dm.outgoing(&from_wx_account, &to_wx_account, &content).await?;

            let delivered = server
                .send(SendToAccount {
                    account: to_wx_account,
                    frame: ServerFrame::Message { message: message.clone() },
                })
                .await
                .map_err(mailbox_err)?;

            if !delivered {
                services.dm.queue(&message).await?;
            }

            Ok(())
        });
    }
}
