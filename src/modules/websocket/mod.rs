/// WebSocket Module
///
/// Toàn bộ surface real-time của hub đi qua module này:
///
/// - Wire protocol (ClientFrame & ServerFrame, tagged theo `type`)
/// - PresenceRegistry (index hai chiều account ↔ session)
/// - HubServer actor (sở hữu registry, route push theo account)
/// - WebSocketSession actor (mỗi connection một actor, dispatch tuần tự)
/// - HTTP handler (upgrade HTTP thành WebSocket)
pub mod direct;
pub mod events;
pub mod groups;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
