/// Presence Registry
///
/// Index hai chiều giữa session và character account — nguồn sự thật duy
/// nhất cho câu hỏi "account này đang reachable không?". Cờ `is_online`
/// trong DB chỉ là trạng thái persisted cuối cùng, không bao giờ được dùng
/// để route.
///
/// Registry không tự lock: nó được sở hữu độc quyền bởi HubServer actor,
/// mailbox của actor chính là critical section. Không một thao tác nào ở
/// đây chạm I/O.
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct SessionEntry {
    pub user_id: Option<Uuid>,
    pub owned: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    by_session: HashMap<Uuid, SessionEntry>,
    by_account: HashMap<String, Uuid>,
}

/// Kết quả claim một account cho session.
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimResult {
    Claimed,
    /// Account đang gắn với session khác của cùng user — session mới
    /// chiếm quyền, binding cũ bị gỡ trong cùng một critical section.
    TakenOver { from_session: Uuid },
    /// Session chưa attach (đã disconnect) — từ chối để handler đang bay
    /// không thể hồi sinh presence sau detach.
    SessionGone,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: attach một session mới với entry rỗng.
    pub fn attach(&mut self, session_id: Uuid) {
        self.by_session.entry(session_id).or_default();
    }

    pub fn bind_user(&mut self, session_id: Uuid, user_id: Uuid) {
        if let Some(entry) = self.by_session.get_mut(&session_id) {
            entry.user_id = Some(user_id);
        }
    }

    pub fn user_of(&self, session_id: &Uuid) -> Option<Uuid> {
        self.by_session.get(session_id).and_then(|e| e.user_id)
    }

    /// Gắn account vào session. Nếu account đang thuộc session khác thì
    /// gỡ binding cũ và cài binding mới — nguyên tử vì cùng một lần gọi.
    pub fn claim(&mut self, session_id: Uuid, account: &str) -> ClaimResult {
        if !self.by_session.contains_key(&session_id) {
            return ClaimResult::SessionGone;
        }

        let displaced = match self.by_account.get(account) {
            Some(&old_session) if old_session != session_id => {
                if let Some(old_entry) = self.by_session.get_mut(&old_session) {
                    old_entry.owned.remove(account);
                }
                Some(old_session)
            }
            _ => None,
        };

        self.by_account.insert(account.to_string(), session_id);
        if let Some(entry) = self.by_session.get_mut(&session_id) {
            entry.owned.insert(account.to_string());
        }

        match displaced {
            Some(from_session) => ClaimResult::TakenOver { from_session },
            None => ClaimResult::Claimed,
        }
    }

    /// Gỡ account khỏi session. Trả về true nếu session thật sự đang giữ nó.
    pub fn release(&mut self, session_id: Uuid, account: &str) -> bool {
        let owned = self
            .by_session
            .get_mut(&session_id)
            .is_some_and(|entry| entry.owned.remove(account));
        if owned {
            self.by_account.remove(account);
        }
        owned
    }

    /// Gỡ toàn bộ account của session nhưng giữ session attach (logout).
    pub fn release_all(&mut self, session_id: Uuid) -> Vec<String> {
        let Some(entry) = self.by_session.get_mut(&session_id) else {
            return vec![];
        };
        entry.user_id = None;
        let accounts: Vec<String> = entry.owned.drain().collect();
        for account in &accounts {
            self.by_account.remove(account);
        }
        accounts
    }

    /// Disconnect: gỡ session và mọi account nó giữ.
    pub fn detach(&mut self, session_id: Uuid) -> Vec<String> {
        let Some(entry) = self.by_session.remove(&session_id) else {
            return vec![];
        };
        let accounts: Vec<String> = entry.owned.into_iter().collect();
        for account in &accounts {
            self.by_account.remove(account);
        }
        accounts
    }

    pub fn session_for(&self, account: &str) -> Option<Uuid> {
        self.by_account.get(account).copied()
    }

    pub fn owns(&self, session_id: &Uuid, account: &str) -> bool {
        self.by_session.get(session_id).is_some_and(|e| e.owned.contains(account))
    }

    pub fn owned_accounts(&self, session_id: &Uuid) -> Vec<String> {
        self.by_session
            .get(session_id)
            .map(|e| e.owned.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn online_accounts(&self) -> Vec<String> {
        self.by_account.keys().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.by_session.len()
    }

    pub fn online_account_count(&self) -> usize {
        self.by_account.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    /// Invariant §bijection: by_account[a] = s ⇔ a ∈ by_session[s].owned.
    fn assert_bijection(reg: &PresenceRegistry) {
        for (account, session) in &reg.by_account {
            let entry = reg.by_session.get(session).expect("dangling by_account entry");
            assert!(entry.owned.contains(account), "{account} not in owned set of {session}");
        }
        for (session, entry) in &reg.by_session {
            for account in &entry.owned {
                assert_eq!(
                    reg.by_account.get(account),
                    Some(session),
                    "{account} owned by {session} but routed elsewhere"
                );
            }
        }
    }

    #[test]
    fn claim_and_release_roundtrip() {
        let mut reg = PresenceRegistry::new();
        let s1 = Uuid::now_v7();
        reg.attach(s1);

        assert_eq!(reg.claim(s1, "a_wx"), ClaimResult::Claimed);
        assert_eq!(reg.session_for("a_wx"), Some(s1));
        assert!(reg.owns(&s1, "a_wx"));
        assert_bijection(&reg);

        assert!(reg.release(s1, "a_wx"));
        assert_eq!(reg.session_for("a_wx"), None);
        assert!(!reg.release(s1, "a_wx"));
        assert_bijection(&reg);
    }

    #[test]
    fn handoff_moves_binding_atomically() {
        // S6: account online trên s1, session s2 của cùng user claim lại
        let mut reg = PresenceRegistry::new();
        let (s1, s2) = (Uuid::now_v7(), Uuid::now_v7());
        reg.attach(s1);
        reg.attach(s2);

        assert_eq!(reg.claim(s1, "a_wx"), ClaimResult::Claimed);
        assert_eq!(reg.claim(s2, "a_wx"), ClaimResult::TakenOver { from_session: s1 });

        // routing giờ chỉ về s2, s1 không còn giữ account
        assert_eq!(reg.session_for("a_wx"), Some(s2));
        assert!(!reg.owns(&s1, "a_wx"));
        assert!(reg.owns(&s2, "a_wx"));
        assert_bijection(&reg);
    }

    #[test]
    fn detached_session_cannot_reclaim() {
        let mut reg = PresenceRegistry::new();
        let s1 = Uuid::now_v7();
        reg.attach(s1);
        reg.claim(s1, "a_wx");

        let dropped = reg.detach(s1);
        assert_eq!(dropped, vec!["a_wx".to_string()]);

        // handler đang bay không thể hồi sinh presence
        assert_eq!(reg.claim(s1, "a_wx"), ClaimResult::SessionGone);
        assert_eq!(reg.session_for("a_wx"), None);
        assert_bijection(&reg);
    }

    #[test]
    fn release_all_keeps_session_attached() {
        let mut reg = PresenceRegistry::new();
        let s1 = Uuid::now_v7();
        reg.attach(s1);
        reg.bind_user(s1, Uuid::now_v7());
        reg.claim(s1, "a_wx");
        reg.claim(s1, "b_wx");

        let mut released = reg.release_all(s1);
        released.sort();
        assert_eq!(released, vec!["a_wx".to_string(), "b_wx".to_string()]);
        assert_eq!(reg.user_of(&s1), None);
        assert_eq!(reg.session_count(), 1);

        // vẫn attach nên claim lại được
        assert_eq!(reg.claim(s1, "a_wx"), ClaimResult::Claimed);
        assert_bijection(&reg);
    }

    #[test]
    fn bijection_holds_under_random_operations() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut reg = PresenceRegistry::new();

        let sessions: Vec<Uuid> = (0..8).map(|_| Uuid::now_v7()).collect();
        let accounts: Vec<String> = (0..12).map(|i| format!("acc_{i}")).collect();

        for _ in 0..2000 {
            let session = sessions[rng.gen_range(0..sessions.len())];
            let account = &accounts[rng.gen_range(0..accounts.len())];

            match rng.gen_range(0..6) {
                0 => reg.attach(session),
                1 => {
                    reg.claim(session, account);
                }
                2 => {
                    reg.release(session, account);
                }
                3 => {
                    reg.detach(session);
                }
                4 => {
                    reg.release_all(session);
                }
                _ => {
                    // query không được đổi state
                    let before = reg.online_account_count();
                    let _ = reg.session_for(account);
                    let _ = reg.owned_accounts(&session);
                    assert_eq!(reg.online_account_count(), before);
                }
            }

            assert_bijection(&reg);
        }
    }
}
