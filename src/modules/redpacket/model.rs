use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::api::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedpacketType {
    Lucky,
    Average,
}

/// State của một redpacket, nằm trong cột `content` của group message
/// (msg_type = "redpacket"). Key JSON giữ nguyên camelCase của client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedpacketContent {
    pub total_amount: f64,
    pub count: u32,
    pub redpacket_type: RedpacketType,
    #[serde(default)]
    pub claimed: Vec<String>,
    #[serde(default)]
    pub claimed_amounts: HashMap<String, f64>,
}

/// Số tiền nhỏ nhất một lượt claim có thể nhận.
const MIN_CLAIM: f64 = 0.01;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl RedpacketContent {
    pub fn new(total_amount: f64, count: u32, redpacket_type: RedpacketType) -> Self {
        RedpacketContent {
            total_amount,
            count,
            redpacket_type,
            claimed: Vec::new(),
            claimed_amounts: HashMap::new(),
        }
    }

    pub fn remaining_count(&self) -> u32 {
        self.count.saturating_sub(self.claimed.len() as u32)
    }

    pub fn claimed_total(&self) -> f64 {
        self.claimed_amounts.values().sum()
    }

    pub fn remaining_amount(&self) -> f64 {
        round2(self.total_amount - self.claimed_total())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_count() == 0
    }

    /// Một lượt claim. Caller phải serialize các lượt trên cùng một message
    /// (xem RedpacketService) — hàm này chỉ là phần tính toán thuần.
    pub fn claim(
        &mut self,
        account: &str,
        rng: &mut impl Rng,
    ) -> Result<f64, error::SystemError> {
        if self.claimed.iter().any(|a| a == account) {
            return Err(error::SystemError::AlreadyClaimed);
        }

        let remaining_count = self.remaining_count();
        if remaining_count == 0 {
            return Err(error::SystemError::Exhausted);
        }

        let remaining_amount = self.remaining_amount();

        let amount = match self.redpacket_type {
            RedpacketType::Average => {
                if remaining_count == 1 {
                    remaining_amount
                } else {
                    round2(remaining_amount / remaining_count as f64)
                }
            }
            RedpacketType::Lucky => {
                if remaining_count == 1 {
                    // người cuối lấy nốt phần còn lại
                    remaining_amount
                } else {
                    // chừa tối thiểu 0.01 cho mỗi lượt còn lại
                    let max_draw = remaining_amount - (remaining_count - 1) as f64 * MIN_CLAIM;
                    if max_draw <= MIN_CLAIM {
                        MIN_CLAIM
                    } else {
                        let draw = rng.gen_range(MIN_CLAIM..=max_draw);
                        round2((draw * 0.8).clamp(MIN_CLAIM, max_draw))
                    }
                }
            }
        };

        if !(amount > 0.0 && amount <= remaining_amount) {
            return Err(error::SystemError::inconsistent("Redpacket state is corrupt"));
        }

        self.claimed.push(account.to_string());
        self.claimed_amounts.insert(account.to_string(), amount);

        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_invariants(packet: &RedpacketContent) {
        assert!(packet.claimed.len() as u32 <= packet.count);
        assert!(packet.claimed_total() <= packet.total_amount + 1e-9);
        // mỗi account xuất hiện tối đa một lần
        let mut accounts = packet.claimed.clone();
        accounts.sort();
        accounts.dedup();
        assert_eq!(accounts.len(), packet.claimed.len());
    }

    #[test]
    fn lucky_three_way_conservation() {
        // S5: 3 suất lucky, 1.00 tổng — ba lượt đều thành công,
        // tổng nằm trong [0.97, 1.00], lượt thứ tư bị Exhausted.
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut packet = RedpacketContent::new(1.00, 3, RedpacketType::Lucky);

            for account in ["a_wx", "b_wx", "c_wx"] {
                let amount = packet.claim(account, &mut rng).unwrap();
                assert!(amount >= MIN_CLAIM - 1e-9, "seed {seed}: amount {amount}");
                assert_invariants(&packet);
            }

            assert!(packet.is_exhausted());
            let total = packet.claimed_total();
            assert!(total <= 1.00 + 1e-9, "seed {seed}: total {total}");
            assert!(total >= 0.97 - 1e-9, "seed {seed}: total {total}");

            let err = packet.claim("d_wx", &mut rng).unwrap_err();
            assert!(matches!(err, error::SystemError::Exhausted));
        }
    }

    #[test]
    fn average_conserves_exactly_at_closure() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut packet = RedpacketContent::new(10.00, 3, RedpacketType::Average);

        let a = packet.claim("a_wx", &mut rng).unwrap();
        let b = packet.claim("b_wx", &mut rng).unwrap();
        let c = packet.claim("c_wx", &mut rng).unwrap();

        assert!((a - 3.33).abs() < 1e-9);
        assert!((b - 3.34).abs() < 0.02);
        // người cuối lấy nốt: tổng khớp tuyệt đối sau làm tròn 2 chữ số
        assert!((a + b + c - 10.00).abs() < 1e-9, "{a} + {b} + {c}");
    }

    #[test]
    fn duplicate_claim_fails_deterministically() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut packet = RedpacketContent::new(5.00, 5, RedpacketType::Lucky);

        packet.claim("a_wx", &mut rng).unwrap();
        let err = packet.claim("a_wx", &mut rng).unwrap_err();
        assert!(matches!(err, error::SystemError::AlreadyClaimed));
        assert_eq!(packet.claimed.len(), 1);
    }

    #[test]
    fn random_claim_sequences_hold_invariants() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let count = rng.gen_range(1..=8u32);
            let total = f64::from(rng.gen_range(10..=1000u32)) / 10.0;
            let kind =
                if rng.r#gen::<bool>() { RedpacketType::Lucky } else { RedpacketType::Average };
            let mut packet = RedpacketContent::new(total, count, kind);

            let mut successes = 0u32;
            for i in 0..20 {
                // lặp lại account để ép trường hợp double-claim
                let account = format!("acc_{}", i % 10);
                match packet.claim(&account, &mut rng) {
                    Ok(amount) => {
                        successes += 1;
                        assert!(amount > 0.0);
                    }
                    Err(error::SystemError::AlreadyClaimed)
                    | Err(error::SystemError::Exhausted) => {}
                    Err(e) => panic!("seed {seed}: unexpected error {e:?}"),
                }
                assert_invariants(&packet);
            }

            assert_eq!(successes, packet.claimed.len() as u32);
            if packet.is_exhausted() {
                // bảo toàn tại thời điểm đóng, dung sai làm tròn 0.01/lượt
                let tolerance = 0.01 * f64::from(count);
                assert!(
                    (packet.claimed_total() - total).abs() <= tolerance + 1e-9,
                    "seed {seed}: {} vs {}",
                    packet.claimed_total(),
                    total
                );
            }
        }
    }

    #[test]
    fn content_json_roundtrip_uses_camel_case() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut packet = RedpacketContent::new(2.00, 2, RedpacketType::Lucky);
        packet.claim("a_wx", &mut rng).unwrap();

        let json = serde_json::to_string(&packet).unwrap();
        assert!(json.contains("\"totalAmount\""));
        assert!(json.contains("\"redpacketType\":\"lucky\""));
        assert!(json.contains("\"claimedAmounts\""));

        let parsed: RedpacketContent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.claimed, packet.claimed);
        assert_eq!(parsed.remaining_count(), 1);
    }
}
