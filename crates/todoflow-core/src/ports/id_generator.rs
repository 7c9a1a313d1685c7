//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::MessageId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
///
/// # ULID の特性
/// - 時刻でソート可能
/// - 分散環境で生成可能（調整不要）
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// 汎用のユニーク文字列（呼び出し側が TodoId に使うなど）
    fn generate(&self) -> String;

    /// Outbox message ID を生成
    fn generate_message_id(&self) -> MessageId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate(&self) -> String {
        self.next_ulid().to_string().to_lowercase()
    }

    fn generate_message_id(&self) -> MessageId {
        MessageId::from(self.next_ulid())
    }
}
