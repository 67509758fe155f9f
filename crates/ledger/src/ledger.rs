//! SQLite-backed ledger store and operations

use crate::error::LedgerError;
use crate::referral::ReferralLink;
use crate::task::{TaskRecord, TaskState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use taskbot_core::{Amount, NodeId, UserId};

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Referral commission as a fraction of the task price, in [0, 1]
    pub commission_rate: Decimal,
    /// Fixed bonus credited to a referred user on registration
    pub signup_bonus: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(10, 2), // 0.10
            signup_bonus: Amount::new_unchecked(Decimal::ONE),
        }
    }
}

/// Why a balance was credited (audit column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CreditReason {
    /// Task price on approval
    TaskReward,
    /// One-shot referrer commission
    ReferralCommission,
    /// Fixed bonus for being referred
    SignupBonus,
    /// Operator-issued signed adjustment
    Adjustment,
}

/// One audited balance mutation
#[derive(Debug, Clone)]
pub struct CreditEntry {
    pub id: String,
    pub user: UserId,
    /// Signed delta; negative for debits
    pub delta: Decimal,
    pub reason: CreditReason,
    pub created_at: DateTime<Utc>,
}

/// Referrer commission paid out with an approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commission {
    pub referrer: UserId,
    pub amount: Amount,
}

/// Result of an approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveOutcome {
    /// First approval: reward credited, commission possibly paid
    Approved {
        reward: Amount,
        commission: Option<Commission>,
    },
    /// The record was already approved; nothing was credited
    AlreadyApproved,
}

/// The ledger: balances, tasks, and referrals over one SQLite pool
pub struct Ledger {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger on an existing pool and initialize the schema
    pub async fn new(pool: SqlitePool, config: LedgerConfig) -> Result<Self, LedgerError> {
        let ledger = Self { pool, config };
        ledger.init().await?;
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing)
    pub async fn in_memory(config: LedgerConfig) -> Result<Self, LedgerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool, config).await
    }

    /// Get the configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn init(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balances (
                user_id INTEGER PRIMARY KEY,
                balance TEXT NOT NULL DEFAULT '0',
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                user_id INTEGER NOT NULL,
                node_id INTEGER NOT NULL,
                state TEXT NOT NULL,
                proof TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, node_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS referrals (
                referred_id INTEGER PRIMARY KEY,
                referrer_id INTEGER NOT NULL,
                first_bonus_paid INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credits (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                delta TEXT NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_credits_user ON credits(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // === Balances ===

    /// Balance of a user, created lazily at zero on first access
    pub async fn balance_of(&self, user: UserId) -> Result<Amount, LedgerError> {
        let mut tx = self.pool.begin().await?;
        ensure_balance_row(&mut *tx, user).await?;
        let balance = read_balance(&mut *tx, user).await?;
        tx.commit().await?;
        Ok(Amount::new_unchecked(balance))
    }

    /// Apply a signed, audited credit. Negative deltas are debits and must
    /// not drive the balance below zero.
    pub async fn credit(
        &self,
        user: UserId,
        delta: Decimal,
        reason: CreditReason,
    ) -> Result<Amount, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let new_balance = credit_in_tx(&mut *tx, user, delta, reason).await?;
        tx.commit().await?;
        Ok(Amount::new_unchecked(new_balance))
    }

    /// Audit trail for a user, oldest first
    pub async fn credits_of(&self, user: UserId) -> Result<Vec<CreditEntry>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, user_id, delta, reason, created_at FROM credits
             WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_credit).collect()
    }

    // === Tasks ===

    /// Start a task for (user, node).
    ///
    /// `price` is the node's price; priceless nodes are not tasks. Fails with
    /// `AlreadyCompleted` when any record for the pair exists, in any state.
    pub async fn start_task(
        &self,
        user: UserId,
        node: NodeId,
        price: Option<Amount>,
    ) -> Result<TaskRecord, LedgerError> {
        if price.is_none() {
            return Err(LedgerError::NotATask(node));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO tasks (user_id, node_id, state, proof, created_at, updated_at)
             VALUES (?, ?, ?, NULL, ?, ?)
             ON CONFLICT(user_id, node_id) DO NOTHING",
        )
        .bind(user.value())
        .bind(node.value())
        .bind(TaskState::Started.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AlreadyCompleted { user, node });
        }

        tracing::debug!(%user, %node, "task started");
        self.require_task(user, node).await
    }

    /// Submit completion proof. Requires the record to be `Started`.
    ///
    /// Notification of admins is the caller's concern; ledger state never
    /// depends on it.
    pub async fn submit_proof(
        &self,
        user: UserId,
        node: NodeId,
        proof: &str,
    ) -> Result<TaskRecord, LedgerError> {
        let result = sqlx::query(
            "UPDATE tasks SET state = ?, proof = ?, updated_at = ?
             WHERE user_id = ? AND node_id = ? AND state = ?",
        )
        .bind(TaskState::ProofSubmitted.as_str())
        .bind(proof)
        .bind(Utc::now().to_rfc3339())
        .bind(user.value())
        .bind(node.value())
        .bind(TaskState::Started.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let existing = self.task(user, node).await?;
            return match existing {
                None => Err(LedgerError::TaskNotFound { user, node }),
                Some(record) => Err(LedgerError::InvalidTransition {
                    from: record.state,
                    to: TaskState::ProofSubmitted,
                }),
            };
        }

        tracing::debug!(%user, %node, "proof submitted");
        self.require_task(user, node).await
    }

    /// Approve a task and release its credit.
    ///
    /// Accepted from `Started` or `ProofSubmitted`. Idempotent: an already
    /// approved record yields `AlreadyApproved` without any credit. On the
    /// first approval the state transition, the reward credit, and the
    /// one-shot referral commission are applied in a single transaction.
    pub async fn approve(
        &self,
        user: UserId,
        node: NodeId,
        price: Amount,
    ) -> Result<ApproveOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Guarded transition: only one concurrent approval can win this row.
        let updated = sqlx::query(
            "UPDATE tasks SET state = ?, updated_at = ?
             WHERE user_id = ? AND node_id = ? AND state IN (?, ?)",
        )
        .bind(TaskState::Approved.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(user.value())
        .bind(node.value())
        .bind(TaskState::Started.as_str())
        .bind(TaskState::ProofSubmitted.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let existing = sqlx::query("SELECT state FROM tasks WHERE user_id = ? AND node_id = ?")
                .bind(user.value())
                .bind(node.value())
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match existing {
                None => Err(LedgerError::TaskNotFound { user, node }),
                Some(_) => Ok(ApproveOutcome::AlreadyApproved),
            };
        }

        credit_in_tx(&mut *tx, user, price.value(), CreditReason::TaskReward).await?;

        // One-shot referral commission on the user's first approved task.
        let commission = {
            let link = sqlx::query(
                "SELECT referrer_id FROM referrals
                 WHERE referred_id = ? AND first_bonus_paid = 0",
            )
            .bind(user.value())
            .fetch_optional(&mut *tx)
            .await?;

            match link {
                Some(row) => {
                    let flagged = sqlx::query(
                        "UPDATE referrals SET first_bonus_paid = 1
                         WHERE referred_id = ? AND first_bonus_paid = 0",
                    )
                    .bind(user.value())
                    .execute(&mut *tx)
                    .await?;

                    if flagged.rows_affected() == 1 {
                        let referrer = UserId(row.get::<i64, _>("referrer_id"));
                        let amount = price.apply_rate(self.config.commission_rate)?;
                        credit_in_tx(&mut *tx, referrer, amount.value(), CreditReason::ReferralCommission)
                            .await?;
                        Some(Commission { referrer, amount })
                    } else {
                        None
                    }
                }
                None => None,
            }
        };

        tx.commit().await?;

        tracing::info!(%user, %node, reward = %price, "task approved");
        Ok(ApproveOutcome::Approved {
            reward: price,
            commission,
        })
    }

    /// Look up a task record
    pub async fn task(&self, user: UserId, node: NodeId) -> Result<Option<TaskRecord>, LedgerError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE user_id = ? AND node_id = ?")
            .bind(user.value())
            .bind(node.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_task).transpose()
    }

    async fn require_task(&self, user: UserId, node: NodeId) -> Result<TaskRecord, LedgerError> {
        self.task(user, node)
            .await?
            .ok_or(LedgerError::TaskNotFound { user, node })
    }

    // === Referrals ===

    /// Register a referral link.
    ///
    /// Returns false (no-op, nothing credited) when the referred user already
    /// has a link or refers themselves. On success the fixed signup bonus is
    /// credited to the referred user in the same transaction.
    pub async fn register_referral(
        &self,
        referrer: UserId,
        referred: UserId,
    ) -> Result<bool, LedgerError> {
        if referrer == referred {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO referrals (referred_id, referrer_id, first_bonus_paid, created_at)
             VALUES (?, ?, 0, ?)
             ON CONFLICT(referred_id) DO NOTHING",
        )
        .bind(referred.value())
        .bind(referrer.value())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let bonus = self.config.signup_bonus;
        if !bonus.is_zero() {
            credit_in_tx(&mut *tx, referred, bonus.value(), CreditReason::SignupBonus).await?;
        }

        tx.commit().await?;
        tracing::info!(%referrer, %referred, "referral registered");
        Ok(true)
    }

    /// Pure referrer lookup
    pub async fn referrer_of(&self, referred: UserId) -> Result<Option<UserId>, LedgerError> {
        Ok(self
            .referral_of(referred)
            .await?
            .map(|link| link.referrer))
    }

    /// Full referral link lookup
    pub async fn referral_of(&self, referred: UserId) -> Result<Option<ReferralLink>, LedgerError> {
        let row = sqlx::query("SELECT * FROM referrals WHERE referred_id = ?")
            .bind(referred.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| ReferralLink {
            referred: UserId(r.get::<i64, _>("referred_id")),
            referrer: UserId(r.get::<i64, _>("referrer_id")),
            first_bonus_paid: r.get::<i64, _>("first_bonus_paid") != 0,
            created_at: parse_timestamp(r.get("created_at")),
        }))
    }

    /// Flip the first-bonus flag. Returns false if no unpaid link existed.
    pub async fn mark_first_bonus_paid(&self, referred: UserId) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            "UPDATE referrals SET first_bonus_paid = 1
             WHERE referred_id = ? AND first_bonus_paid = 0",
        )
        .bind(referred.value())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    // === Audience ===

    /// Every user the ledger has ever seen (broadcast audience)
    pub async fn known_users(&self) -> Result<Vec<UserId>, LedgerError> {
        let rows = sqlx::query(
            "SELECT user_id FROM balances
             UNION SELECT user_id FROM tasks
             UNION SELECT referred_id FROM referrals
             UNION SELECT referrer_id FROM referrals
             ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserId(r.get::<i64, _>(0)))
            .collect())
    }
}

// === Row helpers ===

async fn ensure_balance_row(tx: &mut SqliteConnection, user: UserId) -> Result<(), LedgerError> {
    sqlx::query("INSERT OR IGNORE INTO balances (user_id, balance, updated_at) VALUES (?, '0', ?)")
        .bind(user.value())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
    Ok(())
}

async fn read_balance(tx: &mut SqliteConnection, user: UserId) -> Result<Decimal, LedgerError> {
    let row = sqlx::query("SELECT balance FROM balances WHERE user_id = ?")
        .bind(user.value())
        .fetch_one(&mut *tx)
        .await?;
    let balance: String = row.get("balance");
    Ok(Decimal::from_str(&balance).unwrap_or(Decimal::ZERO))
}

/// Apply one signed credit inside an open transaction: upsert the balance
/// and append the audit row.
async fn credit_in_tx(
    tx: &mut SqliteConnection,
    user: UserId,
    delta: Decimal,
    reason: CreditReason,
) -> Result<Decimal, LedgerError> {
    ensure_balance_row(tx, user).await?;
    let balance = read_balance(tx, user).await?;

    let new_balance = balance + delta;
    if new_balance < Decimal::ZERO {
        return Err(LedgerError::WouldGoNegative {
            user,
            balance,
            delta,
        });
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE balances SET balance = ?, updated_at = ? WHERE user_id = ?")
        .bind(new_balance.to_string())
        .bind(&now)
        .bind(user.value())
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO credits (id, user_id, delta, reason, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user.value())
        .bind(delta.to_string())
        .bind(reason.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    tracing::debug!(%user, %delta, reason = %reason, "balance credited");
    Ok(new_balance)
}

fn row_to_task(row: SqliteRow) -> Result<TaskRecord, LedgerError> {
    let state: String = row.get("state");
    let state = TaskState::from_str(&state).unwrap_or(TaskState::Started);

    Ok(TaskRecord {
        user: UserId(row.get::<i64, _>("user_id")),
        node: NodeId(row.get::<i64, _>("node_id")),
        state,
        proof: row.get("proof"),
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    })
}

fn row_to_credit(row: SqliteRow) -> Result<CreditEntry, LedgerError> {
    let reason: String = row.get("reason");
    let reason = CreditReason::from_str(&reason).unwrap_or(CreditReason::Adjustment);
    let delta: String = row.get("delta");

    Ok(CreditEntry {
        id: row.get("id"),
        user: UserId(row.get::<i64, _>("user_id")),
        delta: Decimal::from_str(&delta).unwrap_or(Decimal::ZERO),
        reason,
        created_at: parse_timestamp(row.get("created_at")),
    })
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const USER: UserId = UserId(100);
    const REFERRER: UserId = UserId(200);
    const NODE: NodeId = NodeId(1);

    async fn ledger() -> Ledger {
        Ledger::in_memory(LedgerConfig::default()).await.unwrap()
    }

    fn price(value: Decimal) -> Option<Amount> {
        Some(Amount::new(value).unwrap())
    }

    #[tokio::test]
    async fn test_balance_lazy_zero() {
        let ledger = ledger().await;
        assert_eq!(ledger.balance_of(USER).await.unwrap(), Amount::ZERO);
        // The user is now known
        assert!(ledger.known_users().await.unwrap().contains(&USER));
    }

    #[tokio::test]
    async fn test_credit_is_signed_and_audited() {
        let ledger = ledger().await;
        ledger.credit(USER, dec!(10), CreditReason::Adjustment).await.unwrap();
        let after = ledger.credit(USER, dec!(-4), CreditReason::Adjustment).await.unwrap();
        assert_eq!(after.value(), dec!(6));

        let audit = ledger.credits_of(USER).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].delta, dec!(-4));
    }

    #[tokio::test]
    async fn test_credit_never_goes_negative() {
        let ledger = ledger().await;
        let result = ledger.credit(USER, dec!(-1), CreditReason::Adjustment).await;
        assert!(matches!(result, Err(LedgerError::WouldGoNegative { .. })));
        assert_eq!(ledger.balance_of(USER).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_start_task_requires_price() {
        let ledger = ledger().await;
        let result = ledger.start_task(USER, NODE, None).await;
        assert!(matches!(result, Err(LedgerError::NotATask(NODE))));
    }

    #[tokio::test]
    async fn test_start_task_twice_rejected() {
        let ledger = ledger().await;
        ledger.start_task(USER, NODE, price(dec!(5))).await.unwrap();
        let again = ledger.start_task(USER, NODE, price(dec!(5))).await;
        assert!(matches!(again, Err(LedgerError::AlreadyCompleted { .. })));
    }

    #[tokio::test]
    async fn test_submit_proof_requires_started() {
        let ledger = ledger().await;

        let missing = ledger.submit_proof(USER, NODE, "file-1").await;
        assert!(matches!(missing, Err(LedgerError::TaskNotFound { .. })));

        ledger.start_task(USER, NODE, price(dec!(5))).await.unwrap();
        let record = ledger.submit_proof(USER, NODE, "file-1").await.unwrap();
        assert_eq!(record.state, TaskState::ProofSubmitted);
        assert_eq!(record.proof.as_deref(), Some("file-1"));

        let again = ledger.submit_proof(USER, NODE, "file-2").await;
        assert!(matches!(
            again,
            Err(LedgerError::InvalidTransition {
                from: TaskState::ProofSubmitted,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_approve_from_started_without_proof() {
        // Trusted-approver: submit_proof is not a precondition
        let ledger = ledger().await;
        ledger.start_task(USER, NODE, price(dec!(5))).await.unwrap();

        let outcome = ledger.approve(USER, NODE, Amount::new(dec!(5)).unwrap()).await.unwrap();
        assert!(matches!(outcome, ApproveOutcome::Approved { .. }));
        assert_eq!(ledger.balance_of(USER).await.unwrap().value(), dec!(5));
    }

    #[tokio::test]
    async fn test_approve_is_idempotent() {
        let ledger = ledger().await;
        ledger.start_task(USER, NODE, price(dec!(5))).await.unwrap();
        ledger.submit_proof(USER, NODE, "file-1").await.unwrap();

        let amount = Amount::new(dec!(5)).unwrap();
        ledger.approve(USER, NODE, amount).await.unwrap();
        let second = ledger.approve(USER, NODE, amount).await.unwrap();
        assert_eq!(second, ApproveOutcome::AlreadyApproved);

        // Exactly one credit
        assert_eq!(ledger.balance_of(USER).await.unwrap().value(), dec!(5));
        let rewards: Vec<_> = ledger
            .credits_of(USER)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.reason == CreditReason::TaskReward)
            .collect();
        assert_eq!(rewards.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_missing_task() {
        let ledger = ledger().await;
        let result = ledger.approve(USER, NODE, Amount::new(dec!(5)).unwrap()).await;
        assert!(matches!(result, Err(LedgerError::TaskNotFound { .. })));
    }

    #[tokio::test]
    async fn test_first_approval_pays_commission_once() {
        let ledger = ledger().await;
        assert!(ledger.register_referral(REFERRER, USER).await.unwrap());
        let referrer_start = ledger.balance_of(REFERRER).await.unwrap();

        // First approved task: commission fires
        ledger.start_task(USER, NODE, price(dec!(5.00))).await.unwrap();
        let outcome = ledger
            .approve(USER, NODE, Amount::new(dec!(5.00)).unwrap())
            .await
            .unwrap();
        match outcome {
            ApproveOutcome::Approved { commission, .. } => {
                let commission = commission.unwrap();
                assert_eq!(commission.referrer, REFERRER);
                assert_eq!(commission.amount.value(), dec!(0.5000));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Second task on a different node: no further commission
        let node2 = NodeId(2);
        ledger.start_task(USER, node2, price(dec!(7))).await.unwrap();
        let outcome = ledger
            .approve(USER, node2, Amount::new(dec!(7)).unwrap())
            .await
            .unwrap();
        match outcome {
            ApproveOutcome::Approved { commission, .. } => assert!(commission.is_none()),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let referrer_end = ledger.balance_of(REFERRER).await.unwrap();
        assert_eq!(
            referrer_end.value() - referrer_start.value(),
            dec!(0.5000)
        );
        assert!(ledger.referral_of(USER).await.unwrap().unwrap().first_bonus_paid);
    }

    #[tokio::test]
    async fn test_self_referral_rejected() {
        let ledger = ledger().await;
        assert!(!ledger.register_referral(USER, USER).await.unwrap());
        assert_eq!(ledger.balance_of(USER).await.unwrap(), Amount::ZERO);
        assert!(ledger.referrer_of(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_referral_link_is_immutable() {
        let ledger = ledger().await;
        assert!(ledger.register_referral(REFERRER, USER).await.unwrap());
        // A second registration, even from another referrer, is a no-op
        assert!(!ledger.register_referral(UserId(300), USER).await.unwrap());
        assert_eq!(ledger.referrer_of(USER).await.unwrap(), Some(REFERRER));

        // Signup bonus was credited exactly once
        let bonus: Vec<_> = ledger
            .credits_of(USER)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.reason == CreditReason::SignupBonus)
            .collect();
        assert_eq!(bonus.len(), 1);
    }

    #[tokio::test]
    async fn test_audit_replay_matches_balance() {
        let ledger = ledger().await;
        ledger.register_referral(REFERRER, USER).await.unwrap();
        ledger.start_task(USER, NODE, price(dec!(5.00))).await.unwrap();
        ledger.approve(USER, NODE, Amount::new(dec!(5.00)).unwrap()).await.unwrap();

        for user in [USER, REFERRER] {
            let replayed: Decimal = ledger
                .credits_of(user)
                .await
                .unwrap()
                .iter()
                .map(|c| c.delta)
                .sum();
            assert_eq!(replayed, ledger.balance_of(user).await.unwrap().value());
        }
    }

    #[tokio::test]
    async fn test_mark_first_bonus_paid_is_one_shot() {
        let ledger = ledger().await;
        ledger.register_referral(REFERRER, USER).await.unwrap();
        assert!(ledger.mark_first_bonus_paid(USER).await.unwrap());
        assert!(!ledger.mark_first_bonus_paid(USER).await.unwrap());
    }
}
