//! Coin ledger interface
//!
//! The hub's coin ledger lives outside the simulation core. Betting games only see
//! the narrow [`Wallet`] trait; [`LedgerWallet`] is an in-memory implementation
//! used by the headless runner, the browser facade and tests.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Starting balance for play money
pub const DEFAULT_FUN_BALANCE: f64 = 1000.0;
/// Starting balance for real-money mode
pub const DEFAULT_REAL_BALANCE: f64 = 100.0;
/// Number of transactions retained in the log
pub const MAX_TRANSACTIONS: usize = 100;

/// Which balance a stake is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    Fun,
    Real,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Fun => "FC",
            Currency::Real => "RC",
        }
    }
}

/// An immutable bet attached to a betting action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub amount: f64,
    pub currency: Currency,
}

impl Stake {
    /// Build a stake, rejecting zero, negative or non-finite amounts
    pub fn new(amount: f64, currency: Currency) -> SimResult<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SimError::InvalidConfiguration(format!(
                "bet amount must be positive, got {amount}"
            )));
        }
        Ok(Self { amount, currency })
    }
}

/// The coin ledger as seen by the games.
pub trait Wallet {
    /// True if `amount` is positive and covered by the active balance
    fn can_afford(&self, amount: f64) -> bool;

    /// Remove `amount` from the active balance. Returns false (and changes
    /// nothing) if funds are insufficient; there is no partial debit.
    fn debit(&mut self, amount: f64, reason: &str) -> bool;

    /// Add `amount` to the active balance
    fn credit(&mut self, amount: f64, reason: &str);

    /// Currency the wallet is currently operating in
    fn currency(&self) -> Currency {
        Currency::Fun
    }
}

/// Debit a stake, check-then-act: on failure nothing is mutated.
pub fn place_stake(wallet: &mut dyn Wallet, stake: &Stake, reason: &str) -> SimResult<()> {
    if !wallet.can_afford(stake.amount) || !wallet.debit(stake.amount, reason) {
        debug!("Stake of {} refused ({reason})", stake.amount);
        return Err(SimError::InsufficientFunds {
            needed: stake.amount,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// A single ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub seq: u64,
    pub kind: TransactionKind,
    pub amount: f64,
    pub currency: Currency,
    pub reason: String,
}

/// In-memory two-currency wallet with a bounded transaction log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerWallet {
    fun: f64,
    real: f64,
    mode: Currency,
    /// Newest first
    transactions: Vec<Transaction>,
    next_seq: u64,
}

impl Default for LedgerWallet {
    fn default() -> Self {
        Self {
            fun: DEFAULT_FUN_BALANCE,
            real: DEFAULT_REAL_BALANCE,
            mode: Currency::Fun,
            transactions: Vec::new(),
            next_seq: 1,
        }
    }
}

impl LedgerWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wallet with a specific play-money balance (handy for tests and demos)
    pub fn with_balance(fun: f64) -> Self {
        Self {
            fun,
            ..Self::default()
        }
    }

    /// Active balance
    pub fn balance(&self) -> f64 {
        match self.mode {
            Currency::Fun => self.fun,
            Currency::Real => self.real,
        }
    }

    pub fn balance_of(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Fun => self.fun,
            Currency::Real => self.real,
        }
    }

    pub fn set_currency(&mut self, mode: Currency) {
        self.mode = mode;
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Restore default balances and clear the log
    pub fn reset(&mut self) {
        *self = Self::default();
        info!("Wallet reset");
    }

    fn balance_mut(&mut self) -> &mut f64 {
        match self.mode {
            Currency::Fun => &mut self.fun,
            Currency::Real => &mut self.real,
        }
    }

    fn log_transaction(&mut self, kind: TransactionKind, amount: f64, reason: &str) {
        let entry = Transaction {
            seq: self.next_seq,
            kind,
            amount,
            currency: self.mode,
            reason: reason.to_string(),
        };
        self.next_seq += 1;
        self.transactions.insert(0, entry);
        self.transactions.truncate(MAX_TRANSACTIONS);
    }
}

impl Wallet for LedgerWallet {
    fn can_afford(&self, amount: f64) -> bool {
        amount > 0.0 && self.balance() >= amount
    }

    fn debit(&mut self, amount: f64, reason: &str) -> bool {
        if amount < 0.0 || self.balance() < amount {
            return false;
        }
        *self.balance_mut() -= amount;
        self.log_transaction(TransactionKind::Debit, amount, reason);
        true
    }

    fn credit(&mut self, amount: f64, reason: &str) {
        if amount <= 0.0 {
            return;
        }
        *self.balance_mut() += amount;
        self.log_transaction(TransactionKind::Credit, amount, reason);
    }

    fn currency(&self) -> Currency {
        self.mode
    }
}
