use super::interest::LoanTerms;
use super::loan::LoanId;
use super::money::Balance;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    TransferOut,
    TransferIn,
    LoanApproved,
    Adjustment,
}

/// Loan figures frozen at approval time.
///
/// Later changes to the interest rate never touch a snapshot that has
/// already been written to a log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LoanSnapshot {
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub term_days: u32,
    pub installments: u32,
    pub total_amount: Decimal,
    pub installment_amount: Decimal,
}

impl LoanSnapshot {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            total_amount: self.total_amount,
            installment_amount: self.installment_amount,
            interest_amount: self.total_amount - self.amount,
        }
    }
}

/// A single balance-affecting event on an account.
///
/// `amount` is signed: debits are negative, credits positive.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub description: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanSnapshot>,
}

impl Transaction {
    pub fn transfer_out(recipient_name: &str, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransactionKind::TransferOut,
            description: format!("Transfer to {recipient_name}"),
            amount: -amount,
            timestamp,
            loan: None,
        }
    }

    pub fn transfer_in(sender_name: &str, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransactionKind::TransferIn,
            description: format!("Transfer from {sender_name}"),
            amount,
            timestamp,
            loan: None,
        }
    }

    pub fn loan_approved(snapshot: LoanSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransactionKind::LoanApproved,
            description: format!("Loan approved ({}x)", snapshot.installments),
            amount: snapshot.amount,
            timestamp,
            loan: Some(snapshot),
        }
    }

    pub fn adjustment(description: impl Into<String>, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: TransactionKind::Adjustment,
            description: description.into(),
            amount,
            timestamp,
            loan: None,
        }
    }
}

/// Append-only history of an account's transactions, oldest first.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(transparent)]
pub struct TransactionLog(Vec<Transaction>);

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tx: Transaction) {
        self.0.push(tx);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion (chronological) order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Transaction> {
        self.0.iter()
    }

    /// Entries most recent first, for statements.
    pub fn latest_first(&self) -> impl Iterator<Item = &Transaction> {
        self.0.iter().rev()
    }

    pub fn last(&self) -> Option<&Transaction> {
        self.0.last()
    }

    /// The approval snapshot recorded for `loan_id`, if any.
    pub fn snapshot_for(&self, loan_id: LoanId) -> Option<&LoanSnapshot> {
        self.0
            .iter()
            .filter_map(|tx| tx.loan.as_ref())
            .find(|snapshot| snapshot.loan_id == loan_id)
    }

    /// Sum of every recorded amount.
    pub fn net(&self) -> Balance {
        self.0.iter().map(|tx| Balance::new(tx.amount)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_entries_are_signed() {
        let now = Utc::now();
        let out = Transaction::transfer_out("Bob", dec!(25), now);
        let inc = Transaction::transfer_in("Alice", dec!(25), now);
        assert_eq!(out.amount, dec!(-25));
        assert_eq!(out.description, "Transfer to Bob");
        assert_eq!(inc.amount, dec!(25));
        assert_eq!(inc.description, "Transfer from Alice");
        assert_eq!(out.timestamp, inc.timestamp);
    }

    #[test]
    fn test_log_net_and_order() {
        let now = Utc::now();
        let mut log = TransactionLog::new();
        log.append(Transaction::adjustment("Opening balance", dec!(100), now));
        log.append(Transaction::transfer_out("Bob", dec!(30), now));
        log.append(Transaction::transfer_in("Carol", dec!(5.5), now));

        assert_eq!(log.len(), 3);
        assert_eq!(log.net(), Balance::new(dec!(75.5)));

        let kinds: Vec<_> = log.iter().map(|tx| tx.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Adjustment,
                TransactionKind::TransferOut,
                TransactionKind::TransferIn
            ]
        );
        let newest = log.latest_first().next().unwrap();
        assert_eq!(newest.kind, TransactionKind::TransferIn);
    }

    #[test]
    fn test_log_serializes_as_plain_list() {
        let mut log = TransactionLog::new();
        log.append(Transaction::adjustment("Opening balance", dec!(1), Utc::now()));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert!(json[0].get("loan").is_none());

        let back: TransactionLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn test_snapshot_lookup_by_loan() {
        let loan_id = LoanId::new();
        let snapshot = LoanSnapshot {
            loan_id,
            amount: dec!(1000),
            term_days: 30,
            installments: 2,
            total_amount: dec!(1018),
            installment_amount: dec!(509),
        };
        let mut log = TransactionLog::new();
        log.append(Transaction::adjustment("Opening balance", dec!(1), Utc::now()));
        log.append(Transaction::loan_approved(snapshot.clone(), Utc::now()));

        assert_eq!(log.snapshot_for(loan_id), Some(&snapshot));
        assert!(log.snapshot_for(LoanId::new()).is_none());
        assert_eq!(snapshot.terms().interest_amount, dec!(18));
    }
}
