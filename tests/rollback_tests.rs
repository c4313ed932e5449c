use minibank::domain::loan::LoanStatus;
use minibank::domain::money::Balance;
use minibank::application::engine::Ledger;
use minibank::config::LedgerConfig;
use minibank::domain::transaction::TransactionKind;
use minibank::error::LedgerError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod common;

#[tokio::test]
async fn test_failed_credit_restores_sender() {
    let (ledger, accounts) = common::flaky_ledger();
    let (ledger, admin) = common::funded(ledger, &[("Bob", "bob@example.com")], Decimal::ZERO).await;
    let bob = ledger.account_by_email("bob@example.com").await.unwrap();

    accounts.fail_updates_for(Some(bob.id));
    let result = ledger.transfer(&admin, "bob@example.com", dec!(40)).await;
    assert!(matches!(result, Err(LedgerError::RepositoryError(_))));

    let sender = ledger.account(admin.account_id).await.unwrap();
    assert_eq!(sender.balance, Balance::new(dec!(10000)));
    assert_eq!(sender.transactions.len(), 1);
    assert!(sender.is_consistent());
    let bob = ledger.account(bob.id).await.unwrap();
    assert_eq!(bob.balance, Balance::ZERO);

    accounts.fail_updates_for(None);
    let outcome = ledger.transfer(&admin, "bob@example.com", dec!(40)).await.unwrap();
    assert_eq!(outcome.sender.balance, Balance::new(dec!(9960)));
    assert_eq!(outcome.recipient.balance, Balance::new(dec!(40)));
}

#[tokio::test]
async fn test_failed_debit_changes_nothing() {
    let (ledger, accounts) = common::flaky_ledger();
    let (ledger, admin) = common::funded(ledger, &[("Bob", "bob@example.com")], Decimal::ZERO).await;

    accounts.fail_updates_for(Some(admin.account_id));
    assert!(ledger.transfer(&admin, "bob@example.com", dec!(40)).await.is_err());

    let bob = ledger.account_by_email("bob@example.com").await.unwrap();
    assert!(bob.transactions.is_empty());
}

#[tokio::test]
async fn test_failed_approval_credit_returns_loan_to_pending() {
    let (ledger, accounts) = common::flaky_ledger();
    let (ledger, admin) = common::funded(ledger, &[("Bob", "bob@example.com")], Decimal::ZERO).await;
    let bob = ledger.open_session("bob@example.com").await.unwrap();
    let loan = ledger.request_loan(&bob, dec!(500), 30, 2).await.unwrap();

    accounts.fail_updates_for(Some(bob.account_id));
    assert!(matches!(
        ledger.approve_loan(&admin, loan.id).await,
        Err(LedgerError::RepositoryError(_))
    ));
    assert_eq!(ledger.loan(loan.id).await.unwrap().status, LoanStatus::Pending);
    assert_eq!(ledger.account(bob.account_id).await.unwrap().balance, Balance::ZERO);

    accounts.fail_updates_for(None);
    let outcome = ledger.approve_loan(&admin, loan.id).await.unwrap();
    assert_eq!(outcome.loan.status, LoanStatus::Approved);
    assert_eq!(outcome.account.balance, Balance::new(dec!(500)));
}

#[tokio::test]
async fn test_failed_opening_balance_is_recorded_on_next_bootstrap() {
    let (ledger, accounts) = common::flaky_ledger();
    accounts.fail_all_updates(true);
    assert!(matches!(
        ledger.bootstrap().await,
        Err(LedgerError::RepositoryError(_))
    ));
    let unfunded = ledger.account_by_email("admin@example.com").await.unwrap();
    assert_eq!(unfunded.balance, Balance::ZERO);

    accounts.fail_all_updates(false);
    let admin = ledger.bootstrap().await.unwrap();
    assert_eq!(admin.id, unfunded.id);
    assert_eq!(admin.balance, Balance::new(dec!(10000)));
    assert_eq!(admin.transactions.len(), 1);
    assert_eq!(admin.transactions.last().unwrap().kind, TransactionKind::Adjustment);

    let again = ledger.bootstrap().await.unwrap();
    assert_eq!(again.balance, Balance::new(dec!(10000)));
    assert_eq!(again.transactions.len(), 1);
}

#[tokio::test]
async fn test_unrepresentable_credit_fails_without_side_effects() {
    let ledger = Ledger::in_memory(LedgerConfig::default());
    let (ledger, admin) = common::funded(ledger, &[("Alice", "alice@example.com")], Decimal::ZERO).await;
    let alice = ledger.open_session("alice@example.com").await.unwrap();
    let huge = dec!(79000000000000000000000000000);

    let first = ledger.request_loan(&alice, huge, 15, 1).await;
    assert!(matches!(first, Err(LedgerError::ValidationError(_))));

    let large = dec!(40000000000000000000000000000);
    let a = ledger.request_loan(&alice, large, 15, 1).await.unwrap();
    let b = ledger.request_loan(&alice, large, 15, 1).await.unwrap();
    ledger.approve_loan(&admin, a.id).await.unwrap();
    assert!(matches!(
        ledger.approve_loan(&admin, b.id).await,
        Err(LedgerError::ValidationError(_))
    ));

    assert_eq!(ledger.loan(b.id).await.unwrap().status, LoanStatus::Pending);
    let account = ledger.account(alice.account_id).await.unwrap();
    assert_eq!(account.balance, Balance::new(large));
    assert!(account.is_consistent());
}
