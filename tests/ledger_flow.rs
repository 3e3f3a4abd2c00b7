//! End-to-end ledger behaviour over the in-process store

use std::sync::Arc;
use std::time::Duration;

use fund_ledger::config::LedgerConfig;
use fund_ledger::ledger::{
    Faults, LedgerError, LedgerService, MemoryStore, NewAccount, Provenance, StatementType,
    TransferRequest, TransferState,
};
use fund_ledger::money::{Currency, parse_amount};

fn brl() -> Currency {
    Currency::new("BRL").unwrap()
}

fn new_account(key: &str) -> NewAccount {
    NewAccount {
        account_id: key.to_string(),
        person_id: format!("person-{}", key),
        tenant_id: "tenant-a".to_string(),
        user_last_update: None,
    }
}

fn service(config: LedgerConfig) -> (Arc<MemoryStore>, LedgerService) {
    let store = Arc::new(MemoryStore::new());
    let ledger = LedgerService::new(store.clone(), config, &tracing::Span::none()).unwrap();
    (store, ledger)
}

async fn funded(ledger: &LedgerService, key: &str, amount: &str) {
    ledger.create_account(new_account(key), None).await.unwrap();
    let delta = parse_amount(amount, &brl()).unwrap();
    ledger
        .add_fund_balance(key, delta, Some(brl()), Provenance::default())
        .await
        .unwrap();
}

async fn amount_of(ledger: &LedgerService, key: &str) -> i64 {
    ledger.get_balance(key).await.unwrap().amount
}

#[tokio::test]
async fn transfer_scenario_brl() {
    let (store, ledger) = service(LedgerConfig {
        fund_writes_statement: false,
        ..Default::default()
    });
    funded(&ledger, "A", "100.00").await;
    funded(&ledger, "B", "50.00").await;

    let amount = parse_amount("30.00", &brl()).unwrap();
    let receipt = ledger
        .transfer_funds(TransferRequest::new("A", "B", amount, brl()))
        .await
        .unwrap();

    assert_eq!(receipt.status, TransferState::Committed);
    assert_eq!(amount_of(&ledger, "A").await, 7_000);
    assert_eq!(amount_of(&ledger, "B").await, 8_000);

    let statements = store.statements().await;
    assert_eq!(statements.len(), 2);
    let debit = &statements[0];
    let credit = &statements[1];
    assert_eq!(
        (debit.account_id.as_str(), debit.kind, debit.amount),
        ("A", StatementType::Debit, 3_000)
    );
    assert_eq!(
        (credit.account_id.as_str(), credit.kind, credit.amount),
        ("B", StatementType::Credit, 3_000)
    );
    assert_eq!(debit.transaction_id, Some(receipt.transaction_id));
    assert_eq!(credit.transaction_id, Some(receipt.transaction_id));

    // Both balances carry the transfer's correlation id
    let balance_a = ledger.get_balance("A").await.unwrap();
    assert_eq!(balance_a.transaction_id, Some(receipt.transaction_id));
}

#[tokio::test]
async fn failed_credit_leg_leaves_no_trace() {
    let (store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "100.00").await;
    funded(&ledger, "B", "50.00").await;
    let b_id = ledger.get_account("B").await.unwrap().id;

    let balances_before = store.balances().await;
    let statements_before = store.statements().await;

    store.set_faults(Faults {
        fail_update_for: Some(b_id),
        ..Default::default()
    });
    let err = ledger
        .transfer_funds(TransferRequest::new("A", "B", 3_000, brl()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Store(_)));
    store.clear_faults();

    assert_eq!(store.balances().await, balances_before);
    assert_eq!(store.statements().await, statements_before);
}

#[tokio::test]
async fn commit_failure_rolls_back() {
    let (store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "10.00").await;
    funded(&ledger, "B", "0.01").await;

    store.set_faults(Faults {
        fail_commit: true,
        ..Default::default()
    });
    assert!(
        ledger
            .transfer_funds(TransferRequest::new("A", "B", 500, brl()))
            .await
            .is_err()
    );
    store.clear_faults();

    assert_eq!(amount_of(&ledger, "A").await, 1_000);
    assert_eq!(amount_of(&ledger, "B").await, 1);
}

#[tokio::test]
async fn never_funded_account_has_no_balance() {
    let (_store, ledger) = service(LedgerConfig::default());
    ledger
        .create_account(new_account("FRESH"), None)
        .await
        .unwrap();

    let err = ledger.get_balance("FRESH").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, LedgerError::BalanceNotFound(_)));
}

#[tokio::test]
async fn wrong_type_mutates_nothing() {
    let (store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "100.00").await;
    funded(&ledger, "B", "50.00").await;
    let before = store.balances().await;
    let statements_before = store.statements().await.len();

    let mut req = TransferRequest::new("A", "B", 1_000, brl());
    req.kind = "DEPOSIT".to_string();
    let err = ledger.transfer_funds(req).await.unwrap_err();

    assert_eq!(err, LedgerError::TransactionTypeInvalid("DEPOSIT".into()));
    assert_eq!(store.balances().await, before);
    assert_eq!(store.statements().await.len(), statements_before);
}

#[tokio::test]
async fn repeated_funding_updates_one_row() {
    let (store, ledger) = service(LedgerConfig::default());
    ledger.create_account(new_account("A"), None).await.unwrap();

    let first = ledger
        .add_fund_balance("A", 1_234, None, Provenance::default())
        .await
        .unwrap();
    assert_eq!(first.amount, 1_234);
    let second = ledger
        .add_fund_balance("A", 766, None, Provenance::default())
        .await
        .unwrap();
    assert_eq!(second.amount, 2_000);
    assert_eq!(first.id, second.id);
    assert_eq!(store.balances().await.len(), 1);
}

#[tokio::test]
async fn concurrent_first_funding_creates_one_row() {
    let (store, ledger) = service(LedgerConfig::default());
    let ledger = Arc::new(ledger);
    ledger.create_account(new_account("A"), None).await.unwrap();

    let tasks = (0..20).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .add_fund_balance("A", 100, None, Provenance::default())
                .await
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(store.balances().await.len(), 1);
    assert_eq!(amount_of(&ledger, "A").await, 2_000);
}

#[tokio::test]
async fn concurrent_debits_lose_no_update() {
    let (_store, ledger) = service(LedgerConfig::default());
    let ledger = Arc::new(ledger);
    funded(&ledger, "SRC", "1000.00").await;
    for i in 0..5 {
        funded(&ledger, &format!("DST-{}", i), "0.01").await;
    }

    let amounts: Vec<i64> = (1..=40).collect();
    let tasks = amounts.iter().enumerate().map(|(i, &amount)| {
        let ledger = ledger.clone();
        let to = format!("DST-{}", i % 5);
        tokio::spawn(async move {
            ledger
                .transfer_funds(TransferRequest::new("SRC", &to, amount, brl()))
                .await
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let total: i64 = amounts.iter().sum();
    assert_eq!(amount_of(&ledger, "SRC").await, 100_000 - total);

    let mut destinations = 0;
    for i in 0..5 {
        destinations += amount_of(&ledger, &format!("DST-{}", i)).await - 1;
    }
    assert_eq!(destinations, total);
}

#[tokio::test]
async fn opposite_transfers_between_a_pair_both_commit() {
    let (_store, ledger) = service(LedgerConfig::default());
    let ledger = Arc::new(ledger);
    funded(&ledger, "A", "500.00").await;
    funded(&ledger, "B", "500.00").await;

    let tasks = (0..30).map(|i| {
        let ledger = ledger.clone();
        let (from, to) = if i % 2 == 0 { ("A", "B") } else { ("B", "A") };
        tokio::spawn(async move {
            ledger
                .transfer_funds(TransferRequest::new(from, to, 100, brl()))
                .await
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(amount_of(&ledger, "A").await, 50_000);
    assert_eq!(amount_of(&ledger, "B").await, 50_000);
}

#[tokio::test]
async fn balance_matches_statement_totals() {
    let (_store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "100.00").await;
    funded(&ledger, "B", "50.00").await;
    ledger
        .add_fund_balance("A", -1_000, None, Provenance::default())
        .await
        .unwrap();
    ledger
        .transfer_funds(TransferRequest::new("A", "B", 2_500, brl()))
        .await
        .unwrap();
    ledger
        .transfer_funds(TransferRequest::new("B", "A", 500, brl()))
        .await
        .unwrap();

    for key in ["A", "B"] {
        let summary = ledger.get_movement_summary(key).await.unwrap();
        assert_eq!(summary.balance.amount, summary.net_total, "account {}", key);
    }

    let summary = ledger.get_movement_summary("A").await.unwrap();
    assert_eq!(summary.credit_total, 10_000 + 500);
    assert_eq!(summary.debit_total, 1_000 + 2_500);
    assert_eq!(summary.recent_statements.len(), 4);
}

#[tokio::test]
async fn movement_summary_keeps_ten_most_recent() {
    let (_store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "1.00").await;
    for _ in 0..14 {
        ledger
            .add_fund_balance("A", 1, None, Provenance::default())
            .await
            .unwrap();
    }

    let summary = ledger.get_movement_summary("A").await.unwrap();
    assert_eq!(summary.recent_statements.len(), 10);
    assert_eq!(summary.credit_total, 114);
}

#[tokio::test]
async fn slow_store_times_out_and_rolls_back() {
    let (store, ledger) = service(LedgerConfig {
        op_timeout_ms: 50,
        ..Default::default()
    });
    funded(&ledger, "A", "10.00").await;
    funded(&ledger, "B", "10.00").await;

    store.set_faults(Faults {
        latency: Some(Duration::from_millis(30)),
        ..Default::default()
    });
    let err = ledger
        .transfer_funds(TransferRequest::new("A", "B", 100, brl()))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::Timeout);
    store.clear_faults();

    assert_eq!(amount_of(&ledger, "A").await, 1_000);
    assert_eq!(amount_of(&ledger, "B").await, 1_000);
}

#[tokio::test]
async fn rejected_amounts() {
    let (_store, ledger) = service(LedgerConfig::default());
    funded(&ledger, "A", "10.00").await;
    funded(&ledger, "B", "10.00").await;

    for amount in [0, -100] {
        let err = ledger
            .transfer_funds(TransferRequest::new("A", "B", amount, brl()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }
    assert_eq!(amount_of(&ledger, "A").await, 1_000);
}
