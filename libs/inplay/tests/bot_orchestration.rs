//! Bot orchestration against a scripted bookmaker
//!
//! Every bulk operation must report one result per bot, keep failures
//! isolated to the bot that failed, and never hand one proxy to two bots.

mod common;

use common::fixtures::{account, proxies};
use common::{FakeBook, FakeFactory};
use inplay::application::BotOrchestrator;
use inplay::domain::PlacementOutcome;
use inplay::infrastructure::client::bookmaker::BookmakerError;
use inplay::infrastructure::proxy::ProxyError;
use std::collections::HashSet;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(500);

fn orchestrator(book: &std::sync::Arc<FakeBook>, proxy_count: usize) -> BotOrchestrator {
    BotOrchestrator::new(FakeFactory::new(book), proxies("de", proxy_count), TIMEOUT)
}

#[tokio::test]
async fn test_one_failing_bot_does_not_affect_the_others() {
    let book = FakeBook::new();
    book.unreachable.lock().insert("bob".to_string());
    let mut bots = orchestrator(&book, 4);

    let summary = bots
        .load_bots(
            vec![
                account(1, "alice", "de"),
                account(2, "bob", "de"),
                account(3, "carol", "de"),
            ],
            true,
        )
        .await;

    assert_eq!(summary.added, vec![1, 2, 3]);
    assert_eq!(summary.logins.len(), 3);
    assert!(summary.logins[&1].is_ok());
    assert!(matches!(summary.logins[&2], Err(BookmakerError::Network(_))));
    assert!(summary.logins[&3].is_ok());

    let wallets = bots.refresh_wallet_balances().await;
    assert_eq!(wallets.len(), 3);
    assert_eq!(wallets[&1].as_ref().map(|w| w.withdrawable_amount).ok(), Some(100.0));
    assert!(wallets[&2].is_err());
    assert!(wallets[&3].is_ok());
}

#[tokio::test]
async fn test_proxies_are_never_shared() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 4);
    let accounts = (1..=5)
        .map(|id| account(id, &format!("user{}", id), "de"))
        .collect();

    let summary = bots.load_bots(accounts, true).await;

    let failed: Vec<_> = summary
        .logins
        .iter()
        .filter(|(_, r)| r.is_err())
        .collect();
    assert_eq!(failed.len(), 1, "only four proxies for five bots");
    assert!(matches!(
        failed[0].1,
        Err(BookmakerError::Proxy(ProxyError::Exhausted { .. }))
    ));

    let used: Vec<String> = book.connections.lock().iter().flatten().cloned().collect();
    let unique: HashSet<&String> = used.iter().collect();
    assert_eq!(used.len(), 4);
    assert_eq!(unique.len(), 4);

    bots.sync_leases().await;
    assert_eq!(bots.proxy_pool().leased().len(), 4);
}

#[tokio::test]
async fn test_expired_session_is_renewed_once() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 2);
    bots.load_bots(vec![account(1, "alice", "de")], true).await;
    assert_eq!(book.login_count("alice"), 1);

    book.expired_tokens.lock().insert("alice#1".to_string());
    let wallets = bots.refresh_wallet_balances().await;

    assert!(wallets[&1].is_ok());
    assert_eq!(book.login_count("alice"), 2);
}

#[tokio::test]
async fn test_no_retry_right_after_login() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 2);
    bots.load_bots(vec![account(1, "alice", "de")], false).await;

    // The token issued by the upcoming login is already dead
    book.expired_tokens.lock().insert("alice#1".to_string());
    let wallets = bots.refresh_wallet_balances().await;

    assert!(matches!(wallets[&1], Err(BookmakerError::AuthExpired)));
    assert_eq!(book.login_count("alice"), 1);
}

#[tokio::test]
async fn test_session_expiring_again_after_renewal_disables_bot() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 2);
    bots.load_bots(vec![account(1, "alice", "de")], true).await;

    // Both the current and the renewed token are refused
    book.expired_tokens.lock().insert("alice#1".to_string());
    book.expired_tokens.lock().insert("alice#2".to_string());
    let wallets = bots.refresh_wallet_balances().await;

    assert!(matches!(wallets[&1], Err(BookmakerError::InvalidCredentials)));
    assert_eq!(book.login_count("alice"), 2);

    let again = bots.log_in_all().await;
    assert!(matches!(again[&1], Err(BookmakerError::InvalidCredentials)));
    assert_eq!(book.login_count("alice"), 2);
}

#[tokio::test]
async fn test_rejected_credentials_block_until_account_changes() {
    let book = FakeBook::new();
    book.bad_credentials.lock().insert("alice".to_string());
    let mut bots = orchestrator(&book, 2);

    let summary = bots.load_bots(vec![account(1, "alice", "de")], true).await;
    assert!(matches!(summary.logins[&1], Err(BookmakerError::InvalidCredentials)));

    // No further attempts reach the bookmaker
    let again = bots.log_in_all().await;
    assert!(matches!(again[&1], Err(BookmakerError::InvalidCredentials)));
    assert_eq!(book.login_count("alice"), 1);

    // New password: the block is lifted
    book.bad_credentials.lock().clear();
    let mut fixed = account(1, "alice", "de");
    fixed.password = "new-secret".to_string();
    let summary = bots.load_bots(vec![fixed], true).await;

    assert_eq!(summary.updated, vec![1]);
    assert!(summary.logins[&1].is_ok());
    assert_eq!(book.login_count("alice"), 2);
}

#[tokio::test]
async fn test_hanging_bot_times_out_alone() {
    let book = FakeBook::new();
    book.hanging.lock().insert("slow".to_string());
    let mut bots = orchestrator(&book, 3);

    let summary = bots
        .load_bots(vec![account(1, "fast", "de"), account(2, "slow", "de")], true)
        .await;

    assert!(summary.logins[&1].is_ok());
    assert!(matches!(summary.logins[&2], Err(BookmakerError::Timeout(_))));
}

#[tokio::test]
async fn test_removed_bot_gives_its_proxy_back() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 2);
    bots.load_bots(
        vec![account(1, "alice", "de"), account(2, "bob", "de")],
        true,
    )
    .await;
    assert_eq!(bots.proxy_pool().leased().len(), 2);

    let summary = bots.load_bots(vec![account(1, "alice", "de")], false).await;
    assert_eq!(summary.removed, vec![2]);
    assert_eq!(bots.bot_ids(), vec![1]);
    assert_eq!(bots.proxy_pool().leased().len(), 1);

    // Disabled accounts are removed the same way
    let mut disabled = account(1, "alice", "de");
    disabled.is_enabled = false;
    let summary = bots.load_bots(vec![disabled], false).await;
    assert_eq!(summary.removed, vec![1]);
    assert!(bots.is_empty());
    assert!(bots.proxy_pool().leased().is_empty());
}

#[tokio::test]
async fn test_country_change_moves_session_to_new_proxy() {
    let book = FakeBook::new();
    let pool = {
        let list = vec![
            ("de".to_string(), "http://de-1".to_string()),
            ("fi".to_string(), "http://fi-1".to_string()),
        ];
        std::sync::Arc::new(inplay::infrastructure::ProxyPool::new(std::sync::Arc::new(
            inplay::infrastructure::StaticProxySource::new(list),
        )))
    };
    let mut bots = BotOrchestrator::new(FakeFactory::new(&book), pool, TIMEOUT);
    bots.load_bots(vec![account(1, "alice", "de")], true).await;
    assert!(bots.proxy_pool().is_leased("http://de-1"));

    let summary = bots.load_bots(vec![account(1, "alice", "fi")], false).await;
    assert_eq!(summary.updated, vec![1]);
    assert!(!bots.proxy_pool().is_leased("http://de-1"));
    assert!(bots.proxy_pool().is_leased("http://fi-1"));
    assert_eq!(book.login_count("alice"), 2);
}

#[tokio::test]
async fn test_stake_validation_and_placement() {
    let book = FakeBook::new();
    let mut bots = orchestrator(&book, 3);
    bots.load_bots(
        vec![account(1, "alice", "de"), account(2, "bob", "de")],
        true,
    )
    .await;

    let too_big = bots.place_bets(150.0, 1.9, "sel-1", true).await;
    assert!(too_big
        .values()
        .all(|r| matches!(r, Err(BookmakerError::InsufficientBalance { .. }))));
    assert!(book.bets.lock().is_empty());

    let invalid = bots.place_bets(0.0, 1.9, "sel-1", false).await;
    assert!(invalid
        .values()
        .all(|r| matches!(r, Err(BookmakerError::InvalidStake(_)))));

    let placed = bots.place_bets(10.0, 1.9, "sel-1", true).await;
    assert_eq!(placed.len(), 2);
    assert!(placed
        .values()
        .all(|r| matches!(r, Ok(PlacementOutcome::Accepted { .. }))));
    assert_eq!(book.bets.lock().len(), 2);
}

#[tokio::test]
async fn test_sessions_resume_in_a_new_process() {
    let book = FakeBook::new();
    let mut first = orchestrator(&book, 3);
    first
        .load_bots(
            vec![account(1, "alice", "de"), account(2, "bob", "de")],
            true,
        )
        .await;
    let saved = first.session_data().await;
    assert_eq!(saved.len(), 2);

    // Same proxy list, fresh pool: sessions come back without logging in
    let mut second = orchestrator(&book, 3);
    second
        .load_bots(
            vec![account(1, "alice", "de"), account(2, "bob", "de")],
            false,
        )
        .await;
    let mut restored = second.restore_sessions(saved.clone()).await;
    restored.sort();
    assert_eq!(restored, vec![1, 2]);

    second.log_in_all().await;
    assert_eq!(book.login_count("alice"), 1);
    assert_eq!(book.login_count("bob"), 1);

    for data in saved.values() {
        let proxy = data.proxy.as_deref().unwrap_or_default();
        assert!(second.proxy_pool().is_leased(proxy));
    }
}
