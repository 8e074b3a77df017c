/// Transaction lifecycle tests
///
/// Start, commit, rollback and drop behaviour against the loopback server.
/// Run with: cargo test --test transaction_lifecycle_tests

use std::sync::Arc;

use rustignite::server::ReceivedRequest;
use rustignite::{
    BinaryCommunicator, ClientError, ClientOperation, InjectedFailure, LoopbackServer,
    Transaction, TransactionConcurrency, TransactionConfig, TransactionId, TransactionIsolation,
    TransactionOutcome, TransactionState,
};

fn setup() -> (Arc<LoopbackServer>, Arc<BinaryCommunicator<Arc<LoopbackServer>>>) {
    let server = Arc::new(LoopbackServer::new());
    let communicator = Arc::new(BinaryCommunicator::new(server.clone()));
    (server, communicator)
}

fn new_transaction(communicator: &Arc<BinaryCommunicator<Arc<LoopbackServer>>>) -> Transaction {
    Transaction::with_config(communicator.clone(), TransactionConfig::default()).unwrap()
}

#[test]
fn test_negative_timeout_fails_before_any_send() {
    let (server, communicator) = setup();

    let result = Transaction::new(
        communicator,
        TransactionConcurrency::Optimistic,
        TransactionIsolation::Serializable,
        -1,
        Some("invalid".to_string()),
    );

    assert!(matches!(result, Err(ClientError::IllegalArgument(_))));
    assert!(server.received().is_empty());
}

#[test]
fn test_accessors_return_construction_values() -> anyhow::Result<()> {
    let (_server, communicator) = setup();
    let tx = Transaction::new(
        communicator,
        TransactionConcurrency::Optimistic,
        TransactionIsolation::ReadCommitted,
        1500,
        Some("import".to_string()),
    )?;

    let check = |tx: &Transaction| {
        assert_eq!(tx.concurrency(), TransactionConcurrency::Optimistic);
        assert_eq!(tx.isolation(), TransactionIsolation::ReadCommitted);
        assert_eq!(tx.timeout(), 1500);
        assert_eq!(tx.label(), Some("import"));
    };

    check(&tx);
    tx.start()?;
    check(&tx);
    tx.commit()?;
    check(&tx);
    Ok(())
}

#[test]
fn test_id_and_start_time_only_after_start() -> anyhow::Result<()> {
    let (_server, communicator) = setup();
    let tx = new_transaction(&communicator);

    assert_eq!(tx.id(), None);
    assert_eq!(tx.start_time(), None);

    let before = chrono::Utc::now();
    let id = tx.start()?;
    let after = chrono::Utc::now();

    assert_eq!(id, Some(TransactionId(1)));
    assert_eq!(tx.id(), id);
    let started = tx.start_time().expect("start time recorded");
    assert!(before <= started && started <= after);
    assert_eq!(tx.state(), TransactionState::Active);
    Ok(())
}

#[test]
fn test_second_start_is_noop() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);

    assert!(tx.start()?.is_some());
    assert_eq!(tx.start()?, None);
    assert_eq!(server.request_count(ClientOperation::TxStart), 1);
    Ok(())
}

#[test]
fn test_closed_handle_cannot_restart() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);

    tx.start()?;
    tx.rollback()?;
    assert_eq!(tx.start()?, None);
    assert_eq!(tx.state(), TransactionState::Closed);
    assert_eq!(server.request_count(ClientOperation::TxStart), 1);
    Ok(())
}

#[test]
fn test_commit_then_rollback_sends_only_commit() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    let id = tx.start()?.expect("started");

    tx.commit()?;
    tx.rollback()?;

    let ends = server.end_requests();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].id, id);
    assert!(ends[0].commit);
    assert_eq!(tx.outcome(), Some(TransactionOutcome::Committed));
    assert_eq!(server.committed_count(), 1);
    assert_eq!(server.rolled_back_count(), 0);
    Ok(())
}

#[test]
fn test_rollback_sends_false_flag() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    tx.start()?;

    tx.rollback()?;

    assert_eq!(server.end_requests().len(), 1);
    assert!(!server.end_requests()[0].commit);
    assert_eq!(tx.outcome(), Some(TransactionOutcome::RolledBack));
    Ok(())
}

#[test]
fn test_drop_active_transaction_rolls_back_once() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let id = {
        let tx = new_transaction(&communicator);
        tx.start()?.expect("started")
    };

    let ends = server.end_requests();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].id, id);
    assert!(!ends[0].commit);
    assert!(!server.is_open(id));
    Ok(())
}

#[test]
fn test_drop_inactive_transaction_sends_nothing() {
    let (server, communicator) = setup();
    {
        let _tx = new_transaction(&communicator);
    }
    assert!(server.received().is_empty());
}

#[test]
fn test_drop_after_commit_sends_nothing_more() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    {
        let tx = new_transaction(&communicator);
        tx.start()?;
        tx.commit()?;
    }
    assert_eq!(server.request_count(ClientOperation::TxEnd), 1);
    assert_eq!(server.committed_count(), 1);
    Ok(())
}

#[test]
fn test_drop_swallows_transport_failure() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    tx.start()?;
    server.fail_next(ClientOperation::TxEnd, InjectedFailure::Disconnected)?;

    // Must not panic or otherwise surface the error.
    drop(tx);

    assert_eq!(server.request_count(ClientOperation::TxEnd), 1);
    Ok(())
}

#[test]
fn test_server_rejection_propagates_and_closes() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    tx.start()?;
    server.fail_next(
        ClientOperation::TxEnd,
        InjectedFailure::Rejected {
            status: 1020,
            message: "Transaction timed out".to_string(),
        },
    )?;

    match tx.commit() {
        Err(ClientError::Server { status, message }) => {
            assert_eq!(status, 1020);
            assert_eq!(message, "Transaction timed out");
        }
        other => panic!("expected server error, got {:?}", other),
    }

    // Closed before the request went out: no retry on any path.
    assert!(tx.is_closed());
    tx.commit()?;
    tx.rollback()?;
    drop(tx);
    assert_eq!(server.request_count(ClientOperation::TxEnd), 1);
    Ok(())
}

#[test]
fn test_failed_start_leaves_transaction_inactive() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    server.fail_next(ClientOperation::TxStart, InjectedFailure::Disconnected)?;

    assert!(matches!(tx.start(), Err(ClientError::Io(_))));
    assert_eq!(tx.state(), TransactionState::Inactive);
    assert_eq!(tx.id(), None);

    // Dropping a never-activated handle sends nothing.
    drop(tx);
    assert_eq!(server.request_count(ClientOperation::TxEnd), 0);
    Ok(())
}

#[test]
fn test_failed_start_can_be_retried() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    server.fail_next(
        ClientOperation::TxStart,
        InjectedFailure::Rejected {
            status: 1,
            message: "busy".to_string(),
        },
    )?;

    assert!(tx.start().is_err());
    let id = tx.start()?;
    assert!(id.is_some());
    assert_eq!(server.open_transactions().len(), 1);
    Ok(())
}

#[test]
fn test_explicit_close_rolls_back() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let tx = new_transaction(&communicator);
    tx.start()?;

    tx.close()?;
    tx.close()?;

    assert_eq!(server.rolled_back_count(), 1);
    assert_eq!(server.request_count(ClientOperation::TxEnd), 1);
    Ok(())
}

#[test]
fn test_begin_request_carries_configuration() -> anyhow::Result<()> {
    let (server, communicator) = setup();
    let config = TransactionConfig::default()
        .concurrency(TransactionConcurrency::Optimistic)
        .isolation(TransactionIsolation::Serializable)
        .timeout_ms(30_000)
        .label("reporting");
    let tx = Transaction::with_config(communicator, config.clone())?;
    tx.start()?;

    assert_eq!(server.received(), vec![ReceivedRequest::Start(config)]);
    Ok(())
}
