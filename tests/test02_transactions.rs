use std::cell::RefCell;
use std::rc::Rc;

use pg_session::prelude::*;
use pg_session::test_utils::ScriptedBackend;

fn session(backend: &ScriptedBackend) -> Session<ScriptedBackend> {
    Session::new(
        backend.clone(),
        ConnectParams::builder()
            .host("localhost")
            .database("test")
            .username("postgres")
            .finish(),
        SessionOptions::default(),
    )
}

#[test]
fn inner_rollback_then_outer_commit() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new();
    let mut db = session(&backend);
    let fired = Rc::new(RefCell::new(Vec::new()));

    db.begin()?;
    db.execute("insert into t values (1)")?;
    let log = Rc::clone(&fired);
    assert!(db.register_after_commit(move || log.borrow_mut().push("committed")));

    db.begin()?;
    db.execute("insert into t values (2)")?;
    db.rollback()?;
    assert_eq!((db.depth(), db.physical_depth()), (1, 1));

    db.commit()?;
    assert_eq!(*fired.borrow(), vec!["committed"]);
    assert_eq!(
        backend.statements(),
        vec![
            "BEGIN",
            "insert into t values (1)",
            "SAVEPOINT level1begin",
            "insert into t values (2)",
            "ROLLBACK TO SAVEPOINT level1begin",
            "COMMIT",
        ]
    );
    assert_eq!(db.depth(), 0);
    Ok(())
}

#[test]
fn failed_query_rolls_back_and_aborts_level() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new().failing_with_code("insert dup", "duplicate key", "23505");
    let mut db = session(&backend);
    db.begin()?;
    db.begin()?;

    match db.execute("insert dup") {
        Err(SessionError::Backend { message, code }) => {
            assert_eq!(message, "duplicate key");
            assert_eq!(code, Some(23505));
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(db.last_error().as_deref(), Some("duplicate key"));
    assert!(matches!(db.execute("select 1"), Err(SessionError::TransactionAborted)));

    db.commit()?;
    db.execute("select 2")?;
    db.commit()?;
    assert_eq!(
        backend.statements(),
        vec![
            "BEGIN",
            "SAVEPOINT level1begin",
            "insert dup",
            "ROLLBACK TO SAVEPOINT level1begin",
            "select 2",
            "COMMIT",
        ]
    );
    Ok(())
}

#[test]
fn sqlstate_codes_are_folded_into_message() {
    let backend = ScriptedBackend::new().failing_with_code("bad", "exclusion violated", "23P01");
    let mut db = session(&backend);
    match db.execute("bad") {
        Err(SessionError::Backend { message, code }) => {
            assert_eq!(message, "23P01 exclusion violated");
            assert_eq!(code, Some(-1));
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[test]
fn outer_rollback_drops_callbacks() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new();
    let mut db = session(&backend);
    let fired = Rc::new(RefCell::new(0));

    db.begin_immediate()?;
    let counter = Rc::clone(&fired);
    db.register_after_commit(move || *counter.borrow_mut() += 1);
    db.rollback()?;
    assert_eq!(*fired.borrow(), 0);

    let counter = Rc::clone(&fired);
    assert!(!db.register_after_commit(move || *counter.borrow_mut() += 1));
    Ok(())
}

#[test]
fn unbalanced_commit_and_rollback() {
    let backend = ScriptedBackend::new();
    let mut db = session(&backend);
    assert!(matches!(db.commit(), Err(SessionError::NoOpenTransaction("Commit"))));
    assert!(matches!(db.rollback(), Err(SessionError::NoOpenTransaction("Rollback"))));
    assert_eq!(backend.connect_count(), 0);
}

#[test]
fn transaction_closure_commits_or_rolls_back() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new().failing("boom", "nope");
    let mut db = session(&backend);

    let value = db.transaction(|db| {
        db.execute("update a")?;
        Ok(7)
    })?;
    assert_eq!(value, 7);

    let result: Result<(), SessionError> = db.transaction(|db| {
        db.execute("boom")?;
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(db.depth(), 0);
    assert_eq!(
        backend.statements(),
        vec!["BEGIN", "update a", "COMMIT", "BEGIN", "boom", "ROLLBACK"]
    );
    Ok(())
}

#[test]
fn drop_rolls_back_open_transaction() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new();
    {
        let mut db = session(&backend);
        db.begin()?;
        db.begin()?;
        db.execute("update a")?;
    }
    assert_eq!(
        backend.statements(),
        vec!["BEGIN", "SAVEPOINT level1begin", "update a", "ROLLBACK"]
    );
    assert_eq!(backend.close_count(), 1);
    Ok(())
}

#[test]
fn global_rollback_twice_is_harmless() -> Result<(), SessionError> {
    let backend = ScriptedBackend::new();
    let mut db = session(&backend);
    db.begin_immediate()?;
    db.global_rollback()?;
    db.global_rollback()?;
    assert_eq!(backend.statements(), vec!["BEGIN", "ROLLBACK"]);
    assert!(!db.is_in_transaction());
    Ok(())
}
