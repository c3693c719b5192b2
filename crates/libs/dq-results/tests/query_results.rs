use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dq_results::{
    ChangeMsg, NullTable, QUEUE_CAPACITY, QueryResults, Record, Scroll, TableRenderer, TableView,
    UpdatedResult, ViewEvent, ViewStatus, prelude::*,
};
use serde_json::{Value, json};
use tokio::time::timeout;

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object {other}"),
    }
}

/// Keeps every drawn state.
#[derive(Clone, Default)]
struct Frames(Arc<Mutex<Vec<(TableView, ViewStatus)>>>);

impl TableRenderer for Frames {
    fn draw(&mut self, view: &TableView, status: &ViewStatus) -> io::Result<()> {
        self.0.lock().unwrap().push((view.clone(), *status));
        Ok(())
    }
}

struct Broken;

impl TableRenderer for Broken {
    fn draw(&mut self, view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        if view.rows.is_empty() {
            Ok(())
        } else {
            Err(io::Error::other("terminal gone"))
        }
    }
}

#[tokio::test]
async fn update_keeps_row_position() -> Result<()> {
    let alice = record(json!({"id": 1, "name": "Alice"}));
    let bob = record(json!({"id": 2, "name": "Bob"}));
    let results = QueryResults::interactive(NullTable);

    results
        .change(ChangeMsg {
            added_results: vec![alice.clone(), bob],
            ..Default::default()
        })
        .await;
    results
        .change(ChangeMsg {
            updated_results: vec![UpdatedResult {
                before: alice,
                after: record(json!({"id": 1, "name": "Alice Smith"})),
            }],
            ..Default::default()
        })
        .await;
    results.close().await?;

    let view = results.snapshot();
    assert_eq!(view.columns, ["id", "name"]);
    assert_eq!(
        view.rows,
        vec![
            vec!["1".to_string(), "Alice Smith".to_string()],
            vec!["2".to_string(), "Bob".to_string()],
        ]
    );
    assert_eq!(results.status().batches, 2);
    assert_eq!(results.status().rejected, 0);
    Ok(())
}

#[tokio::test]
async fn misses_are_counted_not_fatal() -> Result<()> {
    let results = QueryResults::interactive(NullTable);
    let ghost = record(json!({"id": 9}));

    results
        .change(ChangeMsg {
            updated_results: vec![UpdatedResult {
                before: ghost.clone(),
                after: record(json!({"id": 10})),
            }],
            deleted_results: vec![ghost],
            ..Default::default()
        })
        .await;
    results
        .change(ChangeMsg {
            added_results: vec![record(json!({"id": 1}))],
            ..Default::default()
        })
        .await;
    results.close().await?;

    assert_eq!(results.status().rejected, 2);
    assert_eq!(results.snapshot().rows, vec![vec!["1".to_string()]]);
    Ok(())
}

#[tokio::test]
async fn scrolling_is_clamped_to_rows() -> Result<()> {
    let frames = Frames::default();
    let results = QueryResults::interactive(frames.clone());

    results
        .change(ChangeMsg {
            added_results: (0..5).map(|i| record(json!({"id": i}))).collect(),
            ..Default::default()
        })
        .await;
    results.scroll(Scroll::By(3)).await;
    results.scroll(Scroll::By(10)).await;
    results.scroll(Scroll::By(-1)).await;
    results.scroll(Scroll::Top).await;
    results.scroll(Scroll::By(-4)).await;
    results.scroll(Scroll::Bottom).await;
    results.close().await?;

    let selected: Vec<usize> = frames
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|(_, status)| status.selected)
        .collect();
    assert_eq!(selected, vec![0, 0, 3, 4, 3, 0, 0, 4]);
    Ok(())
}

#[tokio::test]
async fn quit_ends_the_view() -> Result<()> {
    let results = QueryResults::interactive(NullTable);
    results.sender().send(ViewEvent::Quit).await.unwrap();

    timeout(Duration::from_secs(1), results.closed())
        .await
        .expect("view did not end after quit");
    assert!(results.is_closed());

    // Producers outliving the view are ignored.
    results.change(ChangeMsg::default()).await;
    results.close().await?;
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent() -> Result<()> {
    let results = QueryResults::interactive(NullTable);
    let other = results.clone();
    results.close().await?;
    other.close().await?;
    results.close().await?;
    assert!(results.is_closed());
    Ok(())
}

/// Slow teardown that records its completion.
struct SlowFinish(Arc<AtomicBool>);

impl TableRenderer for SlowFinish {
    fn draw(&mut self, _view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        Ok(())
    }
    fn finish(&mut self, _view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        std::thread::sleep(Duration::from_millis(100));
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_close_waits_for_teardown() {
    let finished = Arc::new(AtomicBool::new(false));
    let results = QueryResults::interactive(SlowFinish(finished.clone()));

    let close_and_check = |results: QueryResults| {
        let finished = finished.clone();
        async move {
            let closed = results.close().await;
            (closed.is_ok(), finished.load(Ordering::SeqCst))
        }
    };
    let (first, second) = tokio::join!(
        close_and_check(results.clone()),
        close_and_check(results.clone())
    );

    assert_eq!(first, (true, true));
    assert_eq!(second, (true, true));
    assert!(results.is_closed());
}

#[tokio::test]
async fn full_queue_blocks_producers() -> Result<()> {
    let (results, view_loop) = QueryResults::queued(NullTable);

    for _ in 0..QUEUE_CAPACITY {
        timeout(Duration::from_millis(100), results.change(ChangeMsg::default()))
            .await
            .expect("send within capacity must not block");
    }
    let blocked = timeout(Duration::from_millis(100), results.change(ChangeMsg::default())).await;
    assert!(blocked.is_err());

    view_loop.spawn();
    timeout(Duration::from_secs(1), results.change(ChangeMsg::default()))
        .await
        .expect("send completes once the loop drains");
    results.close().await?;
    assert_eq!(results.status().batches, QUEUE_CAPACITY + 1);
    Ok(())
}

#[tokio::test]
async fn renderer_failure_is_reported_on_close() {
    let results = QueryResults::interactive(Broken);
    results
        .change(ChangeMsg {
            added_results: vec![record(json!({"id": 1}))],
            ..Default::default()
        })
        .await;

    timeout(Duration::from_secs(1), results.closed())
        .await
        .expect("view ends after a renderer failure");
    assert!(matches!(results.close().await, Err(Error::IO(_))));
    assert!(results.close().await.is_ok());
}
