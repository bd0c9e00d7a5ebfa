//! Feed integration tests over the SQLite event store

mod common;

use common::{feed_over, new_event, wait_for_state};
use eventorias_lib::feed::{FeedError, FeedStatus, SortMode};
use eventorias_lib::repository::EventRepository;

fn titles(state: &eventorias_lib::feed::FeedState) -> Vec<String> {
    state.events.iter().map(|e| e.title.clone()).collect()
}

#[tokio::test]
async fn test_empty_store_reports_no_events() {
    let repo = EventRepository::open_in_memory().expect("repository");
    let feed = feed_over(&repo, None).await;

    let state = feed.state();
    assert_eq!(state.status, FeedStatus::Error(FeedError::Empty));
    assert_eq!(state.status.error_message(), Some("No events found."));
    feed.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_soon_and_finished_buckets() {
    let repo = EventRepository::open_in_memory().expect("repository");
    repo.create_event(new_event("Gala", "01/01/2099")).unwrap();
    repo.create_event(new_event("Past", "01/01/2000")).unwrap();

    let feed = feed_over(&repo, None).await;
    assert_eq!(titles(&feed.state()), vec!["Gala"]);

    let finished = feed
        .update_sort_option(SortMode::Finished, None)
        .await
        .expect("feed running");
    assert_eq!(titles(&finished), vec!["Past"]);
    feed.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_writes_flow_into_the_feed() {
    let repo = EventRepository::open_in_memory().expect("repository");
    repo.create_event(new_event("Conference", "05/05/2099")).unwrap();
    let feed = feed_over(&repo, Some("u1")).await;
    let mut rx = feed.watch();

    let party = repo.create_event(new_event("Birthday Party", "04/04/2099")).unwrap();
    let state = wait_for_state(&mut rx, |s| s.events.len() == 2).await;
    assert_eq!(titles(&state), vec!["Birthday Party", "Conference"]);

    let state = feed
        .update_sort_option(SortMode::Soon, Some("part"))
        .await
        .expect("feed running");
    assert_eq!(titles(&state), vec!["Birthday Party"]);

    feed.update_sort_option(SortMode::Participate, None)
        .await
        .expect("feed running");
    repo.join_event(&party.id, "u1").unwrap();
    let state = wait_for_state(&mut rx, |s| s.events.len() == 1).await;
    assert_eq!(titles(&state), vec!["Birthday Party"]);

    repo.leave_event(&party.id, "u1").unwrap();
    let state = wait_for_state(&mut rx, |s| s.events.is_empty()).await;
    assert!(matches!(state.status, FeedStatus::Success(ref all) if all.len() == 2));

    feed.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_deleting_last_event_reports_no_events() {
    let repo = EventRepository::open_in_memory().expect("repository");
    let gala = repo.create_event(new_event("Gala", "01/01/2099")).unwrap();
    let feed = feed_over(&repo, None).await;
    let mut rx = feed.watch();

    repo.delete_event(&gala.id).unwrap();
    let state = wait_for_state(&mut rx, |s| matches!(s.status, FeedStatus::Error(_))).await;
    assert_eq!(state.status, FeedStatus::Error(FeedError::Empty));
    assert!(state.events.is_empty());
    feed.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_descending_direction() {
    let repo = EventRepository::open_in_memory().expect("repository");
    repo.create_event(new_event("Spring", "03/20/2099")).unwrap();
    repo.create_event(new_event("Winter", "12/21/2099")).unwrap();
    repo.create_event(new_event("Summer", "06/21/2099")).unwrap();
    let feed = feed_over(&repo, None).await;

    assert_eq!(titles(&feed.state()), vec!["Spring", "Summer", "Winter"]);
    let state = feed.set_date_sorting_type(false).await.expect("feed running");
    assert_eq!(titles(&state), vec!["Winter", "Summer", "Spring"]);
    feed.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_shutdown_releases_store_subscription() {
    let repo = EventRepository::open_in_memory().expect("repository");
    repo.create_event(new_event("Gala", "01/01/2099")).unwrap();
    let feed = feed_over(&repo, None).await;
    assert_eq!(repo.subscriber_count(), 1);

    feed.shutdown().await.expect("shutdown");
    assert_eq!(repo.subscriber_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_leave_feed_on_latest_snapshot() {
    const WRITERS: usize = 8;

    let repo = EventRepository::open_in_memory().expect("repository");
    let gala = repo.create_event(new_event("Gala", "01/01/2099")).unwrap();
    let feed = feed_over(&repo, Some("u0")).await;
    let mut rx = feed.watch();

    let writers: Vec<_> = (0..WRITERS)
        .map(|i| {
            let repo = repo.clone();
            let gala_id = gala.id.clone();
            tokio::task::spawn_blocking(move || {
                repo.create_event(new_event(&format!("Meetup {i}"), "02/02/2099"))
                    .unwrap();
                repo.join_event(&gala_id, &format!("u{i}")).unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.await.expect("writer thread");
    }

    let state = wait_for_state(&mut rx, |s| {
        matches!(&s.status, FeedStatus::Success(all)
            if all.len() == WRITERS + 1 && all[0].participants.len() == WRITERS)
    })
    .await;
    assert_eq!(state.status, FeedStatus::Success(repo.list_events().unwrap()));

    let state = feed
        .update_sort_option(SortMode::Participate, None)
        .await
        .expect("feed running");
    assert_eq!(titles(&state), vec!["Gala"]);
    feed.shutdown().await.expect("shutdown");
}
