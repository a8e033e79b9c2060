//! Reminder collection, filtering and due alerts end to end.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use remindr::api::types::{Reminder, ReminderCreate, ReminderUpdate};
use remindr::reminders::countdown::{AlertMonitor, Notifier, DUE_LABEL};
use remindr::reminders::filter::{apply, ReminderFilter, SortKey};
use remindr::reminders::format_countdown;

use common::logged_in;

/// Records every alert it is asked to show
#[derive(Default)]
struct RecordingNotifier {
    permission: bool,
    asked: Mutex<usize>,
    shown: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn allowing() -> Arc<Self> {
        Arc::new(Self {
            permission: true,
            ..Default::default()
        })
    }

    fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn request_permission(&self) -> bool {
        *self.asked.lock().unwrap() += 1;
        self.permission
    }

    fn notify(&self, reminder: &Reminder) {
        self.shown.lock().unwrap().push(reminder.title.clone());
    }
}

#[test]
fn test_countdown_labels() {
    let now = Utc::now();
    let due = now + ChronoDuration::seconds(3661);
    assert_eq!(format_countdown(now, due), "01:01:01 left");
    assert_eq!(format_countdown(now, now), DUE_LABEL);
    assert_eq!(format_countdown(now, now - ChronoDuration::minutes(5)), DUE_LABEL);
}

#[tokio::test]
async fn test_created_reminders_round_trip_through_list() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let when = Utc::now() + ChronoDuration::hours(3);

    let mut store = store.lock().await;
    let mut payload = ReminderCreate::new("Water plants", when);
    payload.description = Some("balcony".to_string());
    let created = store.create(&token, &payload).await.unwrap();

    store.clear();
    let listed = store.refresh(&token).await.unwrap().to_vec();
    assert_eq!(listed, vec![created]);
    assert_eq!(listed[0].scheduled_for, when);
}

#[tokio::test]
async fn test_filters_and_sorting_on_refreshed_list() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let now = Utc::now();
    let mut store = store.lock().await;

    let later = store
        .create(&token, &ReminderCreate::new("later", now + ChronoDuration::days(2)))
        .await
        .unwrap();
    let mut urgent = ReminderCreate::new("Urgent", now + ChronoDuration::hours(1));
    urgent.is_important = true;
    let urgent = store.create(&token, &urgent).await.unwrap();
    let past = store
        .create(&token, &ReminderCreate::new("archive", now - ChronoDuration::days(1)))
        .await
        .unwrap();
    store.complete(&token, past.id).await.unwrap();

    store.refresh(&token).await.unwrap();
    let all = store.reminders();

    let upcoming = apply(all, ReminderFilter::Upcoming, SortKey::Date, now);
    assert_eq!(
        upcoming.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![urgent.id, later.id]
    );

    let completed = apply(all, ReminderFilter::Completed, SortKey::Date, now);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, past.id);

    let important = apply(all, ReminderFilter::Important, SortKey::Date, now);
    assert_eq!(important.len(), 1);
    assert_eq!(important[0].id, urgent.id);

    let by_title = apply(all, ReminderFilter::All, SortKey::Title, now);
    assert_eq!(
        by_title.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
        vec!["archive", "later", "Urgent"]
    );
}

#[tokio::test]
async fn test_due_reminder_alerts_once_and_again_after_reschedule() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let now = Utc::now();
    let due = store
        .lock()
        .await
        .create(&token, &ReminderCreate::new("Stretch", now + ChronoDuration::seconds(1)))
        .await
        .unwrap();

    let notifier = RecordingNotifier::allowing();
    let mut monitor = AlertMonitor::new(store.clone(), notifier.clone(), Duration::from_secs(1));

    let before = monitor.check(now).await;
    assert!(before.alerted.is_empty());
    assert_eq!(before.countdowns[0].countdown, "00:00:01 left");

    let first = monitor.check(now + ChronoDuration::seconds(2)).await;
    assert_eq!(first.alerted.len(), 1);
    let second = monitor.check(now + ChronoDuration::seconds(3)).await;
    assert!(second.alerted.is_empty(), "alerts fire once per reminder");

    let update = ReminderUpdate {
        scheduled_for: Some(now + ChronoDuration::seconds(10)),
        ..Default::default()
    };
    store.lock().await.update(&token, due.id, &update).await.unwrap();

    let rescheduled = monitor.check(now + ChronoDuration::seconds(11)).await;
    assert_eq!(rescheduled.alerted.len(), 1);
    assert_eq!(notifier.shown(), vec!["Stretch", "Stretch"]);
    assert_eq!(*notifier.asked.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_completed_reminders_never_alert() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let now = Utc::now();
    {
        let mut guard = store.lock().await;
        let done = guard
            .create(&token, &ReminderCreate::new("Done already", now + ChronoDuration::seconds(1)))
            .await
            .unwrap();
        guard.complete(&token, done.id).await.unwrap();
    }

    let notifier = RecordingNotifier::allowing();
    let mut monitor = AlertMonitor::new(store, notifier.clone(), Duration::from_secs(1));
    let report = monitor.check(now + ChronoDuration::minutes(1)).await;
    assert!(report.alerted.is_empty());
    assert!(report.countdowns.is_empty());
    assert!(notifier.shown().is_empty());
}

#[tokio::test]
async fn test_denied_permission_still_reports_due() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let now = Utc::now();
    store
        .lock()
        .await
        .create(&token, &ReminderCreate::new("Quiet", now))
        .await
        .unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let mut monitor = AlertMonitor::new(store, notifier.clone(), Duration::from_secs(1));
    monitor.check(now - ChronoDuration::seconds(1)).await;
    let report = monitor.check(now + ChronoDuration::seconds(1)).await;

    assert_eq!(report.alerted.len(), 1);
    assert!(notifier.shown().is_empty());
}

#[tokio::test]
async fn test_stale_overdue_reminder_stays_quiet_until_rescheduled() {
    let (_backend, session, store) = logged_in().await;
    let token = session.token().unwrap();
    let now = Utc::now();
    let stale = store
        .lock()
        .await
        .create(
            &token,
            &ReminderCreate::new("Last week's dentist", now - ChronoDuration::days(7)),
        )
        .await
        .unwrap();

    let notifier = RecordingNotifier::allowing();
    let mut monitor = AlertMonitor::new(store.clone(), notifier.clone(), Duration::from_secs(1));
    let report = monitor.check(now).await;
    assert!(report.alerted.is_empty());
    assert_eq!(report.countdowns[0].countdown, DUE_LABEL);
    assert!(notifier.shown().is_empty());

    let update = ReminderUpdate {
        scheduled_for: Some(now + ChronoDuration::seconds(30)),
        ..Default::default()
    };
    store.lock().await.update(&token, stale.id, &update).await.unwrap();
    assert!(monitor.check(now + ChronoDuration::seconds(1)).await.alerted.is_empty());

    let due = monitor.check(now + ChronoDuration::seconds(31)).await;
    assert_eq!(due.alerted.len(), 1);
    assert_eq!(notifier.shown(), vec!["Last week's dentist"]);
}
