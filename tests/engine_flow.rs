//! End-to-end flow: raw shell events in, recommendations and suggestions out.

use remindos::db::EngineDb;
use remindos::ingest::{self, RawInteraction, RawTaskCreation};
use remindos::types::SlotQuery;
use remindos::{EngineConfig, PatternEngine, SlotEngine};

const MS_PER_MIN: i64 = 60_000;
const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;
// Monday 2026-08-03 09:30 UTC.
const MONDAY_0930: i64 = 1_785_749_400_000;
// Tuesday 2026-08-04 09:00 UTC — dow 2, bin 18.
const TUESDAY_0900: i64 = 1_785_834_000_000;

fn flow_db() -> EngineDb {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("flow.db");
    std::mem::forget(dir);
    EngineDb::open_at(path).expect("open test database")
}

#[test]
fn reacting_quickly_earns_the_slot_the_next_reminder() {
    let db = flow_db();
    let cfg = EngineConfig {
        epsilon: 0.0,
        ..Default::default()
    };
    let mut engine = SlotEngine::with_seed(&db, cfg, 11);

    // Six Tuesday-morning reminders, each opened within two minutes
    for week in 0..6i64 {
        let delivered = TUESDAY_0900 - week * MS_PER_WEEK;
        let raw = RawInteraction {
            task_id: "standup-notes".into(),
            category: "Work".into(),
            delivered_at: delivered,
            opened_at: Some(delivered + 2 * MS_PER_MIN),
            action: "open".into(),
            priority01: 0.7,
            due_in_min_at_delivery: None,
            is_silent: false,
        };
        let ev = ingest::normalize_interaction(&raw, 0).expect("canonical event");
        engine.log_event(&ev, delivered).expect("log");
    }

    let query = SlotQuery {
        category: "Work".into(),
        priority01: 0.7,
        due_at: None,
        est_duration_ms: None,
        context: None,
    };
    let rec = engine.optimal_slot(&query, MONDAY_0930);
    assert_eq!((rec.day_of_week, rec.bin), (2, 18), "the learned slot wins");
    assert!((rec.confidence - 0.4).abs() < 1e-9);
    assert!(!rec.reason.is_empty());

    let overview = engine.engagement_overview();
    assert_eq!(overview.delivered, 6);
    assert!(overview.p_open_5m > 0.7);

    // And the slot produces learned snooze options
    let options = engine.snooze_options("Work", 2, 18);
    assert_eq!(options.len(), 3);
}

#[test]
fn weekly_habit_turns_into_a_monday_suggestion() {
    let db = flow_db();
    let engine = PatternEngine::new(&db, EngineConfig::default());

    // "Buy milk" created four Mondays in a row around 09:30
    for week in 0..4i64 {
        let raw = RawTaskCreation {
            title: "Buy milk".into(),
            category: "Groceries".into(),
            due_at: None,
            created_at: MONDAY_0930 - (3 - week) * MS_PER_WEEK,
        };
        let ev = ingest::normalize_task_creation(&raw).expect("creation");
        engine.log_task_creation(&ev).expect("detect");
    }

    let plans = engine
        .plan_suggestions(7, MONDAY_0930 + MS_PER_DAY)
        .expect("plan");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].target_label, "Monday");
    assert_eq!(plans[0].display_title, "Buy milk");
    assert!(plans[0].rationale.contains("weekly"));
    assert!(plans[0].fire_at > MONDAY_0930 + MS_PER_DAY);
}
