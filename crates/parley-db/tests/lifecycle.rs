use parley_db::models::{NewUser, Table};
use parley_db::{Database, DbError};

fn register(db: &Database, username: &str) -> String {
    db.create_user(&NewUser {
        username,
        email: &format!("{}@example.com", username),
        role: "guest",
        password_hash: "not-a-real-hash",
    })
    .unwrap()
    .id
}

fn counts(db: &Database) -> (u64, u64, u64) {
    (
        db.count_rows(Table::Messages).unwrap(),
        db.count_rows(Table::Notifications).unwrap(),
        db.count_rows(Table::MessageHistory).unwrap(),
    )
}

#[test]
fn send_edit_and_delete_sender() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "alice");
    let b = register(&db, "bob");

    let msg = db.create_message(&a, &b, "hi").unwrap();
    assert_eq!(counts(&db), (1, 1, 0));
    let notes = db.get_notifications(&b, false).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].user_id, b);

    let edited = db.edit_content(&msg.id, "hi there", &a).unwrap();
    assert!(edited.edited);
    let history = db.get_history(&msg.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_content, "hi");
    assert_eq!(history[0].editor_id, a);
    assert_eq!(counts(&db), (1, 1, 1));

    db.edit_content(&msg.id, "hi there", &a).unwrap();
    assert_eq!(counts(&db), (1, 1, 1));

    db.delete_user(&a).unwrap();
    assert_eq!(counts(&db), (0, 0, 0));
    assert!(db.get_user_by_id(&b).unwrap().is_some());
}

#[test]
fn deleting_the_receiver_also_removes_the_message() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "alice");
    let b = register(&db, "bob");

    let msg = db.create_message(&a, &b, "hi").unwrap();
    db.edit_content(&msg.id, "hello", &a).unwrap();

    let report = db.delete_user(&b).unwrap();
    assert_eq!((report.messages, report.notifications, report.histories), (1, 1, 1));
    assert!(db.get_message(&msg.id).unwrap().is_none());
    assert_eq!(counts(&db), (0, 0, 0));

    assert!(matches!(
        db.edit_content(&msg.id, "too late", &a),
        Err(DbError::NotFound { .. })
    ));
}

#[test]
fn timeline_reconstructs_from_history() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "alice");
    let b = register(&db, "bob");

    let versions = ["draft", "second", "third", "final"];
    let msg = db.create_message(&a, &b, versions[0]).unwrap();
    for (i, v) in versions.iter().enumerate().skip(1) {
        let editor = if i % 2 == 0 { &a } else { &b };
        db.edit_content(&msg.id, v, editor).unwrap();
    }

    let current = db.get_message(&msg.id).unwrap().unwrap();
    let mut timeline: Vec<String> = db
        .get_history(&msg.id)
        .unwrap()
        .into_iter()
        .rev()
        .map(|h| h.old_content)
        .collect();
    timeline.push(current.content);

    assert_eq!(timeline, versions);
}
