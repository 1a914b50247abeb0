//! Notification inbox operations.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::collections::NOTIFICATIONS;
use super::{Database, DbError, DbResult, Direction, Filter, Query};
use crate::models::{Notification, NotificationType};

impl Database {
    /// Get a notification by ID.
    pub fn get_notification(&self, id: &str) -> DbResult<Option<Notification>> {
        self.get_document(NOTIFICATIONS, id)?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// List a user's notifications, newest first.
    pub fn notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> DbResult<Vec<Notification>> {
        let mut query = Query::new(NOTIFICATIONS)
            .filter(Filter::eq("user_id", user_id))
            .order_by_time("created_at", Direction::Desc)
            .limit(limit);
        if unread_only {
            query = query.filter(Filter::eq("read", false));
        }

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Count a user's unread notifications.
    pub fn unread_notification_count(&self, user_id: &str) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE collection = ?1
              AND json_extract(body, '$.user_id') = ?2
              AND json_extract(body, '$.read') = 0
            "#,
            rusqlite::params![NOTIFICATIONS, user_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Unread notifications of one type that point at an appointment.
    pub fn unread_notifications_for_appointment(
        &self,
        user_id: &str,
        kind: NotificationType,
        appointment_id: &str,
    ) -> DbResult<Vec<Notification>> {
        let query = Query::new(NOTIFICATIONS)
            .filter(Filter::eq("user_id", user_id))
            .filter(Filter::eq("type", kind.as_str()))
            .filter(Filter::eq("data.appointment_id", appointment_id))
            .filter(Filter::eq("read", false));

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Mark a notification read. Marking twice is a no-op.
    pub fn mark_notification_read(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let notification = self
            .get_notification(id)?
            .ok_or_else(|| DbError::NotFound(format!("{}/{}", NOTIFICATIONS, id)))?;
        if notification.read {
            return Ok(());
        }
        self.update_document(NOTIFICATIONS, id, &json!({"read": true, "read_at": now}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn store(db: &Database, notification: &Notification) {
        db.set_document(
            NOTIFICATIONS,
            &notification.id,
            &serde_json::to_value(notification).unwrap(),
        )
        .unwrap();
    }

    fn make(user: &str, kind: NotificationType, appointment: &str) -> Notification {
        Notification::new(
            user,
            UserRole::Donor,
            kind,
            "title",
            "message",
            json!({"appointment_id": appointment}),
            Utc::now(),
        )
    }

    #[test]
    fn test_inbox_and_unread_count() {
        let db = Database::open_in_memory().unwrap();
        let n1 = make("u1", NotificationType::MatchFound, "a1");
        let n2 = make("u1", NotificationType::MatchFound, "a2");
        let n3 = make("u2", NotificationType::MatchFound, "a3");
        store(&db, &n1);
        store(&db, &n2);
        store(&db, &n3);

        assert_eq!(db.unread_notification_count("u1").unwrap(), 2);
        assert_eq!(db.notifications_for_user("u1", false, 10).unwrap().len(), 2);
        assert_eq!(db.notifications_for_user("u1", false, 1).unwrap().len(), 1);

        db.mark_notification_read(&n1.id, Utc::now()).unwrap();
        assert_eq!(db.unread_notification_count("u1").unwrap(), 1);

        let unread = db.notifications_for_user("u1", true, 10).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, n2.id);

        let read = db.get_notification(&n1.id).unwrap().unwrap();
        assert!(read.read);
        assert!(read.read_at.is_some());
    }

    #[test]
    fn test_inbox_newest_first_with_subsecond_times() {
        let db = Database::open_in_memory().unwrap();
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);

        let mut old = make("u1", NotificationType::MatchFound, "a1");
        old.title = "old".into();
        old.created_at = at("2024-06-01T10:00:00Z");
        let mut new = make("u1", NotificationType::MatchFound, "a2");
        new.title = "new".into();
        new.created_at = at("2024-06-01T10:00:00.500Z");
        let mut middle = make("u1", NotificationType::MatchFound, "a3");
        middle.title = "middle".into();
        middle.created_at = at("2024-06-01T10:00:00.000250Z");
        store(&db, &old);
        store(&db, &new);
        store(&db, &middle);

        let inbox = db.notifications_for_user("u1", false, 10).unwrap();
        let titles: Vec<&str> = inbox.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "middle", "old"]);
    }

    #[test]
    fn test_mark_read_idempotent_and_missing() {
        let db = Database::open_in_memory().unwrap();
        let n = make("u1", NotificationType::MatchFound, "a1");
        store(&db, &n);

        db.mark_notification_read(&n.id, Utc::now()).unwrap();
        let first = db.get_notification(&n.id).unwrap().unwrap().read_at;
        db.mark_notification_read(&n.id, Utc::now()).unwrap();
        assert_eq!(db.get_notification(&n.id).unwrap().unwrap().read_at, first);

        let result = db.mark_notification_read("missing", Utc::now());
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_unread_for_appointment() {
        let db = Database::open_in_memory().unwrap();
        store(&db, &make("u1", NotificationType::MatchFound, "a1"));
        store(&db, &make("u1", NotificationType::DonorMatched, "a1"));
        store(&db, &make("u1", NotificationType::MatchFound, "a2"));

        let found = db
            .unread_notifications_for_appointment("u1", NotificationType::MatchFound, "a1")
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
