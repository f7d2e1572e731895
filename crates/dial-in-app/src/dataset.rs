//! In-memory snapshot of every stored record.

use std::collections::BTreeMap;

use dial_in_core::id::{CategoryId, EventId, RuleId, TaskId, UserId};
use dial_in_core::{Category, Event, Rule, Task, User};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// All records, keyed by id. Serialized as-is by the JSON store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Registered users.
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    /// Categories of every user.
    #[serde(default)]
    pub categories: BTreeMap<CategoryId, Category>,
    /// Rules with canonical patterns.
    #[serde(default)]
    pub rules: BTreeMap<RuleId, Rule>,
    /// Manual and generated tasks.
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    /// Manual and generated events.
    #[serde(default)]
    pub events: BTreeMap<EventId, Event>,
}

/// Number of rows whose reference was cleared by a deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orphaned {
    /// Rules that lost their category.
    pub rules: usize,
    /// Tasks that lost the deleted reference.
    pub tasks: usize,
    /// Events that lost the deleted reference.
    pub events: usize,
}

impl Dataset {
    /// Find a user by exact username.
    #[must_use]
    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.values().find(|user| user.username == username)
    }

    /// Remove a rule and clear the `rule` reference on its tasks and events.
    pub fn remove_rule(&mut self, id: RuleId) -> Option<(Rule, Orphaned)> {
        let rule = self.rules.remove(&id)?;
        let mut orphaned = Orphaned::default();
        for task in self.tasks.values_mut().filter(|task| task.rule == Some(id)) {
            task.rule = None;
            orphaned.tasks += 1;
        }
        for event in self.events.values_mut().filter(|event| event.rule == Some(id)) {
            event.rule = None;
            orphaned.events += 1;
        }
        Some((rule, orphaned))
    }

    /// Remove a category and clear the `category` reference everywhere.
    pub fn remove_category(&mut self, id: CategoryId) -> Option<(Category, Orphaned)> {
        let category = self.categories.remove(&id)?;
        let mut orphaned = Orphaned::default();
        for rule in self.rules.values_mut().filter(|rule| rule.category == Some(id)) {
            rule.category = None;
            orphaned.rules += 1;
        }
        for task in self.tasks.values_mut().filter(|task| task.category == Some(id)) {
            task.category = None;
            orphaned.tasks += 1;
        }
        for event in self.events.values_mut().filter(|event| event.category == Some(id)) {
            event.category = None;
            orphaned.events += 1;
        }
        Some((category, orphaned))
    }

    /// Due dates of tasks already generated from `rule`.
    pub fn task_instants(&self, rule: RuleId) -> impl Iterator<Item = OffsetDateTime> + '_ {
        self.tasks
            .values()
            .filter(move |task| task.rule == Some(rule))
            .filter_map(|task| task.due_date)
    }

    /// Start times of events already generated from `rule`.
    pub fn event_instants(&self, rule: RuleId) -> impl Iterator<Item = OffsetDateTime> + '_ {
        self.events
            .values()
            .filter(move |event| event.rule == Some(rule))
            .map(|event| event.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn seeded() -> (Dataset, UserId, CategoryId, RuleId) {
        let mut data = Dataset::default();
        let user = User::new("alice");
        let user_id = user.id;
        data.users.insert(user.id, user);

        let category = Category {
            id: CategoryId::new(),
            user: user_id,
            name: "Home".into(),
            description: None,
            created_at: datetime!(2024-01-01 0:00 UTC),
        };
        let category_id = category.id;
        data.categories.insert(category.id, category);

        let rule = Rule {
            id: RuleId::new(),
            user: user_id,
            category: Some(category_id),
            name: "Bins".into(),
            description: None,
            rate_pattern: "w#2T#07:00".into(),
            is_active: true,
            created_at: datetime!(2024-01-01 0:00 UTC),
        };
        let rule_id = rule.id;
        data.rules.insert(rule.id, rule);

        let task = Task {
            id: TaskId::new(),
            user: user_id,
            title: "Bins".into(),
            description: None,
            category: Some(category_id),
            rule: Some(rule_id),
            is_completed: false,
            due_date: Some(datetime!(2024-01-02 7:00 UTC)),
            created_at: datetime!(2024-01-01 0:00 UTC),
            completed_at: None,
        };
        data.tasks.insert(task.id, task);

        let event = Event {
            id: EventId::new(),
            user: user_id,
            title: "Bins".into(),
            description: None,
            category: None,
            rule: Some(rule_id),
            start_time: datetime!(2024-01-09 7:00 UTC),
            end_time: None,
            created_at: datetime!(2024-01-01 0:00 UTC),
        };
        data.events.insert(event.id, event);

        (data, user_id, category_id, rule_id)
    }

    #[test]
    fn removing_a_rule_orphans_generated_rows() {
        let (mut data, _, _, rule_id) = seeded();
        let (rule, orphaned) = data
            .remove_rule(rule_id)
            .unwrap_or_else(|| panic!("rule should exist"));
        assert_eq!(rule.id, rule_id);
        assert_eq!(orphaned, Orphaned { rules: 0, tasks: 1, events: 1 });
        assert!(data.tasks.values().all(|task| task.rule.is_none()));
        assert!(data.events.values().all(|event| event.rule.is_none()));
        assert!(data.remove_rule(rule_id).is_none());
    }

    #[test]
    fn removing_a_category_clears_references() {
        let (mut data, _, category_id, _) = seeded();
        let (_, orphaned) = data
            .remove_category(category_id)
            .unwrap_or_else(|| panic!("category should exist"));
        assert_eq!(orphaned, Orphaned { rules: 1, tasks: 1, events: 0 });
        assert!(data.rules.values().all(|rule| rule.category.is_none()));
    }

    #[test]
    fn generated_instants_are_listed_per_rule() {
        let (data, _, _, rule_id) = seeded();
        assert_eq!(
            data.task_instants(rule_id).collect::<Vec<_>>(),
            [datetime!(2024-01-02 7:00 UTC)]
        );
        assert_eq!(
            data.event_instants(rule_id).collect::<Vec<_>>(),
            [datetime!(2024-01-09 7:00 UTC)]
        );
        assert_eq!(data.task_instants(RuleId::new()).count(), 0);
    }

    #[test]
    fn user_lookup_is_exact() {
        let (data, user_id, _, _) = seeded();
        assert_eq!(data.user_by_name("alice").map(|user| user.id), Some(user_id));
        assert!(data.user_by_name("Alice").is_none());
    }

    #[test]
    fn json_roundtrip_preserves_every_table() {
        let (data, ..) = seeded();
        let json = serde_json::to_string(&data).unwrap_or_else(|err| panic!("serialize: {err}"));
        let back: Dataset = serde_json::from_str(&json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, data);
        let empty: Dataset = serde_json::from_str("{}").unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(empty, Dataset::default());
    }
}
