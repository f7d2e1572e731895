//! Record management and rule materialization shared by every frontend.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use dial_in_core::id::{CategoryId, EventId, RuleId, TaskId, UserId};
use dial_in_core::{Category, Event, Occurrence, RecurrencePattern, Rule, Task, User, decode, expand};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::config::{ExpansionConfig, GenerationConfig, ProjectConfig};
use crate::dataset::{Dataset, Orphaned};
use crate::error::{RecordKind, ServiceError};
use crate::pattern_api::{Expansion, check_window};
use crate::pattern_cache::PatternCache;
use crate::record_patch::{
    CategoryUpdate, EventUpdate, NewCategory, NewEvent, NewRule, NewTask, RuleUpdate, TaskUpdate,
};
use crate::store::RecordStore;
use crate::window::Window;

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Rows created by one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated<T> {
    /// Newly created rows, ascending by occurrence.
    pub created: Vec<T>,
    /// Occurrences that already had a row for the same rule and instant.
    pub skipped: usize,
}

/// Validates inputs, enforces ownership and persists through a [`RecordStore`].
///
/// Every mutation loads a fresh snapshot, applies the change and saves it while
/// holding an internal lock, so concurrent callers on one service never lose
/// writes.
pub struct PlannerService<S> {
    store: S,
    expansion: ExpansionConfig,
    generation: GenerationConfig,
    patterns: PatternCache,
    write_lock: Mutex<()>,
}

impl<S> PlannerService<S>
where
    S: RecordStore,
{
    /// Construct a service over `store` using the bounds from `config`.
    pub fn new(store: S, config: &ProjectConfig) -> Self {
        Self {
            store,
            expansion: config.expansion,
            generation: config.generation,
            patterns: PatternCache::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Access the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn snapshot(&self) -> ServiceResult<Dataset> {
        self.store.load().map_err(ServiceError::store)
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Dataset) -> ServiceResult<T>) -> ServiceResult<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut data = self.snapshot()?;
        let out = change(&mut data)?;
        self.store.save(&data).map_err(ServiceError::store)?;
        Ok(out)
    }

    // Users -----------------------------------------------------------------

    /// Register a new user with a unique username.
    ///
    /// # Errors
    /// Fails when the username is blank or already taken.
    pub fn register_user(&self, username: &str) -> ServiceResult<User> {
        let username = required("username", username)?;
        self.mutate(|data| {
            if data.user_by_name(&username).is_some() {
                return Err(ServiceError::UsernameTaken { username });
            }
            let user = User::new(username);
            data.users.insert(user.id, user.clone());
            info!(user = %user.id, username = %user.username, "registered user");
            Ok(user)
        })
    }

    /// Every registered user in registration order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.snapshot()?.users.into_values().collect())
    }

    /// Look a user up by username.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown usernames.
    pub fn user_by_name(&self, username: &str) -> ServiceResult<User> {
        self.snapshot()?
            .user_by_name(username.trim())
            .cloned()
            .ok_or_else(|| ServiceError::not_found(RecordKind::User, username.trim()))
    }

    // Categories ------------------------------------------------------------

    /// Create a category owned by `user`.
    ///
    /// # Errors
    /// Fails for unknown users and blank names.
    pub fn create_category(&self, user: UserId, input: NewCategory) -> ServiceResult<Category> {
        let name = required("name", &input.name)?;
        self.mutate(|data| {
            ensure_user(data, user)?;
            let category = Category {
                id: CategoryId::new(),
                user,
                name,
                description: input.description,
                created_at: OffsetDateTime::now_utc(),
            };
            data.categories.insert(category.id, category.clone());
            info!(category = %category.id, %user, "created category");
            Ok(category)
        })
    }

    /// Categories owned by `user`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn categories(&self, user: UserId) -> ServiceResult<Vec<Category>> {
        let data = self.snapshot()?;
        Ok(data.categories.into_values().filter(|c| c.user == user).collect())
    }

    /// Apply `update` to a category owned by `user`.
    ///
    /// # Errors
    /// Fails when the category is unknown or the new name is blank.
    pub fn update_category(&self, user: UserId, id: CategoryId, update: CategoryUpdate) -> ServiceResult<Category> {
        let name = update.name.as_deref().map(|name| required("name", name)).transpose()?;
        self.mutate(|data| {
            let category = data
                .categories
                .get_mut(&id)
                .filter(|c| c.user == user)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Category, id))?;
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(patch) = update.description {
                patch.apply(&mut category.description);
            }
            Ok(category.clone())
        })
    }

    /// Delete a category, clearing it from rules, tasks and events.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown categories.
    pub fn delete_category(&self, user: UserId, id: CategoryId) -> ServiceResult<Orphaned> {
        self.mutate(|data| {
            ensure_owned(data.categories.get(&id).map(|c| c.user), user, RecordKind::Category, id)?;
            let (_, orphaned) = data
                .remove_category(id)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Category, id))?;
            info!(category = %id, rules = orphaned.rules, tasks = orphaned.tasks, events = orphaned.events, "deleted category");
            Ok(orphaned)
        })
    }

    // Rules -----------------------------------------------------------------

    /// Create a rule; the pattern is validated and stored canonically.
    ///
    /// # Errors
    /// Fails with a pattern error for malformed or out-of-range patterns, and
    /// for unknown users or categories.
    pub fn create_rule(&self, user: UserId, input: NewRule) -> ServiceResult<Rule> {
        let name = required("name", &input.name)?;
        let pattern = decode(input.rate_pattern.trim())?;
        self.mutate(|data| {
            ensure_user(data, user)?;
            if let Some(category) = input.category {
                ensure_category(data, user, category)?;
            }
            let rule = Rule {
                id: RuleId::new(),
                user,
                category: input.category,
                name,
                description: input.description,
                rate_pattern: pattern.to_string(),
                is_active: input.is_active,
                created_at: OffsetDateTime::now_utc(),
            };
            data.rules.insert(rule.id, rule.clone());
            info!(rule = %rule.id, %user, rate_pattern = %rule.rate_pattern, "created rule");
            Ok(rule)
        })
    }

    /// Rules owned by `user`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn rules(&self, user: UserId) -> ServiceResult<Vec<Rule>> {
        let data = self.snapshot()?;
        Ok(data.rules.into_values().filter(|rule| rule.user == user).collect())
    }

    /// Fetch one rule owned by `user`.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown rules.
    pub fn rule(&self, user: UserId, id: RuleId) -> ServiceResult<Rule> {
        let data = self.snapshot()?;
        owned_rule(&data, user, id).cloned()
    }

    /// Apply `update` to a rule. A new pattern is validated before storing.
    ///
    /// # Errors
    /// Fails for unknown rules or categories, blank names and invalid patterns.
    pub fn update_rule(&self, user: UserId, id: RuleId, update: RuleUpdate) -> ServiceResult<Rule> {
        let name = update.name.as_deref().map(|name| required("name", name)).transpose()?;
        let pattern = update
            .rate_pattern
            .as_deref()
            .map(|raw| decode(raw.trim()))
            .transpose()?;
        let rule = self.mutate(|data| {
            if let Some(category) = update.category.as_ref().and_then(|patch| patch.value()) {
                ensure_category(data, user, *category)?;
            }
            let rule = data
                .rules
                .get_mut(&id)
                .filter(|rule| rule.user == user)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Rule, id))?;
            if let Some(name) = name {
                rule.name = name;
            }
            if let Some(pattern) = pattern {
                rule.rate_pattern = pattern.to_string();
            }
            if let Some(patch) = update.description {
                patch.apply(&mut rule.description);
            }
            if let Some(patch) = update.category {
                patch.apply(&mut rule.category);
            }
            if let Some(is_active) = update.is_active {
                rule.is_active = is_active;
            }
            info!(rule = %id, rate_pattern = %rule.rate_pattern, active = rule.is_active, "updated rule");
            Ok(rule.clone())
        })?;
        self.patterns.forget(id);
        Ok(rule)
    }

    /// Delete a rule. Tasks and events generated from it are kept with their
    /// `rule` reference cleared.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown rules.
    pub fn delete_rule(&self, user: UserId, id: RuleId) -> ServiceResult<Orphaned> {
        let orphaned = self.mutate(|data| {
            owned_rule(data, user, id)?;
            let (_, orphaned) = data
                .remove_rule(id)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Rule, id))?;
            info!(rule = %id, tasks = orphaned.tasks, events = orphaned.events, "deleted rule");
            Ok(orphaned)
        })?;
        self.patterns.forget(id);
        Ok(orphaned)
    }

    /// Occurrences of a rule inside `window`, cut at the configured maximum.
    ///
    /// Inactive rules can still be previewed.
    ///
    /// # Errors
    /// Fails for unknown rules, oversized windows and undecodable patterns.
    pub fn expand_rule(&self, user: UserId, id: RuleId, window: Window) -> ServiceResult<Expansion> {
        check_window(&window, &self.expansion)?;
        let data = self.snapshot()?;
        let rule = owned_rule(&data, user, id)?;
        let pattern = self.rule_pattern(rule)?;
        let mut occurrences = expand(&pattern, window.from, window.to)?;
        let collected: Vec<Occurrence> = occurrences.by_ref().take(self.expansion.max_occurrences).collect();
        let truncated = occurrences.next().is_some();
        debug!(rule = %id, count = collected.len(), truncated, "expanded rule");
        Ok(Expansion {
            occurrences: collected,
            truncated,
        })
    }

    fn rule_pattern(&self, rule: &Rule) -> ServiceResult<RecurrencePattern> {
        self.patterns.pattern(rule).map_err(|err| {
            warn!(rule = %rule.id, rate_pattern = %rule.rate_pattern, error = %err, "stored pattern no longer decodes");
            err.into()
        })
    }

    /// Occurrences of an active rule in `window` that have no row yet.
    fn pending(&self, rule: &Rule, window: Window, existing: &BTreeSet<OffsetDateTime>) -> ServiceResult<(Vec<OffsetDateTime>, usize)> {
        if !rule.is_active {
            return Err(ServiceError::InactiveRule { id: rule.id.to_string() });
        }
        check_window(&window, &self.expansion)?;
        let pattern = self.rule_pattern(rule)?;
        let max = self.expansion.max_occurrences;
        let instants: Vec<OffsetDateTime> = expand(&pattern, window.from, window.to)?
            .map(|occurrence| occurrence.at)
            .take(max + 1)
            .collect();
        if instants.len() > max {
            return Err(ServiceError::TooManyOccurrences { max });
        }
        let total = instants.len();
        let fresh: Vec<_> = instants.into_iter().filter(|at| !existing.contains(at)).collect();
        let skipped = total - fresh.len();
        Ok((fresh, skipped))
    }

    /// Materialize one task per occurrence of `rule` in `window`.
    ///
    /// Tasks take the rule's name, category and id, with `due_date` set to the
    /// occurrence. Occurrences that already have a task from this rule are
    /// skipped, so overlapping runs do not duplicate rows.
    ///
    /// # Errors
    /// Fails for unknown or inactive rules, oversized windows and windows with
    /// more occurrences than allowed. Nothing is written on failure.
    pub fn generate_tasks(&self, user: UserId, rule: RuleId, window: Window) -> ServiceResult<Generated<Task>> {
        self.mutate(|data| {
            let rule = owned_rule(data, user, rule)?.clone();
            let existing: BTreeSet<_> = data.task_instants(rule.id).collect();
            let (fresh, skipped) = self.pending(&rule, window, &existing)?;
            let now = OffsetDateTime::now_utc();
            let created: Vec<Task> = fresh
                .into_iter()
                .map(|at| Task {
                    id: TaskId::new(),
                    user,
                    title: rule.name.clone(),
                    description: rule.description.clone(),
                    category: rule.category,
                    rule: Some(rule.id),
                    is_completed: false,
                    due_date: Some(at),
                    created_at: now,
                    completed_at: None,
                })
                .collect();
            data.tasks.extend(created.iter().map(|task| (task.id, task.clone())));
            info!(rule = %rule.id, created = created.len(), skipped, "generated tasks");
            Ok(Generated { created, skipped })
        })
    }

    /// Materialize one event per occurrence of `rule` in `window`.
    ///
    /// Events start at the occurrence and end after the configured event
    /// duration, if any. Duplicate occurrences are skipped as for tasks.
    ///
    /// # Errors
    /// Same as [`generate_tasks`](Self::generate_tasks).
    pub fn generate_events(&self, user: UserId, rule: RuleId, window: Window) -> ServiceResult<Generated<Event>> {
        let duration = self.generation.event_duration();
        self.mutate(|data| {
            let rule = owned_rule(data, user, rule)?.clone();
            let existing: BTreeSet<_> = data.event_instants(rule.id).collect();
            let (fresh, skipped) = self.pending(&rule, window, &existing)?;
            let now = OffsetDateTime::now_utc();
            let created: Vec<Event> = fresh
                .into_iter()
                .map(|at| Event {
                    id: EventId::new(),
                    user,
                    title: rule.name.clone(),
                    description: rule.description.clone(),
                    category: rule.category,
                    rule: Some(rule.id),
                    start_time: at,
                    end_time: duration.map(|length| at + length),
                    created_at: now,
                })
                .collect();
            data.events.extend(created.iter().map(|event| (event.id, event.clone())));
            info!(rule = %rule.id, created = created.len(), skipped, "generated events");
            Ok(Generated { created, skipped })
        })
    }

    // Tasks -----------------------------------------------------------------

    /// Create a task by hand.
    ///
    /// # Errors
    /// Fails for unknown users or categories and blank titles.
    pub fn create_task(&self, user: UserId, input: NewTask) -> ServiceResult<Task> {
        let title = required("title", &input.title)?;
        self.mutate(|data| {
            ensure_user(data, user)?;
            if let Some(category) = input.category {
                ensure_category(data, user, category)?;
            }
            let task = Task {
                id: TaskId::new(),
                user,
                title,
                description: input.description,
                category: input.category,
                rule: None,
                is_completed: false,
                due_date: input.due_date,
                created_at: OffsetDateTime::now_utc(),
                completed_at: None,
            };
            data.tasks.insert(task.id, task.clone());
            info!(task = %task.id, %user, "created task");
            Ok(task)
        })
    }

    /// Tasks owned by `user`, optionally only those generated from `rule`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn tasks(&self, user: UserId, rule: Option<RuleId>) -> ServiceResult<Vec<Task>> {
        let data = self.snapshot()?;
        Ok(data
            .tasks
            .into_values()
            .filter(|task| task.user == user && rule.is_none_or(|rule| task.rule == Some(rule)))
            .collect())
    }

    /// Apply `update` to a task.
    ///
    /// # Errors
    /// Fails for unknown tasks or categories and blank titles.
    pub fn update_task(&self, user: UserId, id: TaskId, update: TaskUpdate) -> ServiceResult<Task> {
        let title = update.title.as_deref().map(|title| required("title", title)).transpose()?;
        self.mutate(|data| {
            if let Some(category) = update.category.as_ref().and_then(|patch| patch.value()) {
                ensure_category(data, user, *category)?;
            }
            let task = owned_task(data, user, id)?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(patch) = update.description {
                patch.apply(&mut task.description);
            }
            if let Some(patch) = update.category {
                patch.apply(&mut task.category);
            }
            if let Some(patch) = update.due_date {
                patch.apply(&mut task.due_date);
            }
            Ok(task.clone())
        })
    }

    /// Mark a task completed now. Completing twice keeps the first time.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown tasks.
    pub fn complete_task(&self, user: UserId, id: TaskId) -> ServiceResult<Task> {
        self.mutate(|data| {
            let task = owned_task(data, user, id)?;
            if !task.is_completed {
                task.complete(OffsetDateTime::now_utc());
                info!(task = %id, "completed task");
            }
            Ok(task.clone())
        })
    }

    /// Mark a task not completed.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown tasks.
    pub fn reopen_task(&self, user: UserId, id: TaskId) -> ServiceResult<Task> {
        self.mutate(|data| {
            let task = owned_task(data, user, id)?;
            task.reopen();
            Ok(task.clone())
        })
    }

    /// Delete a task.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown tasks.
    pub fn delete_task(&self, user: UserId, id: TaskId) -> ServiceResult<Task> {
        self.mutate(|data| {
            ensure_owned(data.tasks.get(&id).map(|task| task.user), user, RecordKind::Task, id)?;
            let task = data
                .tasks
                .remove(&id)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Task, id))?;
            info!(task = %id, "deleted task");
            Ok(task)
        })
    }

    // Events ----------------------------------------------------------------

    /// Create an event by hand.
    ///
    /// # Errors
    /// Fails for unknown users or categories, blank titles, and end times that
    /// are not after the start.
    pub fn create_event(&self, user: UserId, input: NewEvent) -> ServiceResult<Event> {
        let title = required("title", &input.title)?;
        if let Some(end) = input.end_time {
            Window::new(input.start_time, end)?;
        }
        self.mutate(|data| {
            ensure_user(data, user)?;
            if let Some(category) = input.category {
                ensure_category(data, user, category)?;
            }
            let event = Event {
                id: EventId::new(),
                user,
                title,
                description: input.description,
                category: input.category,
                rule: None,
                start_time: input.start_time,
                end_time: input.end_time,
                created_at: OffsetDateTime::now_utc(),
            };
            data.events.insert(event.id, event.clone());
            info!(event = %event.id, %user, "created event");
            Ok(event)
        })
    }

    /// Events owned by `user` starting inside `window`, or all when `None`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn events(&self, user: UserId, window: Option<Window>) -> ServiceResult<Vec<Event>> {
        let data = self.snapshot()?;
        let mut events: Vec<Event> = data
            .events
            .into_values()
            .filter(|event| event.user == user)
            .filter(|event| window.is_none_or(|w| event.start_time >= w.from && event.start_time < w.to))
            .collect();
        events.sort_by_key(|event| event.start_time);
        Ok(events)
    }

    /// Apply `update` to an event.
    ///
    /// # Errors
    /// Fails for unknown events or categories, blank titles, and updates that
    /// leave the end time at or before the start.
    pub fn update_event(&self, user: UserId, id: EventId, update: EventUpdate) -> ServiceResult<Event> {
        let title = update.title.as_deref().map(|title| required("title", title)).transpose()?;
        self.mutate(|data| {
            if let Some(category) = update.category.as_ref().and_then(|patch| patch.value()) {
                ensure_category(data, user, *category)?;
            }
            let event = data
                .events
                .get_mut(&id)
                .filter(|event| event.user == user)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Event, id))?;
            let mut next = event.clone();
            if let Some(title) = title {
                next.title = title;
            }
            if let Some(patch) = update.description {
                patch.apply(&mut next.description);
            }
            if let Some(patch) = update.category {
                patch.apply(&mut next.category);
            }
            if let Some(start) = update.start_time {
                next.start_time = start;
            }
            if let Some(patch) = update.end_time {
                patch.apply(&mut next.end_time);
            }
            if let Some(end) = next.end_time {
                Window::new(next.start_time, end)?;
            }
            *event = next;
            Ok(event.clone())
        })
    }

    /// Delete an event.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] for unknown events.
    pub fn delete_event(&self, user: UserId, id: EventId) -> ServiceResult<Event> {
        self.mutate(|data| {
            ensure_owned(data.events.get(&id).map(|event| event.user), user, RecordKind::Event, id)?;
            let event = data
                .events
                .remove(&id)
                .ok_or_else(|| ServiceError::not_found(RecordKind::Event, id))?;
            info!(event = %id, "deleted event");
            Ok(event)
        })
    }
}

fn required(field: &'static str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

fn ensure_user(data: &Dataset, user: UserId) -> ServiceResult<()> {
    if data.users.contains_key(&user) {
        Ok(())
    } else {
        Err(ServiceError::not_found(RecordKind::User, user))
    }
}

fn ensure_category(data: &Dataset, user: UserId, id: CategoryId) -> ServiceResult<()> {
    ensure_owned(data.categories.get(&id).map(|c| c.user), user, RecordKind::Category, id)
}

/// Records of other users are reported as missing.
fn ensure_owned(owner: Option<UserId>, user: UserId, kind: RecordKind, id: impl ToString) -> ServiceResult<()> {
    match owner {
        Some(owner) if owner == user => Ok(()),
        _ => Err(ServiceError::not_found(kind, id)),
    }
}

fn owned_rule(data: &Dataset, user: UserId, id: RuleId) -> ServiceResult<&Rule> {
    data.rules
        .get(&id)
        .filter(|rule| rule.user == user)
        .ok_or_else(|| ServiceError::not_found(RecordKind::Rule, id))
}

fn owned_task(data: &mut Dataset, user: UserId, id: TaskId) -> ServiceResult<&mut Task> {
    data.tasks
        .get_mut(&id)
        .filter(|task| task.user == user)
        .ok_or_else(|| ServiceError::not_found(RecordKind::Task, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_patch::FieldPatch;
    use crate::store::MemoryStore;
    use time::Duration;
    use time::macros::datetime;

    fn service() -> PlannerService<MemoryStore> {
        PlannerService::new(MemoryStore::default(), &ProjectConfig::default())
    }

    fn ok<T>(result: ServiceResult<T>, context: &str) -> T {
        result.unwrap_or_else(|err| panic!("{context}: {err}"))
    }

    fn window(from: OffsetDateTime, to: OffsetDateTime) -> Window {
        Window::new(from, to).unwrap_or_else(|err| panic!("window: {err}"))
    }

    #[test]
    fn usernames_are_unique_and_trimmed() {
        let svc = service();
        let alice = ok(svc.register_user("  alice "), "register");
        assert_eq!(alice.username, "alice");
        let Err(err) = svc.register_user("alice") else {
            panic!("duplicate username should fail");
        };
        assert!(matches!(err, ServiceError::UsernameTaken { .. }));
        assert!(matches!(svc.register_user("   "), Err(ServiceError::EmptyField { field: "username" })));
        assert_eq!(ok(svc.user_by_name("alice"), "lookup").id, alice.id);
        assert_eq!(ok(svc.users(), "users").len(), 1);
    }

    #[test]
    fn rule_patterns_are_validated_and_canonicalized() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let rule = ok(svc.create_rule(user, NewRule::new("Gym", "w#5,1,3,3T#06:30")), "create");
        assert_eq!(rule.rate_pattern, "w#1,3,5T#06:30");

        let Err(err) = svc.create_rule(user, NewRule::new("Bad", "w#8T#06:30")) else {
            panic!("weekday 8 should fail");
        };
        assert_eq!(err.kind().status_code(), 400);
        assert!(matches!(
            svc.create_rule(user, NewRule::new("Bad", "x#1#09:00")),
            Err(ServiceError::Pattern(dial_in_core::PatternError::Malformed(_)))
        ));
        assert_eq!(ok(svc.rules(user), "rules").len(), 1);
    }

    #[test]
    fn rules_of_other_users_are_not_found() {
        let svc = service();
        let alice = ok(svc.register_user("alice"), "register").id;
        let bob = ok(svc.register_user("bob"), "register").id;
        let rule = ok(svc.create_rule(alice, NewRule::new("Gym", "d#T#06:00")), "create");
        assert!(matches!(svc.rule(bob, rule.id), Err(ServiceError::NotFound { kind: RecordKind::Rule, .. })));
        assert!(svc.delete_rule(bob, rule.id).is_err());
        assert!(ok(svc.rules(bob), "rules").is_empty());
    }

    #[test]
    fn update_rule_revalidates_the_pattern() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let rule = ok(svc.create_rule(user, NewRule::new("Gym", "d#T#06:00")), "create");
        let update = RuleUpdate {
            rate_pattern: Some("m#32T#06:00".into()),
            ..RuleUpdate::default()
        };
        assert!(svc.update_rule(user, rule.id, update).is_err());
        assert_eq!(ok(svc.rule(user, rule.id), "rule").rate_pattern, "d#T#06:00");

        let update = RuleUpdate {
            rate_pattern: Some("m#15,1T#06:00".into()),
            is_active: Some(false),
            description: Some(FieldPatch::Set("twice a month".into())),
            ..RuleUpdate::default()
        };
        let updated = ok(svc.update_rule(user, rule.id, update), "update");
        assert_eq!(updated.rate_pattern, "m#1,15T#06:00");
        assert!(!updated.is_active);
        assert_eq!(updated.description.as_deref(), Some("twice a month"));
    }

    #[test]
    fn generate_tasks_is_idempotent_over_overlapping_windows() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let rule = ok(svc.create_rule(user, NewRule::new("Stretch", "d#T#09:00")), "create");

        let first = ok(
            svc.generate_tasks(user, rule.id, window(datetime!(2024-01-01 0:00 UTC), datetime!(2024-01-04 0:00 UTC))),
            "generate",
        );
        assert_eq!(first.created.len(), 3);
        assert_eq!(first.skipped, 0);
        assert!(first.created.iter().all(|task| task.title == "Stretch" && task.rule == Some(rule.id)));
        assert_eq!(first.created[0].due_date, Some(datetime!(2024-01-01 9:00 UTC)));

        let second = ok(
            svc.generate_tasks(user, rule.id, window(datetime!(2024-01-03 0:00 UTC), datetime!(2024-01-06 0:00 UTC))),
            "generate",
        );
        assert_eq!(second.created.len(), 2);
        assert_eq!(second.skipped, 1);
        assert_eq!(ok(svc.tasks(user, Some(rule.id)), "tasks").len(), 5);
    }

    #[test]
    fn generate_events_apply_the_configured_duration() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let rule = ok(svc.create_rule(user, NewRule::new("Standup", "w#1T#10:00")), "create");
        let generated = ok(
            svc.generate_events(user, rule.id, window(datetime!(2024-01-01 0:00 UTC), datetime!(2024-01-15 0:00 UTC))),
            "generate",
        );
        assert_eq!(generated.created.len(), 2);
        let event = &generated.created[0];
        assert_eq!(event.start_time, datetime!(2024-01-01 10:00 UTC));
        assert_eq!(event.end_time, Some(datetime!(2024-01-01 11:00 UTC)));
    }

    #[test]
    fn generation_refuses_inactive_rules_and_large_windows() {
        let config = ProjectConfig {
            expansion: ExpansionConfig {
                max_window_days: 30,
                max_occurrences: 10,
            },
            ..ProjectConfig::default()
        };
        let svc = PlannerService::new(MemoryStore::default(), &config);
        let user = ok(svc.register_user("alice"), "register").id;
        let mut input = NewRule::new("Paused", "d#T#09:00");
        input.is_active = false;
        let paused = ok(svc.create_rule(user, input), "create");
        let daily = ok(svc.create_rule(user, NewRule::new("Daily", "d#T#09:00")), "create");
        let from = datetime!(2024-01-01 0:00 UTC);

        assert!(matches!(
            svc.generate_tasks(user, paused.id, window(from, from + Duration::days(2))),
            Err(ServiceError::InactiveRule { .. })
        ));
        let Err(too_large) = svc.generate_tasks(user, daily.id, window(from, from + Duration::days(31))) else {
            panic!("31 days should exceed the bound");
        };
        assert_eq!(too_large.kind().status_code(), 422);
        assert!(matches!(
            svc.generate_tasks(user, daily.id, window(from, from + Duration::days(11))),
            Err(ServiceError::TooManyOccurrences { max: 10 })
        ));
        assert!(ok(svc.tasks(user, None), "tasks").is_empty());

        // Previewing an inactive rule is allowed.
        let preview = ok(svc.expand_rule(user, paused.id, window(from, from + Duration::days(2))), "expand");
        assert_eq!(preview.occurrences.len(), 2);
    }

    #[test]
    fn deleting_a_rule_keeps_generated_rows() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let rule = ok(svc.create_rule(user, NewRule::new("Water", "w#3T#08:00")), "create");
        let range = window(datetime!(2024-01-01 0:00 UTC), datetime!(2024-02-01 0:00 UTC));
        ok(svc.generate_tasks(user, rule.id, range), "tasks");
        ok(svc.generate_events(user, rule.id, range), "events");

        let orphaned = ok(svc.delete_rule(user, rule.id), "delete");
        assert_eq!((orphaned.tasks, orphaned.events), (5, 5));
        let tasks = ok(svc.tasks(user, None), "tasks");
        assert_eq!(tasks.len(), 5);
        assert!(tasks.iter().all(|task| task.rule.is_none()));
        assert!(ok(svc.events(user, None), "events").iter().all(|event| event.rule.is_none()));
    }

    #[test]
    fn task_completion_round_trip() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let task = ok(
            svc.create_task(
                user,
                NewTask {
                    title: "Call mum".into(),
                    ..NewTask::default()
                },
            ),
            "create",
        );
        let done = ok(svc.complete_task(user, task.id), "complete");
        assert!(done.is_completed);
        let again = ok(svc.complete_task(user, task.id), "complete twice");
        assert_eq!(again.completed_at, done.completed_at);
        let reopened = ok(svc.reopen_task(user, task.id), "reopen");
        assert!(!reopened.is_completed && reopened.completed_at.is_none());
        ok(svc.delete_task(user, task.id), "delete");
        assert!(matches!(svc.complete_task(user, task.id), Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn events_reject_end_before_start_and_filter_by_window() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let start = datetime!(2024-02-01 9:00 UTC);
        let input = NewEvent {
            title: "Dentist".into(),
            start_time: start,
            end_time: Some(start - Duration::hours(1)),
            description: None,
            category: None,
        };
        assert!(matches!(svc.create_event(user, input.clone()), Err(ServiceError::Pattern(_))));

        let event = ok(
            svc.create_event(
                user,
                NewEvent {
                    end_time: None,
                    ..input
                },
            ),
            "create",
        );
        let feb = window(datetime!(2024-02-01 0:00 UTC), datetime!(2024-03-01 0:00 UTC));
        let march = window(datetime!(2024-03-01 0:00 UTC), datetime!(2024-04-01 0:00 UTC));
        assert_eq!(ok(svc.events(user, Some(feb)), "feb").len(), 1);
        assert!(ok(svc.events(user, Some(march)), "march").is_empty());

        let moved = EventUpdate {
            start_time: Some(datetime!(2024-03-05 9:00 UTC)),
            end_time: Some(FieldPatch::Set(datetime!(2024-03-05 10:00 UTC))),
            ..EventUpdate::default()
        };
        ok(svc.update_event(user, event.id, moved), "update");
        assert_eq!(ok(svc.events(user, Some(march)), "march").len(), 1);
    }

    fn category(svc: &PlannerService<MemoryStore>, user: UserId, name: &str) -> Category {
        ok(
            svc.create_category(
                user,
                NewCategory {
                    name: name.into(),
                    description: Some("old".into()),
                },
            ),
            "category",
        )
    }

    #[test]
    fn update_category_renames_and_rejects_blank_names() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let home = category(&svc, user, "Home");

        let renamed = ok(
            svc.update_category(
                user,
                home.id,
                CategoryUpdate {
                    name: Some("  House ".into()),
                    description: Some(FieldPatch::Clear),
                },
            ),
            "rename",
        );
        assert_eq!(renamed.name, "House");
        assert!(renamed.description.is_none());

        let blank = CategoryUpdate {
            name: Some("   ".into()),
            ..CategoryUpdate::default()
        };
        let Err(err) = svc.update_category(user, home.id, blank) else {
            panic!("blank name should fail");
        };
        assert!(matches!(err, ServiceError::EmptyField { field: "name" }));
        assert_eq!(ok(svc.categories(user), "categories")[0].name, "House");

        let bob = ok(svc.register_user("bob"), "register").id;
        let rename = CategoryUpdate {
            name: Some("Mine".into()),
            ..CategoryUpdate::default()
        };
        let Err(err) = svc.update_category(bob, home.id, rename) else {
            panic!("other users' categories should be hidden");
        };
        assert_eq!(err.kind().status_code(), 404);
    }

    #[test]
    fn update_task_sets_and_clears_the_due_date() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let task = ok(
            svc.create_task(
                user,
                NewTask {
                    title: "Pay rent".into(),
                    ..NewTask::default()
                },
            ),
            "create",
        );
        let due = datetime!(2024-05-01 9:00 +02:00);

        let set = TaskUpdate {
            due_date: Some(FieldPatch::Set(due)),
            ..TaskUpdate::default()
        };
        assert_eq!(ok(svc.update_task(user, task.id, set), "set").due_date, Some(due));
        assert_eq!(ok(svc.tasks(user, None), "tasks")[0].due_date, Some(due));

        let clear = TaskUpdate {
            title: Some("Pay rent (May)".into()),
            due_date: Some(FieldPatch::Clear),
            ..TaskUpdate::default()
        };
        let cleared = ok(svc.update_task(user, task.id, clear), "clear");
        assert!(cleared.due_date.is_none());
        assert_eq!(cleared.title, "Pay rent (May)");
    }

    #[test]
    fn category_patches_must_reference_own_categories() {
        let svc = service();
        let alice = ok(svc.register_user("alice"), "register").id;
        let bob = ok(svc.register_user("bob"), "register").id;
        let theirs = category(&svc, bob, "Bob's");
        let task = ok(
            svc.create_task(
                alice,
                NewTask {
                    title: "Groceries".into(),
                    ..NewTask::default()
                },
            ),
            "create",
        );

        let update = TaskUpdate {
            category: Some(FieldPatch::Set(theirs.id)),
            ..TaskUpdate::default()
        };
        let Err(err) = svc.update_task(alice, task.id, update) else {
            panic!("foreign category should be rejected");
        };
        assert!(matches!(err, ServiceError::NotFound { kind: RecordKind::Category, .. }));
        assert_eq!(err.kind().status_code(), 404);
        assert!(ok(svc.tasks(alice, None), "tasks")[0].category.is_none());

        let event = ok(
            svc.create_event(
                alice,
                NewEvent {
                    title: "Market".into(),
                    start_time: datetime!(2024-02-03 8:00 UTC),
                    end_time: None,
                    description: None,
                    category: None,
                },
            ),
            "event",
        );
        let update = EventUpdate {
            category: Some(FieldPatch::Set(theirs.id)),
            ..EventUpdate::default()
        };
        assert!(matches!(
            svc.update_event(alice, event.id, update),
            Err(ServiceError::NotFound { kind: RecordKind::Category, .. })
        ));
    }

    #[test]
    fn deleting_a_category_clears_it_from_rules() {
        let svc = service();
        let user = ok(svc.register_user("alice"), "register").id;
        let category = ok(
            svc.create_category(
                user,
                NewCategory {
                    name: "Health".into(),
                    description: None,
                },
            ),
            "category",
        );
        let mut input = NewRule::new("Gym", "d#T#06:00");
        input.category = Some(category.id);
        let rule = ok(svc.create_rule(user, input), "rule");
        assert_eq!(rule.category, Some(category.id));

        let orphaned = ok(svc.delete_category(user, category.id), "delete");
        assert_eq!(orphaned.rules, 1);
        assert!(ok(svc.rule(user, rule.id), "rule").category.is_none());
        assert!(ok(svc.categories(user), "categories").is_empty());
    }
}
