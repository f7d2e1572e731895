//! Create and update payloads shared by frontends.

use dial_in_core::id::CategoryId;
use time::OffsetDateTime;

/// Patch for an optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch<T> {
    /// Overwrite with a new value.
    Set(T),
    /// Clear the field.
    Clear,
}

impl<T> FieldPatch<T> {
    /// Apply the patch to `field`.
    pub fn apply(self, field: &mut Option<T>) {
        *field = match self {
            Self::Set(value) => Some(value),
            Self::Clear => None,
        };
    }

    /// Value being set, if any.
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Clear => None,
        }
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    /// Display name; must not be blank.
    pub name: String,
    /// Free-form note.
    pub description: Option<String>,
}

/// Category update payload.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    /// New name; must not be blank.
    pub name: Option<String>,
    /// Description patch.
    pub description: Option<FieldPatch<String>>,
}

/// Input for creating a rule. `rate_pattern` is decoded, validated and
/// stored in canonical form.
#[derive(Debug, Clone)]
pub struct NewRule {
    /// Display name, copied into generated titles.
    pub name: String,
    /// Pattern such as `w#1,3T#09:00`.
    pub rate_pattern: String,
    /// Free-form note.
    pub description: Option<String>,
    /// Category owned by the same user.
    pub category: Option<CategoryId>,
    /// Inactive rules can be previewed but not generated.
    pub is_active: bool,
}

impl NewRule {
    /// Active rule without description or category.
    pub fn new(name: impl Into<String>, rate_pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rate_pattern: rate_pattern.into(),
            description: None,
            category: None,
            is_active: true,
        }
    }
}

/// Rule update payload.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    /// New name.
    pub name: Option<String>,
    /// Replacement pattern, validated and canonicalized.
    pub rate_pattern: Option<String>,
    /// Description patch.
    pub description: Option<FieldPatch<String>>,
    /// Category patch.
    pub category: Option<FieldPatch<CategoryId>>,
    /// Pause or resume the rule.
    pub is_active: Option<bool>,
}

/// Input for creating a task by hand.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Title; must not be blank.
    pub title: String,
    /// Free-form note.
    pub description: Option<String>,
    /// Category owned by the same user.
    pub category: Option<CategoryId>,
    /// Optional deadline.
    pub due_date: Option<OffsetDateTime>,
}

/// Task update payload. Completion has dedicated operations.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// Description patch.
    pub description: Option<FieldPatch<String>>,
    /// Category patch.
    pub category: Option<FieldPatch<CategoryId>>,
    /// Due date patch.
    pub due_date: Option<FieldPatch<OffsetDateTime>>,
}

/// Input for creating an event by hand.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Title; must not be blank.
    pub title: String,
    /// Start instant.
    pub start_time: OffsetDateTime,
    /// End instant, after `start_time` when set.
    pub end_time: Option<OffsetDateTime>,
    /// Free-form note.
    pub description: Option<String>,
    /// Category owned by the same user.
    pub category: Option<CategoryId>,
}

/// Event update payload.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    /// New title.
    pub title: Option<String>,
    /// Description patch.
    pub description: Option<FieldPatch<String>>,
    /// Category patch.
    pub category: Option<FieldPatch<CategoryId>>,
    /// New start; the end must still come after it.
    pub start_time: Option<OffsetDateTime>,
    /// End time patch.
    pub end_time: Option<FieldPatch<OffsetDateTime>>,
}

macro_rules! impl_is_empty {
    ($($update:ident { $($field:ident),+ }),+ $(,)?) => {
        $(
            impl $update {
                /// Returns true when the update changes nothing.
                #[must_use]
                pub const fn is_empty(&self) -> bool {
                    true $(&& self.$field.is_none())+
                }
            }
        )+
    };
}

impl_is_empty!(
    CategoryUpdate { name, description },
    RuleUpdate { name, rate_pattern, description, category, is_active },
    TaskUpdate { title, description, category, due_date },
    EventUpdate { title, description, category, start_time, end_time },
);
