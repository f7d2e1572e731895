use std::io::Write;

use anyhow::Result;
use dial_in_core::{Category, Event, Rule, Task, User};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn optional_timestamp(at: Option<OffsetDateTime>) -> String {
    at.map_or_else(|| "-".to_owned(), format_timestamp)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_owned(), |value| value.to_string())
}

pub fn user_table(out: &mut impl Write, users: &[User]) -> Result<()> {
    writeln!(out, "ID | Username | Registered")?;
    writeln!(out, "-- | -------- | ----------")?;
    for user in users {
        writeln!(out, "{} | {} | {}", user.id, user.username, format_timestamp(user.created_at))?;
    }
    Ok(())
}

pub fn category_table(out: &mut impl Write, categories: &[Category]) -> Result<()> {
    writeln!(out, "ID | Name | Description")?;
    writeln!(out, "-- | ---- | -----------")?;
    for category in categories {
        writeln!(
            out,
            "{} | {} | {}",
            category.id,
            category.name,
            optional(category.description.as_deref())
        )?;
    }
    Ok(())
}

pub fn rule_table(out: &mut impl Write, rules: &[Rule]) -> Result<()> {
    writeln!(out, "ID | Name | Pattern | Active | Category")?;
    writeln!(out, "-- | ---- | ------- | ------ | --------")?;
    for rule in rules {
        writeln!(
            out,
            "{} | {} | {} | {} | {}",
            rule.id,
            rule.name,
            rule.rate_pattern,
            if rule.is_active { "yes" } else { "no" },
            optional(rule.category)
        )?;
    }
    Ok(())
}

pub fn task_table(out: &mut impl Write, tasks: &[Task]) -> Result<()> {
    writeln!(out, "ID | Done | Title | Due | Rule")?;
    writeln!(out, "-- | ---- | ----- | --- | ----")?;
    for task in tasks {
        writeln!(
            out,
            "{} | {} | {} | {} | {}",
            task.id,
            if task.is_completed { "x" } else { " " },
            task.title,
            optional_timestamp(task.due_date),
            optional(task.rule)
        )?;
    }
    Ok(())
}

pub fn event_table(out: &mut impl Write, events: &[Event]) -> Result<()> {
    writeln!(out, "ID | Title | Start | End | Rule")?;
    writeln!(out, "-- | ----- | ----- | --- | ----")?;
    for event in events {
        writeln!(
            out,
            "{} | {} | {} | {} | {}",
            event.id,
            event.title,
            format_timestamp(event.start_time),
            optional_timestamp(event.end_time),
            optional(event.rule)
        )?;
    }
    Ok(())
}
