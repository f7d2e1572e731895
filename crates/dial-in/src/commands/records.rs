use std::io::Write;

use anyhow::{Result, bail};
use dial_in_app::{
    CategoryUpdate, EventUpdate, FieldPatch, Generated, NewCategory, NewEvent, NewRule, NewTask,
    PlannerService, RecordStore, RuleUpdate, TaskUpdate,
};
use dial_in_core::User;
use dial_in_core::id::{CategoryId, EventId, RuleId, TaskId};

use super::render::{self, format_timestamp};
use super::{parse_id, parse_optional_id, parse_time, parse_window, print_json};
use crate::{
    CategoryCommand, EventCommand, GenerateArgs, GenerateCommand, OutputFormat, RuleCommand,
    TaskCommand, UserCommand,
};

pub fn run_user<S: RecordStore>(service: &PlannerService<S>, command: UserCommand, out: &mut impl Write) -> Result<()> {
    match command {
        UserCommand::Register { username } => {
            let user = service.register_user(&username)?;
            writeln!(out, "registered user: {} ({})", user.username, user.id)?;
        }
        UserCommand::Ls { format } => {
            let users = service.users()?;
            match format {
                OutputFormat::Table => render::user_table(out, &users)?,
                OutputFormat::Json => print_json(out, &users)?,
            }
        }
    }
    Ok(())
}

pub fn run_category<S: RecordStore>(
    service: &PlannerService<S>,
    user: &User,
    command: CategoryCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        CategoryCommand::Add { name, description } => {
            let category = service.create_category(user.id, NewCategory { name, description })?;
            writeln!(out, "created category: {} ({})", category.name, category.id)?;
        }
        CategoryCommand::Edit {
            id,
            name,
            description,
            clear_description,
        } => {
            let id: CategoryId = parse_id("category", &id)?;
            let update = CategoryUpdate {
                name,
                description: patch(description, clear_description),
            };
            if update.is_empty() {
                bail!("Nothing to update for category {id}");
            }
            let category = service.update_category(user.id, id, update)?;
            writeln!(out, "updated category: {} ({})", category.name, category.id)?;
        }
        CategoryCommand::Ls { format } => {
            let categories = service.categories(user.id)?;
            match format {
                OutputFormat::Table => render::category_table(out, &categories)?,
                OutputFormat::Json => print_json(out, &categories)?,
            }
        }
        CategoryCommand::Rm { id } => {
            let id: CategoryId = parse_id("category", &id)?;
            let orphaned = service.delete_category(user.id, id)?;
            writeln!(
                out,
                "deleted category: {id} (cleared from {} rules, {} tasks, {} events)",
                orphaned.rules, orphaned.tasks, orphaned.events
            )?;
        }
    }
    Ok(())
}

pub fn run_rule<S: RecordStore>(
    service: &PlannerService<S>,
    user: &User,
    command: RuleCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        RuleCommand::Add {
            name,
            pattern,
            description,
            category,
            inactive,
        } => {
            let rule = service.create_rule(
                user.id,
                NewRule {
                    name,
                    rate_pattern: pattern,
                    description,
                    category: parse_optional_id("category", category.as_deref())?,
                    is_active: !inactive,
                },
            )?;
            writeln!(out, "created rule: {} {} ({})", rule.name, rule.rate_pattern, rule.id)?;
        }
        RuleCommand::Edit {
            id,
            name,
            pattern,
            description,
            clear_description,
            category,
            clear_category,
            resume,
            pause,
        } => {
            let id: RuleId = parse_id("rule", &id)?;
            let update = RuleUpdate {
                name,
                rate_pattern: pattern,
                description: patch(description, clear_description),
                category: patch(parse_optional_id("category", category.as_deref())?, clear_category),
                is_active: if pause {
                    Some(false)
                } else if resume {
                    Some(true)
                } else {
                    None
                },
            };
            if update.is_empty() {
                bail!("Nothing to update for rule {id}");
            }
            let rule = service.update_rule(user.id, id, update)?;
            writeln!(out, "updated rule: {} {} ({})", rule.name, rule.rate_pattern, rule.id)?;
        }
        RuleCommand::Ls { format } => {
            let rules = service.rules(user.id)?;
            match format {
                OutputFormat::Table => render::rule_table(out, &rules)?,
                OutputFormat::Json => print_json(out, &rules)?,
            }
        }
        RuleCommand::Rm { id } => {
            let id: RuleId = parse_id("rule", &id)?;
            let orphaned = service.delete_rule(user.id, id)?;
            writeln!(
                out,
                "deleted rule: {id} (kept {} tasks, {} events)",
                orphaned.tasks, orphaned.events
            )?;
        }
        RuleCommand::Expand {
            id,
            from,
            to,
            format,
        } => {
            let id: RuleId = parse_id("rule", &id)?;
            let expansion = service.expand_rule(user.id, id, parse_window(&from, &to)?)?;
            match format {
                OutputFormat::Table => {
                    for occurrence in &expansion.occurrences {
                        writeln!(out, "{}", format_timestamp(occurrence.at))?;
                    }
                    if expansion.truncated {
                        writeln!(out, "... (truncated after {} occurrences)", expansion.occurrences.len())?;
                    }
                }
                OutputFormat::Json => print_json(out, &expansion)?,
            }
        }
    }
    Ok(())
}

fn patch<T>(value: Option<T>, clear: bool) -> Option<FieldPatch<T>> {
    if clear {
        return Some(FieldPatch::Clear);
    }
    value.map(FieldPatch::Set)
}

pub fn run_task<S: RecordStore>(
    service: &PlannerService<S>,
    user: &User,
    command: TaskCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        TaskCommand::Add {
            title,
            description,
            category,
            due,
        } => {
            let task = service.create_task(
                user.id,
                NewTask {
                    title,
                    description,
                    category: parse_optional_id("category", category.as_deref())?,
                    due_date: due.as_deref().map(|raw| parse_time("due", raw)).transpose()?,
                },
            )?;
            writeln!(out, "created task: {} ({})", task.title, task.id)?;
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            clear_description,
            category,
            clear_category,
            due,
            clear_due,
        } => {
            let id: TaskId = parse_id("task", &id)?;
            let update = TaskUpdate {
                title,
                description: patch(description, clear_description),
                category: patch(parse_optional_id("category", category.as_deref())?, clear_category),
                due_date: patch(due.as_deref().map(|raw| parse_time("due", raw)).transpose()?, clear_due),
            };
            if update.is_empty() {
                bail!("Nothing to update for task {id}");
            }
            let task = service.update_task(user.id, id, update)?;
            writeln!(out, "updated task: {} ({})", task.title, task.id)?;
        }
        TaskCommand::Ls { rule, format } => {
            let rule = parse_optional_id::<RuleId>("rule", rule.as_deref())?;
            let tasks = service.tasks(user.id, rule)?;
            match format {
                OutputFormat::Table => render::task_table(out, &tasks)?,
                OutputFormat::Json => print_json(out, &tasks)?,
            }
        }
        TaskCommand::Complete { id } => {
            let task = service.complete_task(user.id, parse_id::<TaskId>("task", &id)?)?;
            writeln!(out, "completed task: {} ({})", task.title, task.id)?;
        }
        TaskCommand::Reopen { id } => {
            let task = service.reopen_task(user.id, parse_id::<TaskId>("task", &id)?)?;
            writeln!(out, "reopened task: {} ({})", task.title, task.id)?;
        }
        TaskCommand::Rm { id } => {
            let task = service.delete_task(user.id, parse_id::<TaskId>("task", &id)?)?;
            writeln!(out, "deleted task: {} ({})", task.title, task.id)?;
        }
    }
    Ok(())
}

pub fn run_event<S: RecordStore>(
    service: &PlannerService<S>,
    user: &User,
    command: EventCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        EventCommand::Add {
            title,
            start,
            end,
            description,
            category,
        } => {
            let event = service.create_event(
                user.id,
                NewEvent {
                    title,
                    start_time: parse_time("start", &start)?,
                    end_time: end.as_deref().map(|raw| parse_time("end", raw)).transpose()?,
                    description,
                    category: parse_optional_id("category", category.as_deref())?,
                },
            )?;
            writeln!(out, "created event: {} ({})", event.title, event.id)?;
        }
        EventCommand::Edit {
            id,
            title,
            start,
            end,
            clear_end,
            description,
            clear_description,
            category,
            clear_category,
        } => {
            let id: EventId = parse_id("event", &id)?;
            let update = EventUpdate {
                title,
                description: patch(description, clear_description),
                category: patch(parse_optional_id("category", category.as_deref())?, clear_category),
                start_time: start.as_deref().map(|raw| parse_time("start", raw)).transpose()?,
                end_time: patch(end.as_deref().map(|raw| parse_time("end", raw)).transpose()?, clear_end),
            };
            if update.is_empty() {
                bail!("Nothing to update for event {id}");
            }
            let event = service.update_event(user.id, id, update)?;
            writeln!(out, "updated event: {} ({})", event.title, event.id)?;
        }
        EventCommand::Ls { from, to, format } => {
            let window = match (from, to) {
                (Some(from), Some(to)) => Some(parse_window(&from, &to)?),
                _ => None,
            };
            let events = service.events(user.id, window)?;
            match format {
                OutputFormat::Table => render::event_table(out, &events)?,
                OutputFormat::Json => print_json(out, &events)?,
            }
        }
        EventCommand::Rm { id } => {
            let event = service.delete_event(user.id, parse_id::<EventId>("event", &id)?)?;
            writeln!(out, "deleted event: {} ({})", event.title, event.id)?;
        }
    }
    Ok(())
}

pub fn run_generate<S: RecordStore>(
    service: &PlannerService<S>,
    user: &User,
    command: GenerateCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        GenerateCommand::Tasks(args) => {
            let (rule, window) = generate_target(&args)?;
            let generated = service.generate_tasks(user.id, rule, window)?;
            report(out, "tasks", &generated, |task| (task.id.to_string(), task.due_date))
        }
        GenerateCommand::Events(args) => {
            let (rule, window) = generate_target(&args)?;
            let generated = service.generate_events(user.id, rule, window)?;
            report(out, "events", &generated, |event| (event.id.to_string(), Some(event.start_time)))
        }
    }
}

fn generate_target(args: &GenerateArgs) -> Result<(RuleId, dial_in_app::Window)> {
    Ok((parse_id("rule", &args.rule)?, parse_window(&args.from, &args.to)?))
}

fn report<T>(
    out: &mut impl Write,
    noun: &str,
    generated: &Generated<T>,
    describe: impl Fn(&T) -> (String, Option<time::OffsetDateTime>),
) -> Result<()> {
    writeln!(
        out,
        "generated {} {noun} (skipped {} existing)",
        generated.created.len(),
        generated.skipped
    )?;
    for row in &generated.created {
        let (id, at) = describe(row);
        writeln!(out, "  {id} {}", at.map_or_else(|| "-".to_owned(), format_timestamp))?;
    }
    Ok(())
}
