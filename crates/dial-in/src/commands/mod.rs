use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context as _, Result, anyhow};
use dial_in_app::{JsonFileStore, PatternApi, PlannerService, ProjectConfig, RecordStore, Window};
use dial_in_core::User;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::Command;

mod pattern;
mod records;
mod render;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub dir: String,
    pub data: Option<PathBuf>,
    pub user: Option<String>,
}

pub fn run(ctx: &Context, command: Command) -> Result<()> {
    let (root, config) = ProjectConfig::load(&ctx.dir)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Command::Pattern(cmd) = command {
        return pattern::run(&PatternApi::new(config.expansion), cmd, &mut out);
    }

    let data_path = ctx.data.clone().unwrap_or_else(|| config.data_path(&root));
    debug!(root = %root.display(), data = %data_path.display(), "opening data file");
    let service = PlannerService::new(JsonFileStore::new(data_path), &config);
    dispatch(&service, ctx.user.as_deref(), command, &mut out)
}

fn dispatch<S: RecordStore>(
    service: &PlannerService<S>,
    user: Option<&str>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Pattern(_) => unreachable!("pattern commands do not touch records"),
        Command::User(cmd) => records::run_user(service, cmd, out),
        Command::Category(cmd) => records::run_category(service, &acting_user(service, user)?, cmd, out),
        Command::Rule(cmd) => records::run_rule(service, &acting_user(service, user)?, cmd, out),
        Command::Task(cmd) => records::run_task(service, &acting_user(service, user)?, cmd, out),
        Command::Event(cmd) => records::run_event(service, &acting_user(service, user)?, cmd, out),
        Command::Generate(cmd) => records::run_generate(service, &acting_user(service, user)?, cmd, out),
    }
}

fn acting_user<S: RecordStore>(service: &PlannerService<S>, user: Option<&str>) -> Result<User> {
    let username = user.ok_or_else(|| anyhow!("--user is required for this command"))?;
    Ok(service.user_by_name(username)?)
}

fn parse_id<T>(kind: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(raw.trim()).with_context(|| format!("Invalid {kind} id: {raw}"))
}

fn parse_optional_id<T>(kind: &str, raw: Option<&str>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|raw| parse_id(kind, raw)).transpose()
}

fn parse_time(field: &str, raw: &str) -> Result<OffsetDateTime> {
    dial_in_app::parse_timestamp(raw).with_context(|| format!("Invalid {field} timestamp: {raw}"))
}

fn parse_window(from: &str, to: &str) -> Result<Window> {
    Ok(Window::parse(from, to)?)
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
