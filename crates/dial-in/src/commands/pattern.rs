use std::io::Write;

use anyhow::{Context, Result, bail};
use dial_in_app::{
    DecodeRequest, DecodeResponse, EncodeRequest, EncodeResponse, ExpandRequest, ExpandResponse,
    PatternApi, PatternFailure, ValidateRequest, ValidateResponse,
};

use super::{parse_time, print_json};
use super::render::format_timestamp;
use crate::{OutputFormat, PatternCommand};

pub fn run(api: &PatternApi, command: PatternCommand, out: &mut impl Write) -> Result<()> {
    match command {
        PatternCommand::Decode { pattern } => {
            let response = api.decode(&DecodeRequest { pattern });
            print_json(out, &response)?;
            match response {
                DecodeResponse::Ok(_) => Ok(()),
                DecodeResponse::Failed(failure) => fail(&failure),
            }
        }
        PatternCommand::Encode {
            frequency,
            points,
            time,
        } => {
            let (hour, minute) = parse_time_of_day(&time)?;
            let response = api.encode(&EncodeRequest {
                frequency: frequency.into(),
                points,
                hour,
                minute,
            });
            print_json(out, &response)?;
            match response {
                EncodeResponse::Ok { .. } => Ok(()),
                EncodeResponse::Failed(failure) => fail(&failure),
            }
        }
        PatternCommand::Validate { pattern } => {
            let response = api.validate(&ValidateRequest { pattern });
            print_json(out, &response)?;
            match response {
                ValidateResponse::Ok { .. } => Ok(()),
                ValidateResponse::Failed(failure) => fail(&failure),
            }
        }
        PatternCommand::Expand {
            pattern,
            from,
            to,
            limit,
            format,
        } => {
            let request = ExpandRequest {
                pattern,
                from: parse_time("from", &from)?,
                to: parse_time("to", &to)?,
                limit,
            };
            let response = api.expand(&request);
            match (&response, format) {
                (ExpandResponse::Ok(expansion), OutputFormat::Table) => {
                    for occurrence in &expansion.occurrences {
                        writeln!(out, "{}", format_timestamp(occurrence.at))?;
                    }
                    if expansion.truncated {
                        writeln!(out, "... (truncated after {} occurrences)", expansion.occurrences.len())?;
                    }
                }
                _ => print_json(out, &response)?,
            }
            match response {
                ExpandResponse::Ok(_) => Ok(()),
                ExpandResponse::Failed(failure) => fail(&failure),
            }
        }
    }
}

fn fail(failure: &PatternFailure) -> Result<()> {
    bail!("{} ({})", failure.message, failure.code)
}

/// Split `HH:MM` into numbers; range checks are left to the encoder.
fn parse_time_of_day(raw: &str) -> Result<(u8, u8)> {
    let (hour, minute) = raw
        .trim()
        .split_once(':')
        .with_context(|| format!("Invalid time of day: {raw} (expected HH:MM)"))?;
    let hour = hour
        .parse()
        .with_context(|| format!("Invalid hour in time of day: {raw}"))?;
    let minute = minute
        .parse()
        .with_context(|| format!("Invalid minute in time of day: {raw}"))?;
    Ok((hour, minute))
}
