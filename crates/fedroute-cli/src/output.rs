use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

/// JSON document printed after every command.
#[derive(Debug, Serialize)]
struct Report<'a> {
    command: &'a str,
    data: &'a Value,
    warnings: &'a [String],
}

pub fn render(result: &CommandResult, pretty: bool, to_stderr: bool) -> Result<(), CliError> {
    let report = Report {
        command: result.command,
        data: &result.data,
        warnings: &result.warnings,
    };
    let payload = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if to_stderr {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{payload}")?;
    } else {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{payload}")?;
    }
    Ok(())
}

/// Raw provider bytes on stdout, for piping into other tools.
pub fn write_payload(bytes: &[u8]) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}
