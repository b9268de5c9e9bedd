// src/command.rs
use anyhow::{bail, Context, Result};
use std::process::Command;

/// Run `argv`, capture its output, return stdout.
///
/// * `check` – fail if the exit status is non-zero.
/// * `stderr_ok` – tolerate output on stderr; otherwise it is an error.
pub fn run_cmd(argv: &[String], check: bool, stderr_ok: bool) -> Result<String> {
    let (program, args) = match argv.split_first() {
        Some(split) => split,
        None => bail!("empty command"),
    };

    let out = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("spawning `{}`", argv.join(" ")))?;

    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&out.stderr);

    if check && !out.status.success() {
        bail!(
            "`{}` exited with {}: {}",
            argv.join(" "),
            out.status,
            stderr.trim()
        );
    }
    if !stderr_ok && !stderr.is_empty() {
        bail!("output in stderr of `{}`: {}", argv.join(" "), stderr.trim());
    }
    Ok(stdout)
}

/// Split a command line into argv with shell quoting rules.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    match shlex::split(line) {
        Some(argv) if !argv.is_empty() => Ok(argv),
        Some(_) => bail!("command `{}` is empty", line),
        None => bail!("command `{}` has unbalanced quotes", line),
    }
}
