//! Subprocess execution with captured output.
//!
//! Third-party binaries (git, virtualenv, pip, the installed tools
//! themselves) are driven through here so every failure surfaces the exact
//! command attempted and whatever it printed. Stdout and stderr are merged:
//! version banners and error text end up in one string either way.

use std::ffi::OsStr;
use std::io;
use std::process::Command;

/// Runs a command and returns its combined stdout+stderr. Non-zero exit is
/// an error carrying the captured output.
pub fn run<S: AsRef<OsStr>>(argv: &[S]) -> io::Result<String> {
    run_with_env(argv, &[])
}

/// Like `run`, with extra environment variables for the child.
pub fn run_with_env<S: AsRef<OsStr>>(argv: &[S], envs: &[(&str, &OsStr)]) -> io::Result<String> {
    let (output, rendered) = spawn(argv, envs)?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "'{}' failed ({}):\n{}",
            rendered,
            output.status,
            combined(&output)
        )));
    }
    Ok(combined(&output))
}

/// Runs a command and returns its combined output regardless of exit
/// status. Needed for tools that exit non-zero while still printing a
/// usable version banner (argocd without a server, for one).
pub fn run_unchecked<S: AsRef<OsStr>>(argv: &[S]) -> io::Result<String> {
    let (output, _) = spawn(argv, &[])?;
    Ok(combined(&output))
}

fn spawn<S: AsRef<OsStr>>(
    argv: &[S],
    envs: &[(&str, &OsStr)],
) -> io::Result<(std::process::Output, String)> {
    let rendered = argv
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::other("empty command"))?;
    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command
        .output()
        .map_err(|e| io::Error::other(format!("cannot run '{rendered}': {e}")))?;
    Ok((output, rendered))
}

fn combined(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_stdout() {
        let out = run(&["echo", "hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn run_fails_on_nonzero_exit_with_output() {
        let err = run(&["sh", "-c", "echo oops >&2; exit 3"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("oops"));
        assert!(message.contains("exit"));
    }

    #[test]
    fn run_unchecked_tolerates_nonzero_exit() {
        let out = run_unchecked(&["sh", "-c", "echo banner; exit 1"]).unwrap();
        assert_eq!(out.trim(), "banner");
    }

    #[test]
    fn run_fails_when_the_binary_is_missing() {
        assert!(run(&["definitely-not-a-real-binary-7b3c"]).is_err());
    }
}
