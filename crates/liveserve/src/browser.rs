//! Opening the default browser.
//!
//! Uses `$BROWSER` when set, otherwise the platform opener (`open` on macOS,
//! `start` on Windows, `xdg-open` elsewhere).

use std::ffi::OsString;
use std::process::Stdio;

use tokio::process::Command;

/// Launch the browser at `url` without waiting for it.
pub(crate) fn open(url: &str) -> std::io::Result<()> {
    let browser = std::env::var_os("BROWSER").filter(|b| !b.is_empty());
    let mut command = opener_command(url, browser);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    // The child is reaped by tokio in the background
    command.spawn().map(drop)
}

/// Build the command that opens `url`.
fn opener_command(url: &str, browser: Option<OsString>) -> Command {
    let mut command = match browser {
        Some(browser) => Command::new(browser),
        None => platform_opener(),
    };
    command.arg(url);
    command
}

#[cfg(target_os = "macos")]
fn platform_opener() -> Command {
    Command::new("open")
}

#[cfg(windows)]
fn platform_opener() -> Command {
    let mut command = Command::new("cmd");
    // Empty title argument, otherwise `start` treats a quoted URL as the title
    command.args(["/C", "start", ""]);
    command
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_opener() -> Command {
    Command::new("xdg-open")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn program(command: &Command) -> &OsStr {
        command.as_std().get_program()
    }

    #[test]
    fn test_browser_env_overrides_platform_opener() {
        let command = opener_command("http://localhost:8000/", Some(OsString::from("firefox")));

        assert_eq!(program(&command), OsStr::new("firefox"));
        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(args, vec![OsStr::new("http://localhost:8000/")]);
    }

    #[test]
    fn test_platform_opener_gets_url_last() {
        let command = opener_command("http://localhost:8000/", None);

        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(args.last(), Some(&OsStr::new("http://localhost:8000/")));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_platform_opener_linux() {
        let command = opener_command("http://localhost:8000/", None);

        assert_eq!(program(&command), OsStr::new("xdg-open"));
    }
}
