use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;
use watchdog_common::ProcessSnapshot;

use crate::ProbeError;

/// Host capability used by the watchdog: list process names and, where the
/// platform allows it, forcefully terminate by image name.
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    async fn snapshot(&self) -> Result<ProcessSnapshot, ProbeError>;

    async fn terminate(&self, name: &str) -> Result<(), ProbeError>;

    fn supports_termination(&self) -> bool;
}

/// Windows probe built on `tasklist` and `taskkill`.
#[derive(Debug, Clone)]
pub struct TasklistProbe {
    timeout: Duration,
}

impl TasklistProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessProbe for TasklistProbe {
    async fn snapshot(&self) -> Result<ProcessSnapshot, ProbeError> {
        let stdout = run_command("tasklist", &["/FO", "CSV", "/NH"], self.timeout).await?;
        Ok(ProcessSnapshot::from_names(parse_tasklist_csv(&stdout)))
    }

    async fn terminate(&self, name: &str) -> Result<(), ProbeError> {
        run_command("taskkill", &["/IM", name, "/F"], self.timeout).await?;
        Ok(())
    }

    fn supports_termination(&self) -> bool {
        true
    }
}

/// POSIX probe built on `ps`. Termination is not offered on these hosts.
#[derive(Debug, Clone)]
pub struct PsProbe {
    timeout: Duration,
}

impl PsProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessProbe for PsProbe {
    async fn snapshot(&self) -> Result<ProcessSnapshot, ProbeError> {
        let stdout = run_command("ps", &["-A", "-o", "comm="], self.timeout).await?;
        Ok(ProcessSnapshot::from_listing(&stdout))
    }

    async fn terminate(&self, _name: &str) -> Result<(), ProbeError> {
        Err(ProbeError::Unsupported("forceful termination"))
    }

    fn supports_termination(&self) -> bool {
        false
    }
}

/// Probe matching the platform this binary was built for.
pub fn host_probe(timeout: Duration) -> Arc<dyn ProcessProbe> {
    if cfg!(windows) {
        Arc::new(TasklistProbe::new(timeout))
    } else {
        Arc::new(PsProbe::new(timeout))
    }
}

/// One row of a process listing with its PID, as shown by `--list-processes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// List running processes with their PIDs using the host's listing tool.
pub async fn list_processes(timeout: Duration) -> Result<Vec<ProcessEntry>, ProbeError> {
    if cfg!(windows) {
        let stdout = run_command("tasklist", &["/FO", "CSV", "/NH"], timeout).await?;
        Ok(parse_tasklist_entries(&stdout))
    } else {
        let stdout = run_command("ps", &["-A", "-o", "pid=,comm="], timeout).await?;
        Ok(parse_ps_entries(&stdout))
    }
}

/// Image name and PID from each `tasklist /FO CSV /NH` record.
pub fn parse_tasklist_entries(stdout: &str) -> Vec<ProcessEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let inner = line.trim().strip_prefix('"')?.strip_suffix('"')?;
            let mut fields = inner.split("\",\"");
            let name = fields.next()?.trim();
            let pid = fields.next()?.trim().parse().ok()?;
            if name.is_empty() {
                return None;
            }
            Some(ProcessEntry {
                pid,
                name: name.to_string(),
            })
        })
        .collect()
}

/// PID and command name from `ps -A -o pid=,comm=` output.
pub fn parse_ps_entries(stdout: &str) -> Vec<ProcessEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let (pid, name) = line.trim().split_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(ProcessEntry {
                pid: pid.parse().ok()?,
                name: name.to_string(),
            })
        })
        .collect()
}

/// Extract image names from `tasklist /FO CSV /NH` output.
///
/// Each record looks like `"chrome.exe","1234","Console","1","120,344 K"`.
pub fn parse_tasklist_csv(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix('"')?;
            let end = rest.find('"')?;
            let name = rest[..end].trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Run a host command without a shell, bounded by `timeout`, returning stdout.
async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ProbeError> {
    let command_line = command_line(program, args);
    debug!("Running `{}`", command_line);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ProbeError::Timeout {
                what: command_line,
                after: timeout,
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::CommandFailed {
            command: command_line,
            status: match stderr.trim() {
                "" => output.status.to_string(),
                stderr => format!("{} {}", output.status, stderr),
            },
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tasklist_records() {
        let out = "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"\r\n\
                   \"Chrome.exe\",\"4120\",\"Console\",\"1\",\"120,344 K\"\r\n\
                   \r\n\
                   \"Teams.exe\",\"5000\",\"Console\",\"1\",\"80,000 K\"\r\n";
        assert_eq!(
            parse_tasklist_csv(out),
            vec!["System Idle Process", "Chrome.exe", "Teams.exe"]
        );
    }

    #[test]
    fn ignores_non_csv_lines() {
        let out = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(parse_tasklist_csv(out).is_empty());
    }

    #[test]
    fn tasklist_snapshot_is_lowercased() {
        let names = parse_tasklist_csv("\"OBS64.EXE\",\"1\",\"Console\",\"1\",\"1 K\"\n");
        let snap = ProcessSnapshot::from_names(names);
        assert_eq!(snap.as_str(), "obs64.exe");
    }

    #[test]
    fn termination_capability_per_platform() {
        assert!(TasklistProbe::new(Duration::from_secs(1)).supports_termination());
        assert!(!PsProbe::new(Duration::from_secs(1)).supports_termination());
    }

    #[tokio::test]
    async fn ps_probe_refuses_to_terminate() {
        let probe = PsProbe::new(Duration::from_secs(1));
        assert!(matches!(
            probe.terminate("anything").await,
            Err(ProbeError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let err = run_command(
            "definitely-not-a-real-command-4f1c",
            &[],
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::Io(_)));
    }

    #[test]
    fn parses_tasklist_records_with_pids() {
        let out = "\"Chrome.exe\",\"4120\",\"Console\",\"1\",\"120,344 K\"\r\n\
                   INFO: something else\r\n\
                   \"Broken.exe\",\"n/a\",\"Console\",\"1\",\"1 K\"\r\n";
        assert_eq!(
            parse_tasklist_entries(out),
            vec![ProcessEntry {
                pid: 4120,
                name: "Chrome.exe".into()
            }]
        );
    }

    #[test]
    fn parses_ps_pid_and_command() {
        let out = "    1 /sbin/init\n  812 Google Chrome Helper\n\n  abc bogus\n 99\n";
        assert_eq!(
            parse_ps_entries(out),
            vec![
                ProcessEntry {
                    pid: 1,
                    name: "/sbin/init".into()
                },
                ProcessEntry {
                    pid: 812,
                    name: "Google Chrome Helper".into()
                },
            ]
        );
    }

    #[test]
    fn command_line_has_no_trailing_space() {
        assert_eq!(command_line("false", &[]), "false");
        assert_eq!(command_line("ps", &["-A", "-o", "comm="]), "ps -A -o comm=");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_command("sleep", &["5"], Duration::from_millis(150))
            .await
            .unwrap_err();
        match err {
            ProbeError::Timeout { what, after } => {
                assert_eq!(what, "sleep 5");
                assert_eq!(after, Duration::from_millis(150));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = run_command("false", &[], Duration::from_secs(2))
            .await
            .unwrap_err();
        match err {
            ProbeError::CommandFailed { command, status } => {
                assert_eq!(command, "false");
                assert!(!status.ends_with(' '));
            }
            other => panic!("expected command failure, got {:?}", other),
        }
    }
}
