use crate::command::{CommandPath, Prober};
use crate::config::ScrapeConfig;
use crate::env::Environment;
use crate::error::ProbeFailure;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

type OutputReceiver = mpsc::Receiver<std::io::Result<Vec<u8>>>;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Prober that runs `<tool> <subcommands...> <help flag>` as a child process.
///
/// The child gets an empty stdin, its stderr is merged into stdout through a
/// single pipe, and it is killed once `timeout` elapses. Exit codes are ignored:
/// plenty of tools print their help and still exit non-zero.
pub struct ExternalProber {
    env: Environment,
    timeout: Duration,
    help_flag: String,
}

impl ExternalProber {
    pub fn new(env: Environment, config: &ScrapeConfig) -> Self {
        Self {
            env,
            timeout: config.timeout,
            help_flag: config.help_flag.clone(),
        }
    }

    fn spawn(&self, path: &CommandPath) -> Result<(Child, OutputReceiver), String> {
        let search_paths = self.env.search_paths();
        let executable = find_command_path(
            &search_paths,
            &self.env.current_dir,
            Path::new(path.tool()),
        )
        .ok_or_else(|| "executable not found".to_string())?;

        let (mut reader, writer) = std::io::pipe().map_err(|e| e.to_string())?;
        let stderr_writer = writer.try_clone().map_err(|e| e.to_string())?;

        // The builder owns the parent's ends of the pipe, so they close as soon as it drops.
        let child = std::process::Command::new(&*executable)
            .args(path.args())
            .arg(&self.help_flag)
            .envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.env.current_dir)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .spawn()
            .map_err(|e| e.to_string())?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = tx.send(reader.read_to_end(&mut buf).map(|_| buf));
        });
        Ok((child, rx))
    }
}

impl Prober for ExternalProber {
    fn probe(&self, path: &CommandPath) -> Result<String, ProbeFailure> {
        info!("Processing command: {}", path);
        let launch_error = |reason: String| {
            error!("Failed to run `{} {}`: {}", path, self.help_flag, reason);
            ProbeFailure::LaunchError {
                path: path.clone(),
                reason,
            }
        };
        let timed_out = || {
            error!("Timeout expired for command: {}", path);
            ProbeFailure::Timeout {
                path: path.clone(),
                after: self.timeout,
            }
        };

        // A timeout too large to represent is no deadline at all.
        let deadline = Instant::now().checked_add(self.timeout);
        let (mut child, output) = self.spawn(path).map_err(launch_error)?;

        match wait_until(&mut child, deadline) {
            Ok(Some(status)) => debug!(command = %path, code = exit_code(status), "probe exited"),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(launch_error(e.to_string()));
            }
        }

        // A grandchild may still hold the pipe open after the child itself exited.
        let received = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                output.recv_timeout(remaining.max(POLL_INTERVAL)).ok()
            }
            None => output.recv().ok(),
        };
        let bytes = match received {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => return Err(launch_error(e.to_string())),
            None => return Err(timed_out()),
        };

        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.trim().is_empty() {
            warn!("No output for command: {}", path);
            return Err(ProbeFailure::Empty { path: path.clone() });
        }
        Ok(text)
    }
}

fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve the tool's executable the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo` on Unix or any relative path on other platforms: resolved against `current_dir`.
/// - Relative with multiple components (e.g., `bin/tool`): resolved against `current_dir`.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    current_dir: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir {
        let candidate = current_dir.join(path);
        if candidate.exists() {
            return Some(Cow::Owned(candidate));
        }
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => {
            let candidate = current_dir.join(path);
            find_by_path(&candidate).map(|p| Cow::Owned(p.to_owned()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::fs::File;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[cfg(unix)]
    fn prober_in(dir: &Path, timeout: Duration) -> ExternalProber {
        let env = Environment {
            current_dir: dir.to_path_buf(),
            ..Environment::new()
        };
        let config = ScrapeConfig {
            timeout,
            ..ScrapeConfig::default()
        };
        ExternalProber::new(env, &config)
    }

    /// `sh -c <script> --help`: the help flag lands in `$0`.
    #[cfg(unix)]
    fn sh(script: &str) -> CommandPath {
        CommandPath::root("sh").child("-c").child(script)
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let res = find_command_path(osstr("/bin"), Path::new("/"), path);
        assert!(res.is_some(), "Expected to find /bin/sh via absolute path");
        let found = res.unwrap();
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        let res = find_command_path(osstr("/bin"), Path::new("/"), path);
        assert!(
            res.is_none(),
            "Expected not to find /bin/nonexisting via absolute path"
        );
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("sh"));
        let found = res.expect("Expected to find 'sh' in /bin via PATH search");
        assert!(
            found.as_ref().starts_with("/bin") && found.as_ref().ends_with("sh"),
            "Expected /bin/sh, got {:?}",
            found
        );
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("nonexisting"));
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    #[cfg(unix)]
    fn multiple_components_resolved_against_current_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("bin")).expect("create bin dir");
        File::create(tmp.path().join("bin").join("tool")).expect("touch bin/tool");

        let res = find_command_path(osstr("/does/not/matter"), tmp.path(), Path::new("bin/tool"));
        let found = res.expect("Expected to find relative 'bin/tool' in current dir");
        assert_eq!(found.as_ref(), tmp.path().join("bin/tool"));
    }

    #[test]
    #[cfg(unix)]
    fn current_dir_with_dot_prefix() {
        let tmp = tempfile::tempdir().expect("tempdir");
        File::create(tmp.path().join("tool")).expect("touch tool");

        let res = find_command_path(osstr("/bin"), tmp.path(), Path::new("./tool"));
        let found = res.expect("Expected to find './tool' in current dir");
        assert!(found.as_ref().ends_with("tool"));
        assert!(found.as_ref().starts_with(tmp.path()));
    }

    #[test]
    #[cfg(unix)]
    fn empty_path_is_none() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }

    #[test]
    #[cfg(unix)]
    fn probe_passes_help_flag_and_tolerates_nonzero_exit() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_secs(10));

        let out = prober
            .probe(&sh("echo \"Usage: sample $0\"; exit 3"))
            .expect("help text despite exit code 3");
        assert_eq!(out, "Usage: sample --help\n");
    }

    #[test]
    #[cfg(unix)]
    fn probe_merges_stderr_into_stdout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_secs(10));

        let out = prober
            .probe(&sh("echo one; echo two >&2; echo three"))
            .expect("merged output");
        assert_eq!(out, "one\ntwo\nthree\n");
    }

    #[test]
    #[cfg(unix)]
    fn probe_has_empty_stdin_and_runs_in_current_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        File::create(tmp.path().join("marker.txt")).expect("touch marker");
        let prober = prober_in(tmp.path(), Duration::from_secs(10));

        let out = prober
            .probe(&sh("cat; ls"))
            .expect("cat must see EOF right away");
        assert!(out.contains("marker.txt"), "unexpected output: {out:?}");
    }

    #[test]
    #[cfg(unix)]
    fn probe_times_out() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_millis(200));
        let path = sh("sleep 5");

        let started = Instant::now();
        let err = prober.probe(&path).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(
            err,
            ProbeFailure::Timeout {
                path,
                after: Duration::from_millis(200)
            }
        );
    }

    #[test]
    #[cfg(unix)]
    fn huge_timeout_means_no_deadline() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_secs(u64::MAX));

        let out = prober.probe(&sh("echo hi")).expect("help text");
        assert_eq!(out, "hi\n");
    }

    #[test]
    #[cfg(unix)]
    fn probe_whitespace_output_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_secs(10));
        let path = sh("printf '  \\n\\t\\n'");

        assert_eq!(prober.probe(&path), Err(ProbeFailure::Empty { path }));
    }

    #[test]
    #[cfg(unix)]
    fn probe_missing_tool_is_launch_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let prober = prober_in(tmp.path(), Duration::from_secs(10));
        let path = CommandPath::root("help-scraper-no-such-tool");

        match prober.probe(&path) {
            Err(ProbeFailure::LaunchError { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected launch error, got {other:?}"),
        }
    }
}
