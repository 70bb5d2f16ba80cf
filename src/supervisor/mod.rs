//! Launches a Java entry point and keeps it running.
//!
//! A [`JavaRunner`] is bound to one `java` executable. Each call to
//! [`JavaRunner::run_class`] builds a command line from a [`LaunchSpec`],
//! spawns the JVM with both output streams piped to an [`OutputTracer`],
//! and then either returns the exit code ([`RestartPolicy::RunOnce`]) or
//! relaunches indefinitely ([`RestartPolicy::RunForever`]).
//!
//! On Linux every child is placed in its own process group and asked to die
//! with `SIGTERM` when the thread that spawned it goes away, so the thread
//! calling `run_class` must stay alive while the child runs. `run_class`
//! blocks, which satisfies that.
pub mod command;
pub mod monitor;
pub mod tracer;

use std::{
    env,
    io::{BufRead, BufReader, Read},
    os::unix::process::{CommandExt, ExitStatusExt},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

pub use command::{
    CLASSPATH_SEPARATOR, DEFAULT_DEBUG_PORT, classpath_for_jars_in, command_line, debug_options,
    format_define, merge_environment,
};
pub use monitor::{ProcessKiller, ProcessMonitor};
pub use tracer::{BufferedOutputTracer, OutputTracer, ProcessOutput, TracingOutputTracer};

use crate::error::{ConfigurationError, SupervisorError};

/// Heap bound, in megabytes, used when a launch does not set one.
pub const DEFAULT_MAX_MEMORY_MB: u32 = 512;

/// How long a finished child's output readers get to reach EOF.
pub const READER_GRACE: Duration = Duration::from_millis(500);

/// What happens after the JVM exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Return the exit code to the caller.
    RunOnce,
    /// Log the exit, wait `delay`, launch again. Never returns normally.
    RunForever { delay: Duration },
}

impl RestartPolicy {
    pub fn from_run_continuous(run_continuous: bool) -> Self {
        if run_continuous {
            Self::default()
        } else {
            Self::RunOnce
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::RunForever {
            delay: Duration::ZERO,
        }
    }
}

/// Everything needed to launch one JVM.
///
/// Construct with [`LaunchSpec::new`] and override fields with struct update
/// syntax; every field is plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Fully-qualified main class.
    pub entry_point: String,
    /// Program arguments passed after the entry point.
    pub arguments: Vec<String>,
    /// Classpath entries, joined with [`CLASSPATH_SEPARATOR`].
    pub classpath: Vec<String>,
    pub max_memory_mb: u32,
    pub server: bool,
    /// System properties, rendered as `-Dkey` or `-Dkey=value`.
    pub defines: Vec<(String, Option<String>)>,
    /// Passed verbatim after `-Xmx`.
    pub extra_options: Vec<String>,
    /// Layered over the supervisor's own environment.
    pub environment: Vec<(String, String)>,
    pub restart_policy: RestartPolicy,
}

impl LaunchSpec {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            arguments: Vec::new(),
            classpath: Vec::new(),
            max_memory_mb: DEFAULT_MAX_MEMORY_MB,
            server: true,
            defines: Vec::new(),
            extra_options: Vec::new(),
            environment: Vec::new(),
            restart_policy: RestartPolicy::default(),
        }
    }
}

/// Runs Java classes with one particular `java` executable.
#[derive(Clone)]
pub struct JavaRunner {
    executable: PathBuf,
    tracer: Option<Arc<dyn OutputTracer>>,
    monitor: Option<Arc<dyn ProcessMonitor>>,
}

impl std::fmt::Debug for JavaRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaRunner")
            .field("executable", &self.executable)
            .field("tracer", &self.tracer.is_some())
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

impl JavaRunner {
    /// Uses `<java_home>/bin/java`, which must exist.
    pub fn new(java_home: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        Self::with_executable(java_home.as_ref().join("bin").join("java"))
    }

    /// Uses `executable` directly, which must exist.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let executable = executable.into();
        if !executable.is_file() {
            return Err(ConfigurationError::MissingExecutable(executable));
        }
        Ok(Self {
            executable,
            tracer: None,
            monitor: None,
        })
    }

    /// Sends process output to `tracer` instead of a [`TracingOutputTracer`]
    /// labelled with the entry point.
    pub fn with_tracer(mut self, tracer: Arc<dyn OutputTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn ProcessMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Runs `spec` according to its restart policy.
    ///
    /// Under [`RestartPolicy::RunOnce`] this returns the child's exit code. A
    /// child killed by a signal reports `128 + signal`. Under
    /// [`RestartPolicy::RunForever`] it only returns if a launch fails.
    pub fn run_class(&self, spec: &LaunchSpec) -> Result<i32, SupervisorError> {
        let args = command_line(spec);
        let tracer = self
            .tracer
            .clone()
            .unwrap_or_else(|| Arc::new(TracingOutputTracer::for_entry_point(&spec.entry_point)));

        loop {
            let code = self.launch(spec, &args, &tracer)?;
            match spec.restart_policy {
                RestartPolicy::RunOnce => return Ok(code),
                RestartPolicy::RunForever { delay } => {
                    info!(
                        "Class {} exited with code {}. Restarting...",
                        spec.entry_point, code
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }

    fn launch(
        &self,
        spec: &LaunchSpec,
        args: &[String],
        tracer: &Arc<dyn OutputTracer>,
    ) -> Result<i32, SupervisorError> {
        info!("About to run: {} {}", self.executable.display(), args.join(" "));

        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .env_clear()
            .envs(merge_environment(env::vars_os(), &spec.environment))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) < 0 {
                    return Err(std::io::Error::last_os_error());
                }

                #[cfg(target_os = "linux")]
                {
                    use libc::{PR_SET_PDEATHSIG, SIGTERM, prctl};
                    if prctl(PR_SET_PDEATHSIG, SIGTERM, 0, 0, 0) < 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                }

                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            entry_point: spec.entry_point.clone(),
            source,
        })?;
        let pid = child.id();
        debug!("Started {} as pid {pid}", spec.entry_point);

        let stdout_handle = child.stdout.take().map(|stdout| {
            let tracer = Arc::clone(tracer);
            pump(stdout, move |line| tracer.trace_stdout(line))
        });
        let stderr_handle = child.stderr.take().map(|stderr| {
            let tracer = Arc::clone(tracer);
            pump(stderr, move |line| tracer.trace_stderr(line))
        });

        if let Some(monitor) = &self.monitor {
            monitor.process_started(pid);
        }

        let status = child.wait().map_err(|source| SupervisorError::Wait {
            entry_point: spec.entry_point.clone(),
            source,
        })?;

        let code = exit_code(status);
        let readers: Vec<_> = [stdout_handle, stderr_handle].into_iter().flatten().collect();
        drain_readers(&spec.entry_point, readers);
        Ok(code)
    }
}

/// Feeds each line of `stream` to `sink` on a dedicated thread.
fn pump<R, F>(stream: R, sink: F) -> JoinHandle<()>
where
    R: Read + Send + 'static,
    F: Fn(&str) + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let line = String::from_utf8_lossy(&buf);
                    sink(&*line);
                }
                Err(err) => {
                    debug!("Stopped reading process output: {err}");
                    break;
                }
            }
        }
    })
}

/// Waits up to [`READER_GRACE`] for the output readers to reach EOF.
///
/// A grandchild that inherited the pipes keeps them open after the JVM exits;
/// its readers are left running on their own so the exit is still reported.
fn drain_readers(entry_point: &str, readers: Vec<JoinHandle<()>>) {
    let deadline = Instant::now() + READER_GRACE;
    for handle in readers {
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !handle.is_finished() {
            debug!("Output of {entry_point} is still open after exit; not waiting for it");
            continue;
        }
        if handle.join().is_err() {
            warn!("Output reader for {entry_point} panicked");
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}
