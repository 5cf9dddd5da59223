//! # Tool Driver
//!
//! The programs under test are black boxes with a process contract: argv flags in,
//! exit code 0 (success), 1 (input error), or 2 (usage error) out, with stdout and stderr
//! captured separately.  The harness only depends on the `Tool` trait, which has an
//! implementation that spawns the real program and one that calls a closure in process.
//!
//! Each tool also honors one environment variable holding default flags.  The harness does
//! not set that variable on itself; the value travels in the `Invocation` and is applied to
//! the child process only, so it can never leak into another scenario.

pub mod diagnostics;

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command,Stdio};
use std::panic::{catch_unwind,AssertUnwindSafe};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::{debug,trace,error};
use crate::DYNERR;

/// stderr text that betrays a raw internal fault rather than a diagnostic
pub const DEFAULT_FAULTS: [&str;4] = [
    "Traceback (most recent call last)",
    "panicked at",
    "Segmentation fault",
    "Internal error"
];

/// Enumerates tool driver errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("argument error: {0}")]
    Argument(String),
    #[error("`{tool}` exited with {actual}, expected {expected}, stderr:\n{stderr}")]
    ExitCode { tool: String, expected: i32, actual: i32, stderr: String },
    #[error("`{tool}` emitted an unstructured fault: {line}")]
    UnstructuredFault { tool: String, line: String },
    #[error("could not start `{0}`: {1}")]
    Spawn(String,String),
    #[error("diagnostics do not match the markers: {0}")]
    MarkerMismatch(String)
}

/// Exit code classes of the process contract
#[derive(FromPrimitive,Clone,Copy,PartialEq,Eq,Debug)]
pub enum ExitClass {
    Success = 0,
    InputError = 1,
    UsageError = 2
}

impl ExitClass {
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_i32(code)
    }
}

/// Everything one run of a tool needs, built by the scenario and never shared.
#[derive(Clone,Debug,Default)]
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub cwd: Option<PathBuf>,
    /// value of the tool's default-options variable, None means the variable is absent
    pub defaults: Option<String>
}

impl Invocation {
    pub fn new(args: &[&str]) -> Self {
        Self {
            args: args.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
    pub fn with_stdin(mut self,dat: &[u8]) -> Self {
        self.stdin = Some(dat.to_vec());
        self
    }
    pub fn in_dir(mut self,dir: &std::path::Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }
    pub fn with_defaults(mut self,defaults: Option<&str>) -> Self {
        self.defaults = defaults.map(|s| s.to_string());
        self
    }
    /// Arguments as the tool sees them, default flags first.
    /// In-process tools use this, external tools do the merge themselves.
    pub fn effective_args(&self) -> Vec<String> {
        let mut ans: Vec<String> = match &self.defaults {
            Some(d) => d.split_whitespace().map(|s| s.to_string()).collect(),
            None => Vec::new()
        };
        ans.extend(self.args.iter().cloned());
        ans
    }
}

/// A runnable tool.  Output goes to the caller's sinks, the exit code is returned.
/// An `Err` means the tool could not be run at all.
pub trait Tool {
    fn name(&self) -> &str;
    fn run(&self,inv: &Invocation,out: &mut dyn Write,err: &mut dyn Write) -> Result<i32,DYNERR>;
}

/// How to start an external tool
#[derive(Clone,PartialEq,Debug)]
pub struct ToolSpec {
    pub name: String,
    pub program: String,
    /// arguments placed before the invocation's own
    pub args: Vec<String>,
    /// name of the default-options variable
    pub defaults_var: Option<String>
}

/// Tool implemented by spawning a process
pub struct ExternalTool {
    spec: ToolSpec
}

impl ExternalTool {
    pub fn new(spec: ToolSpec) -> Self {
        Self { spec }
    }
}

impl Tool for ExternalTool {
    fn name(&self) -> &str {
        &self.spec.name
    }
    fn run(&self,inv: &Invocation,out: &mut dyn Write,err: &mut dyn Write) -> Result<i32,DYNERR> {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args).args(&inv.args);
        if let Some(dir) = &inv.cwd {
            cmd.current_dir(dir);
        }
        if let Some(var) = &self.spec.defaults_var {
            match &inv.defaults {
                Some(val) => cmd.env(var,val),
                None => cmd.env_remove(var)
            };
        }
        cmd.stdin(match inv.stdin { Some(_) => Stdio::piped(), None => Stdio::null() });
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        debug!("spawn {} {:?}",self.spec.program,inv.args);
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!("could not start {}",self.spec.program);
                return Err(Box::new(Error::Spawn(self.spec.program.clone(),e.to_string())));
            }
        };
        // stdin is fed while the output pipes drain, a child may write before it finishes reading
        let output = match (&inv.stdin,child.stdin.take()) {
            (Some(dat),Some(mut pipe)) => std::thread::scope(|scope| {
                let feeder = scope.spawn(move || pipe.write_all(dat));
                let output = child.wait_with_output();
                match feeder.join() {
                    Ok(Err(e)) if e.kind()==std::io::ErrorKind::BrokenPipe => trace!("{} closed stdin early",self.spec.name),
                    Ok(Err(e)) => return Err(e),
                    Err(_) => return Err(std::io::Error::other("stdin writer panicked")),
                    Ok(Ok(())) => {}
                }
                output
            }),
            _ => child.wait_with_output()
        }?;
        out.write_all(&output.stdout)?;
        err.write_all(&output.stderr)?;
        let code = match output.status.code() {
            Some(c) => c,
            None => {
                // killed by a signal
                writeln!(err,"Internal error: {} terminated by signal",self.spec.name)?;
                -1
            }
        };
        trace!("{} exited with {}",self.spec.name,code);
        Ok(code)
    }
}

/// Tool implemented by a closure, used to exercise the harness without the real programs.
/// A panic in the closure is reported on `err` the way a crashing process would report it.
pub struct InProcessTool<F>
where F: Fn(&Invocation,&mut dyn Write,&mut dyn Write) -> i32 {
    name: String,
    func: F
}

impl<F> InProcessTool<F>
where F: Fn(&Invocation,&mut dyn Write,&mut dyn Write) -> i32 {
    pub fn new(name: &str,func: F) -> Self {
        Self {
            name: name.to_string(),
            func
        }
    }
}

impl<F> Tool for InProcessTool<F>
where F: Fn(&Invocation,&mut dyn Write,&mut dyn Write) -> i32 {
    fn name(&self) -> &str {
        &self.name
    }
    fn run(&self,inv: &Invocation,out: &mut dyn Write,err: &mut dyn Write) -> Result<i32,DYNERR> {
        let result = catch_unwind(AssertUnwindSafe(|| (self.func)(inv,&mut *out,&mut *err)));
        match result {
            Ok(code) => Ok(code),
            Err(payload) => {
                let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                writeln!(err,"thread '{}' panicked at {}",self.name,msg)?;
                Ok(101)
            }
        }
    }
}

/// Captured result of one run
#[derive(Clone,PartialEq,Debug,Default)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Run a tool capturing both streams in memory
pub fn capture(tool: &dyn Tool,inv: &Invocation) -> Result<ToolOutput,DYNERR> {
    let mut stdout: Vec<u8> = Vec::new();
    let mut stderr: Vec<u8> = Vec::new();
    let code = tool.run(inv,&mut stdout,&mut stderr)?;
    Ok(ToolOutput { code, stdout, stderr })
}

/// First stderr line containing any of the fault signatures
pub fn scan_faults(stderr: &str,signatures: &[String]) -> Option<String> {
    stderr.lines().find(|line| signatures.iter().any(|sig| line.contains(sig.as_str()))).map(|s| s.to_string())
}

pub fn default_faults() -> Vec<String> {
    DEFAULT_FAULTS.iter().map(|s| s.to_string()).collect()
}

/// Run a tool and insist on the exit code.  A raw fault on stderr fails the run whatever the exit code.
pub fn run_expect(tool: &dyn Tool,inv: &Invocation,expect: ExitClass,faults: &[String]) -> Result<ToolOutput,DYNERR> {
    let ans = capture(tool,inv)?;
    let stderr = ans.stderr_text();
    if let Some(line) = scan_faults(&stderr,faults) {
        error!("{} faulted",tool.name());
        return Err(Box::new(Error::UnstructuredFault { tool: tool.name().to_string(), line }));
    }
    if ans.code!=expect as i32 {
        error!("{} exit code {} is not {:?}",tool.name(),ans.code,expect);
        return Err(Box::new(Error::ExitCode {
            tool: tool.name().to_string(),
            expected: expect as i32,
            actual: ans.code,
            stderr
        }));
    }
    Ok(ans)
}
