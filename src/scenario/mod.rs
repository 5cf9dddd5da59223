//! # Orchestrator
//!
//! A scenario moves through
//! `Setup -> Generate -> Invoke -> (InvokeInverse) -> Compare -> Teardown`
//! and ends `Passed` or `Failed`.  Error-path scenarios replace `Compare` with `Diagnose`.
//! The first violated check ends the scenario, there are no retries since the tools and
//! generators are deterministic.
//!
//! `Setup` creates a scratch `Workspace` owned by the scenario alone, `Teardown` removes it
//! whatever the outcome.  A `Suite` runs its scenarios strictly one after the other.
//!
//! Tool arguments are templates: `{in}`, `{out}`, `{disk}`, `{name}`, and `{base}` are replaced by
//! workspace paths, the file name, or the load address before the tool runs.

pub mod roundtrip;
pub mod errorpath;
pub mod disk;

pub use roundtrip::RoundTrip;
pub use errorpath::ErrorPath;
pub use disk::{DiskRoundTrip,Direction};

use std::fmt;
use std::path::{Path,PathBuf};
use tempfile::TempDir;
use colored::Colorize;
use log::{trace,info,error};
use crate::tools::{Tool,Invocation,ToolOutput,ExitClass,run_expect};
use crate::{STDRESULT,DYNERR};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Phase {
    Setup,
    Generate,
    Invoke,
    InvokeInverse,
    Compare,
    Diagnose,
    Teardown,
    Passed,
    Failed
}

impl fmt::Display for Phase {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::Generate => "generate",
            Self::Invoke => "invoke",
            Self::InvokeInverse => "invoke inverse",
            Self::Compare => "compare",
            Self::Diagnose => "diagnose",
            Self::Teardown => "teardown",
            Self::Passed => "passed",
            Self::Failed => "failed"
        };
        write!(f,"{}",s)
    }
}

/// Scratch directory of one scenario, removed on `close` (or on drop if close is never reached)
pub struct Workspace {
    dir: TempDir
}

impl Workspace {
    pub fn new() -> Result<Self,DYNERR> {
        let dir = tempfile::Builder::new().prefix("ti99check").tempdir()?;
        trace!("workspace {}",dir.path().display());
        Ok(Self { dir })
    }
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
    pub fn file(&self,name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
    pub fn write(&self,name: &str,dat: &[u8]) -> Result<PathBuf,DYNERR> {
        let path = self.file(name);
        std::fs::write(&path,dat)?;
        Ok(path)
    }
    pub fn read(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        Ok(std::fs::read(self.file(name))?)
    }
    pub fn close(self) -> STDRESULT {
        self.dir.close()?;
        Ok(())
    }
}

/// Why a scenario failed: the phase, the check, the artifact, and the details
#[derive(Clone,PartialEq,Debug)]
pub struct Failure {
    pub phase: Phase,
    pub check: String,
    pub artifact: String,
    pub detail: String
}

impl fmt::Display for Failure {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{} failed in {} phase on `{}`: {}",self.check,self.phase,self.artifact,self.detail)
    }
}

/// Terminal state of one scenario
#[derive(Clone,PartialEq,Debug)]
pub struct Outcome {
    pub name: String,
    pub phase: Phase,
    /// phases entered, in order
    pub trace: Vec<Phase>,
    pub failure: Option<Failure>
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.phase==Phase::Passed
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(f,"{} {}","PASS".green(),self.name),
            Some(fail) => write!(f,"{} {}\n    {}","FAIL".red(),self.name,fail)
        }
    }
}

/// One tool call of a scenario, with its argument templates and default options
#[derive(Clone)]
pub struct Step<'a> {
    pub tool: &'a dyn Tool,
    pub args: Vec<String>,
    pub defaults: Option<String>
}

impl<'a> Step<'a> {
    pub fn new(tool: &'a dyn Tool,args: &[&str]) -> Self {
        Self {
            tool,
            args: args.iter().map(|s| s.to_string()).collect(),
            defaults: None
        }
    }
    pub fn with_defaults(mut self,defaults: Option<&str>) -> Self {
        self.defaults = defaults.map(|s| s.to_string());
        self
    }
    /// whether the tool writes its result to a file rather than stdout
    pub fn writes_file(&self) -> bool {
        self.args.iter().any(|a| a.contains("{out}"))
    }
    fn invocation(&self,ws: &Workspace,vars: &[(&str,String)]) -> Invocation {
        let args: Vec<String> = self.args.iter().map(|a| {
            let mut ans = a.clone();
            for (key,val) in vars {
                ans = ans.replace(&["{",key,"}"].concat(),val);
            }
            ans
        }).collect();
        Invocation {
            args,
            stdin: None,
            cwd: Some(ws.path().to_path_buf()),
            defaults: self.defaults.clone()
        }
    }
}

/// State of a running scenario, handed to `Scenario::execute`
pub struct Run {
    pub ws: Workspace,
    pub faults: Vec<String>,
    trace: Vec<Phase>
}

impl Run {
    pub fn enter(&mut self,phase: Phase) {
        trace!("enter {}",phase);
        self.trace.push(phase);
    }
    pub fn phase(&self) -> Phase {
        *self.trace.last().unwrap_or(&Phase::Setup)
    }
    /// Failure of `check` on `artifact` in the current phase
    pub fn fail<E: fmt::Display>(&self,check: &str,artifact: &str,err: E) -> Failure {
        Failure {
            phase: self.phase(),
            check: check.to_string(),
            artifact: artifact.to_string(),
            detail: err.to_string()
        }
    }
    /// Run a step, templates are expanded from `vars`
    pub fn invoke(&self,step: &Step,vars: &[(&str,String)],expect: ExitClass) -> Result<ToolOutput,Failure> {
        let inv = step.invocation(&self.ws,vars);
        match run_expect(step.tool,&inv,expect,&self.faults) {
            Ok(out) => Ok(out),
            Err(e) => Err(self.fail("tool run",step.tool.name(),e))
        }
    }
    pub fn path_var(&self,file: &str) -> String {
        self.ws.file(file).to_string_lossy().to_string()
    }
}

pub trait Scenario {
    fn name(&self) -> &str;
    /// Carry out the phases after `Setup`, stopping at the first failed check
    fn execute(&self,run: &mut Run) -> Result<(),Failure>;
}

/// Run one scenario through setup and teardown
pub fn run_scenario(scenario: &dyn Scenario,faults: &[String]) -> Outcome {
    info!("scenario {}",scenario.name());
    let mut trace = vec![Phase::Setup];
    let ws = match Workspace::new() {
        Ok(ws) => ws,
        Err(e) => {
            error!("could not create workspace: {}",e);
            trace.push(Phase::Failed);
            return Outcome {
                name: scenario.name().to_string(),
                phase: Phase::Failed,
                trace,
                failure: Some(Failure { phase: Phase::Setup, check: "workspace".to_string(), artifact: "tempdir".to_string(), detail: e.to_string() })
            };
        }
    };
    let mut run = Run { ws, faults: faults.to_vec(), trace };
    let result = scenario.execute(&mut run);
    run.enter(Phase::Teardown);
    let Run { ws, mut trace, .. } = run;
    let ws_path = ws.path().display().to_string();
    let cleanup = ws.close();
    let failure = match (result,cleanup) {
        (Err(f),_) => Some(f),
        (Ok(()),Err(e)) => Some(Failure { phase: Phase::Teardown, check: "workspace removal".to_string(), artifact: ws_path, detail: e.to_string() }),
        (Ok(()),Ok(())) => None
    };
    let phase = match failure { None => Phase::Passed, Some(_) => Phase::Failed };
    trace.push(phase);
    match &failure {
        None => info!("{} passed",scenario.name()),
        Some(f) => error!("{}: {}",scenario.name(),f)
    }
    Outcome {
        name: scenario.name().to_string(),
        phase,
        trace,
        failure
    }
}

/// Ordered collection of scenarios, run strictly in sequence
pub struct Suite<'a> {
    scenarios: Vec<Box<dyn Scenario + 'a>>,
    faults: Vec<String>
}

impl<'a> Suite<'a> {
    pub fn new(faults: &[String]) -> Self {
        Self {
            scenarios: Vec::new(),
            faults: faults.to_vec()
        }
    }
    pub fn add(&mut self,scenario: Box<dyn Scenario + 'a>) {
        self.scenarios.push(scenario);
    }
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }
    pub fn run(&self) -> Vec<Outcome> {
        self.scenarios.iter().map(|s| run_scenario(s.as_ref(),&self.faults)).collect()
    }
}

/// passed and failed counts
pub fn tally(outcomes: &[Outcome]) -> (usize,usize) {
    let passed = outcomes.iter().filter(|o| o.passed()).count();
    (passed,outcomes.len()-passed)
}
