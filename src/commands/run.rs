use clap;
use std::path::Path;
use colored::Colorize;
use log::{info,error};
use super::CommandError;
use crate::config::HarnessConfig;
use crate::gen::ChunkPlan;
use crate::scenario::{Suite,Scenario,RoundTrip,ErrorPath,Step,tally};
use crate::tools::{ExternalTool,ToolSpec,ExitClass};
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

/// The configured arguments become the step's templates, the spawned program gets none of its own.
fn external(cfg: &HarnessConfig,name: &str) -> Result<(ExternalTool,Vec<String>),CommandError> {
    match cfg.tool(name) {
        Some(spec) => {
            let bare = ToolSpec {
                args: Vec::new(),
                ..spec.clone()
            };
            Ok((ExternalTool::new(bare),spec.args.clone()))
        },
        None => {
            error!("configuration needs a `{}` tool",name);
            Err(CommandError::MissingTool(name.to_string()))
        }
    }
}

/// Error path scenarios for the configured fixtures, paths are relative to the configuration file
fn error_paths<'a>(cfg: &HarnessConfig,cfg_dir: &Path,step: &Step<'a>) -> Result<Vec<Box<dyn Scenario + 'a>>,Box<dyn std::error::Error>> {
    let mut ans: Vec<Box<dyn Scenario + 'a>> = Vec::new();
    if cfg.fixtures.len()==0 {
        error!("configuration lists no `fixtures`");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    for fixture in &cfg.fixtures {
        let path = cfg_dir.join(fixture);
        let src = std::fs::read_to_string(&path)?;
        let file_name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => return Err(Box::new(CommandError::InvalidCommand))
        };
        ans.push(Box::new(ErrorPath::new(fixture,&file_name,&src,&cfg.markers,step.clone(),ExitClass::InputError)));
    }
    Ok(ans)
}

pub fn run(cmd: &clap::ArgMatches) -> STDRESULT {
    let cfg_path = Path::new(cmd.get_one::<String>("config").expect(RCH));
    let cfg = HarnessConfig::from_file(cfg_path)?;
    let cfg_dir = cfg_path.parent().unwrap_or(Path::new("."));
    let (asm,asm_args) = external(&cfg,"asm")?;
    let mut inverse = Step::new(&asm,&[]);
    inverse.args = asm_args;
    let mode = cmd.get_one::<String>("mode").expect(RCH).as_str();
    let disasm = match mode {
        "errors" => None,
        _ => Some(external(&cfg,"disasm")?)
    };
    let v = &cfg.vectors;
    let mut suite = Suite::new(&cfg.faults);
    match (mode,&disasm) {
        ("errors",_) => {
            for s in error_paths(&cfg,cfg_dir,&inverse)? {
                suite.add(s);
            }
        },
        (_,Some((disasm,disasm_args))) => {
            // disassemble then reassemble
            let mut forward = Step::new(disasm,&[]);
            forward.args = disasm_args.clone();
            let scenarios = match mode {
                "exhaustive" => {
                    let plan = ChunkPlan::new(v.capacity,v.base,v.filler)?;
                    RoundTrip::exhaustive(&plan,&forward,&inverse,cfg.length_tolerance)
                },
                "random" => RoundTrip::random(v.random_runs,v.block_size,v.base,&forward,&inverse,cfg.length_tolerance),
                _ => return Err(Box::new(CommandError::InvalidCommand))
            };
            for s in scenarios {
                suite.add(Box::new(s));
            }
        },
        _ => return Err(Box::new(CommandError::InvalidCommand))
    }
    info!("running {} scenarios",suite.len());
    let outcomes = suite.run();
    for outcome in &outcomes {
        println!("{}",outcome);
    }
    let (passed,failed) = tally(&outcomes);
    println!("{} passed, {} failed",passed.to_string().green(),failed.to_string().red());
    if failed > 0 {
        return Err(Box::new(CommandError::ScenariosFailed(failed)));
    }
    Ok(())
}
