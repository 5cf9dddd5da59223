// test of the orchestrator using in-process stand-ins for the external tools
use std::io::Write;
use ti99check::tools::{Invocation,InProcessTool,ExitClass};
use ti99check::scenario::{Suite,RoundTrip,ErrorPath,DiskRoundTrip,Direction,Step,Phase,tally,run_scenario};
use ti99check::gen::{ChunkPlan,NOP,TestVector,random_block};
use ti99check::gen::fixtures::MarkerStyle;
use ti99check::tools::default_faults;
use ti99check::fs::FileFormat;
use ti99check::fs::ti99::Disk;
use std::str::FromStr;

type ToolFn = fn(&Invocation,&mut dyn Write,&mut dyn Write) -> i32;

const BAD_SOURCE: &str = "       AORG >A000
START  DATA >0001
       BADOP R1          ; ERROR
       END
";

/// disassembler stand-in: `in out base`, one DATA line per word
fn disasm(inv: &Invocation,_out: &mut dyn Write,err: &mut dyn Write) -> i32 {
    let args = inv.effective_args();
    if args.len() < 3 {
        let _ = writeln!(err,"usage: disasm in out base");
        return 2;
    }
    let dat = match std::fs::read(&args[0]) {
        Ok(d) => d,
        Err(_) => {
            let _ = writeln!(err,"cannot read {}",args[0]);
            return 1;
        }
    };
    let mut src = format!("       AORG >{}\n",args[2]);
    for w in dat.chunks(2) {
        match w.len() {
            2 => src += &format!("       DATA >{:02X}{:02X}\n",w[0],w[1]),
            _ => src += &format!("       BYTE >{:02X}\n",w[0])
        }
    }
    src += "       END\n";
    match std::fs::write(&args[1],src) {
        Ok(()) => 0,
        Err(_) => 1
    }
}

/// assembler stand-in: `in out [base]`, understands AORG, DATA, BYTE, END, pads when given `--pad`.
/// When `base` is given the AORG address must match it.
fn asm(inv: &Invocation,_out: &mut dyn Write,err: &mut dyn Write) -> i32 {
    let args = inv.effective_args();
    let pad = args.iter().any(|a| a=="--pad");
    let files: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let src = match std::fs::read_to_string(files[0]) {
        Ok(s) => s,
        Err(_) => {
            let _ = writeln!(err,"cannot read {}",files[0]);
            return 1;
        }
    };
    let _ = writeln!(err,"fake assembler 1.0");
    let mut obj: Vec<u8> = Vec::new();
    let mut errors = 0;
    for (i,line) in src.lines().enumerate() {
        let code = line.split(';').next().unwrap_or("");
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let ops: &[&str] = match code.starts_with(char::is_whitespace) {
            true => &tokens[..],
            false if tokens.len() > 0 => &tokens[1..],
            false => &tokens[..]
        };
        match ops.first() {
            None | Some(&"END") => {},
            Some(&"AORG") => {
                let origin = ops.get(1).map(|o| o.trim_start_matches('>')).unwrap_or("");
                if let Some(base) = files.get(2) {
                    if !origin.eq_ignore_ascii_case(base) {
                        let _ = writeln!(err,"[{:04}] Error: origin >{} is not >{}",i+1,origin,base);
                        errors += 1;
                    }
                }
            },
            Some(&"DATA") => {
                let w = u16::from_str_radix(ops[1].trim_start_matches('>'),16).unwrap_or(0);
                obj.extend_from_slice(&w.to_be_bytes());
            },
            Some(&"BYTE") => obj.push(u8::from_str_radix(ops[1].trim_start_matches('>'),16).unwrap_or(0)),
            Some(op) => {
                let _ = writeln!(err,"[{:04}] Error: Unknown opcode: {}",i+1,op);
                errors += 1;
            }
        }
    }
    if errors > 0 {
        let _ = writeln!(err,"{} error, 0 warnings",errors);
        return 1;
    }
    if pad {
        obj.extend_from_slice(&[0;4]);
    }
    match std::fs::write(files[1],obj) {
        Ok(()) => 0,
        Err(_) => 1
    }
}

fn crashing(_inv: &Invocation,_out: &mut dyn Write,_err: &mut dyn Write) -> i32 {
    panic!("list index out of range");
}

fn traceback(_inv: &Invocation,_out: &mut dyn Write,err: &mut dyn Write) -> i32 {
    let _ = writeln!(err,"Traceback (most recent call last):");
    let _ = writeln!(err,"  File \"xas99.py\", line 1");
    1
}

fn manage(args: &[String]) -> Result<(),Box<dyn std::error::Error>> {
    let mut disk = Disk::from_template(&std::fs::read(&args[1])?)?;
    match args[0].as_str() {
        "extract" => std::fs::write(&args[3],disk.extract(&args[2])?)?,
        "add" | "add-leaky" => {
            let fmt = FileFormat::from_str(&args[4])?;
            disk.add(&args[2],&std::fs::read(&args[3])?,&fmt)?;
            let mut bytes = disk.to_bytes();
            if args[0]=="add-leaky" {
                // mark sectors 160..168 used
                bytes[0x38+20] = 0xff;
            }
            std::fs::write(&args[1],bytes)?;
        },
        _ => return Err("unknown action".into())
    }
    Ok(())
}

/// disk manager stand-in: `extract disk name out` or `add disk name in format`
fn disk_manager(inv: &Invocation,_out: &mut dyn Write,err: &mut dyn Write) -> i32 {
    match manage(&inv.effective_args()) {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err,"[0000] Error: {}",e);
            1
        }
    }
}

#[test]
fn random_block_round_trip() {
    // 2048 bytes from seed 0 at >1000
    let asm_tool = InProcessTool::new("xas99",asm);
    let disasm_tool = InProcessTool::new("xda99",disasm);
    let fwd = Step::new(&disasm_tool,&["{in}","{out}","{base}"]);
    let inv = Step::new(&asm_tool,&["{in}","{out}","{base}"]);
    let scenarios = RoundTrip::random(1,2048,0x1000,&fwd,&inv,0);
    assert_eq!(scenarios[0].vector.payload,random_block(0,2048,0x1000).data);
    assert_eq!(scenarios[0].vector.base,0x1000);
    let outcome = run_scenario(&scenarios[0],&default_faults());
    assert!(outcome.passed(),"{}",outcome);
    assert_eq!(outcome.trace,vec![Phase::Setup,Phase::Generate,Phase::Invoke,Phase::InvokeInverse,Phase::Compare,Phase::Teardown,Phase::Passed]);
}

#[test]
fn base_address_reaches_tools() {
    let asm_tool = InProcessTool::new("xas99",asm);
    let disasm_tool = InProcessTool::new("xda99",disasm);
    let fwd = Step::new(&disasm_tool,&["{in}","{out}","{base}"]);
    let inv = Step::new(&asm_tool,&["{in}","{out}","{base}"]);
    // an assembler pinned to >A000 rejects the >1000 listing
    let pinned = Step::new(&asm_tool,&["{in}","{out}","A000"]);
    let img = random_block(5,64,0x1000);
    let mut suite = Suite::new(&default_faults());
    suite.add(Box::new(RoundTrip::new(TestVector::from_image("at 1000",&img),fwd.clone(),Some(inv),0)));
    suite.add(Box::new(RoundTrip::new(TestVector::from_image("pinned",&img),fwd,Some(pinned),0)));
    let outcomes = suite.run();
    assert!(outcomes[0].passed(),"{}",outcomes[0]);
    let fail = outcomes[1].failure.as_ref().expect("origin not checked");
    assert_eq!(fail.phase,Phase::InvokeInverse);
    assert!(fail.detail.contains("origin >1000 is not >A000"),"{}",fail.detail);
}

#[test]
fn exhaustive_suite() {
    let asm_tool = InProcessTool::new("xas99",asm);
    let disasm_tool = InProcessTool::new("xda99",disasm);
    let fwd = Step::new(&disasm_tool,&["{in}","{out}","{base}"]);
    let inv = Step::new(&asm_tool,&["{in}","{out}","{base}"]);
    let plan = ChunkPlan::new(0x8000,0x0000,NOP).expect("bad plan");
    let mut suite = Suite::new(&default_faults());
    for s in RoundTrip::exhaustive(&plan,&fwd,&inv,0) {
        suite.add(Box::new(s));
    }
    assert_eq!(suite.len(),plan.chunk_count());
    let outcomes = suite.run();
    assert_eq!(tally(&outcomes),(plan.chunk_count(),0));
}

#[test]
fn defaults_do_not_leak() {
    let asm_tool = InProcessTool::new("xas99",asm);
    let disasm_tool = InProcessTool::new("xda99",disasm);
    let fwd = Step::new(&disasm_tool,&["{in}","{out}","{base}"]);
    let padded = Step::new(&asm_tool,&["{in}","{out}"]).with_defaults(Some("--pad"));
    let plain = Step::new(&asm_tool,&["{in}","{out}"]);
    let vector = TestVector::from_image("seed 3",&random_block(3,256,0xa000));
    let mut suite = Suite::new(&default_faults());
    suite.add(Box::new(RoundTrip::new(vector.clone(),fwd.clone(),Some(padded.clone()),4)));
    suite.add(Box::new(RoundTrip::new(vector.clone(),fwd.clone(),Some(padded),0)));
    suite.add(Box::new(RoundTrip::new(vector,fwd,Some(plain),0)));
    let outcomes = suite.run();
    assert!(outcomes[0].passed());
    let fail = outcomes[1].failure.as_ref().expect("tolerance not applied");
    assert_eq!(fail.phase,Phase::Compare);
    assert!(fail.detail.contains("260"));
    assert!(outcomes[2].passed(),"{}",outcomes[2]);
}

#[test]
fn single_error_diagnosed() {
    let asm_tool = InProcessTool::new("xas99",asm);
    let step = Step::new(&asm_tool,&["{in}","{out}"]);
    let scenario = ErrorPath::new("bad opcode","bad.asm",BAD_SOURCE,&MarkerStyle::default(),step,ExitClass::InputError);
    assert_eq!(scenario.vector.expected.len(),1);
    assert_eq!(scenario.vector.expected[0].line,3);
    let outcome = run_scenario(&scenario,&default_faults());
    assert!(outcome.passed(),"{}",outcome);
    assert!(outcome.trace.contains(&Phase::Diagnose));
}

#[test]
fn missing_marker_fails() {
    let asm_tool = InProcessTool::new("xas99",asm);
    let step = Step::new(&asm_tool,&["{in}","{out}"]);
    let src = BAD_SOURCE.replace("; ERROR","");
    let scenario = ErrorPath::new("unmarked","bad.asm",&src,&MarkerStyle::default(),step,ExitClass::InputError);
    let outcome = run_scenario(&scenario,&default_faults());
    let fail = outcome.failure.expect("extra diagnostic missed");
    assert_eq!(fail.phase,Phase::Diagnose);
    assert_eq!(fail.artifact,"bad.asm");
}

#[test]
fn raw_faults_fail() {
    for func in [crashing as ToolFn,traceback as ToolFn] {
        let tool = InProcessTool::new("xas99",func);
        let step = Step::new(&tool,&["{in}","{out}"]);
        let scenario = ErrorPath::new("fault","bad.asm",BAD_SOURCE,&MarkerStyle::default(),step,ExitClass::InputError);
        let outcome = run_scenario(&scenario,&default_faults());
        let fail = outcome.failure.expect("fault missed");
        assert_eq!(fail.phase,Phase::Invoke);
        assert!(fail.detail.contains("unstructured fault"),"{}",fail.detail);
    }
}

#[test]
fn disk_both_directions() {
    let tool = InProcessTool::new("xdm99",disk_manager);
    let template = Disk::init("BLANK",360,1,1).expect("format failed").to_bytes();
    let payload = b"       AORG >A000\n       DATA >1234\n       END\n";
    let fmt = FileFormat::from_str("DIS/VAR 80").expect("bad format");
    let extract = Step::new(&tool,&["extract","{disk}","{name}","{out}"]);
    let add = Step::new(&tool,&["add","{disk}","{name}","{in}","{format}"]);
    let leaky = Step::new(&tool,&["add-leaky","{disk}","{name}","{in}","{format}"]);
    let mut suite = Suite::new(&default_faults());
    suite.add(Box::new(DiskRoundTrip::new("tool extracts",&template,"SRC",payload,fmt.clone(),extract,Direction::ToolExtracts)));
    suite.add(Box::new(DiskRoundTrip::new("tool adds",&template,"SRC",payload,fmt.clone(),add,Direction::ToolAdds).with_image_compare(true)));
    suite.add(Box::new(DiskRoundTrip::new("tool leaks",&template,"SRC",payload,fmt,leaky,Direction::ToolAdds)));
    let outcomes = suite.run();
    assert!(outcomes[0].passed(),"{}",outcomes[0]);
    assert!(outcomes[1].passed(),"{}",outcomes[1]);
    let fail = outcomes[2].failure.as_ref().expect("leak missed");
    assert_eq!(fail.check,"allocation bitmap");
}
