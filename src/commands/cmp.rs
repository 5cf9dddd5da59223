use clap;
use log::info;
use crate::compare::{MaskSpec,TextMask,compare_bytes,compare_text};
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

pub fn compare(cmd: &clap::ArgMatches) -> STDRESULT {
    let original = std::fs::read(cmd.get_one::<String>("original").expect(RCH))?;
    let result = std::fs::read(cmd.get_one::<String>("result").expect(RCH))?;
    if let Some(width) = cmd.get_one::<usize>("text") {
        let expected = String::from_utf8_lossy(&original);
        let actual = String::from_utf8_lossy(&result);
        compare_text(&expected,&actual,&TextMask::prefix(*width))?;
        info!("text matches to width {}",width);
    } else {
        let mask = match cmd.get_one::<String>("mask") {
            Some(s) => MaskSpec::parse(s)?,
            None => MaskSpec::new()
        };
        let tolerance = *cmd.get_one::<usize>("tolerance").expect(RCH);
        compare_bytes(&original,&result,&mask,tolerance)?;
        info!("{} bytes match",original.len());
    }
    eprintln!("artifacts match");
    Ok(())
}
