use clap;
use std::io::Write;
use log::{info,error};
use super::{CommandError,parse_address};
use crate::gen::{ChunkPlan,NOP,random_block};
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

pub fn generate(cmd: &clap::ArgMatches) -> STDRESULT {
    let base = match cmd.get_one::<String>("base") {
        Some(s) => parse_address(s)?,
        None => 0xa000
    };
    let img = match cmd.get_one::<String>("mode").expect(RCH).as_str() {
        "exhaustive" => {
            let capacity = *cmd.get_one::<usize>("capacity").expect(RCH);
            let index = *cmd.get_one::<usize>("index").expect(RCH);
            let plan = ChunkPlan::new(capacity,base,NOP)?;
            match plan.chunk(index) {
                Some(chunk) => {
                    info!("chunk {} of {}",index,plan.chunk_count());
                    chunk.image
                },
                None => {
                    error!("there are only {} chunks",plan.chunk_count());
                    return Err(Box::new(CommandError::OutOfRange));
                }
            }
        },
        "random" => {
            let size = *cmd.get_one::<usize>("size").expect(RCH);
            let seed = *cmd.get_one::<u64>("seed").expect(RCH);
            random_block(seed,size,base)
        },
        _ => return Err(Box::new(CommandError::InvalidCommand))
    };
    if atty::is(atty::Stream::Stdout) {
        crate::display_block(img.base as usize,&img.data);
    } else {
        std::io::stdout().write_all(&img.data)?;
    }
    Ok(())
}
