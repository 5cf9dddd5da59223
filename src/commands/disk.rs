//! Disk subcommands.  Every mutation loads the whole image, changes it in memory, and writes
//! it back only if the change succeeded.

use clap;
use std::io::{Read,Write};
use std::str::FromStr;
use log::{info,error};
use super::CommandError;
use crate::fs::FileFormat;
use crate::fs::ti99::Disk;
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

fn open(cmd: &clap::ArgMatches) -> Result<(String,Disk),crate::DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect(RCH).to_string();
    let bytes = std::fs::read(&path)?;
    let disk = Disk::from_template(&bytes)?;
    Ok((path,disk))
}

fn save(path: &str,disk: &Disk) -> STDRESULT {
    std::fs::write(path,disk.to_bytes())?;
    Ok(())
}

pub fn mkdsk(cmd: &clap::ArgMatches) -> STDRESULT {
    let path = cmd.get_one::<String>("dimg").expect(RCH);
    let vol = cmd.get_one::<String>("volume").expect(RCH);
    let sectors = *cmd.get_one::<u16>("sectors").expect(RCH);
    let sides = *cmd.get_one::<u8>("sides").expect(RCH);
    let density = *cmd.get_one::<u8>("density").expect(RCH);
    if std::path::Path::new(path).exists() {
        error!("cannot overwrite {}",path);
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let disk = Disk::init(vol,sectors as usize,sides,density)?;
    save(path,&disk)?;
    info!("created {}",path);
    Ok(())
}

pub fn catalog(cmd: &clap::ArgMatches) -> STDRESULT {
    let (_path,disk) = open(cmd)?;
    print!("{}",disk.catalog_text()?);
    Ok(())
}

pub fn put(cmd: &clap::ArgMatches) -> STDRESULT {
    if atty::is(atty::Stream::Stdin) {
        error!("cannot use `put` with console input, please pipe something in");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let name = cmd.get_one::<String>("file").expect(RCH);
    let fmt = match FileFormat::from_str(cmd.get_one::<String>("type").expect(RCH)) {
        Ok(f) => f,
        Err(e) => {
            error!("{}",e);
            return Err(Box::new(CommandError::UnknownFormat));
        }
    };
    let mut file_data = Vec::new();
    std::io::stdin().read_to_end(&mut file_data)?;
    if file_data.len()==0 {
        error!("put did not receive any data from previous node");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let (path,mut disk) = open(cmd)?;
    disk.add(name,&file_data,&fmt)?;
    save(&path,&disk)
}

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let name = cmd.get_one::<String>("file").expect(RCH);
    let (_path,disk) = open(cmd)?;
    let dat = disk.extract(name)?;
    if atty::is(atty::Stream::Stdout) && disk.format_of(name)?.is_program() {
        crate::display_block(0,&dat);
    } else {
        std::io::stdout().write_all(&dat)?;
    }
    Ok(())
}

pub fn delete(cmd: &clap::ArgMatches) -> STDRESULT {
    let name = cmd.get_one::<String>("file").expect(RCH);
    let (path,mut disk) = open(cmd)?;
    disk.delete(name)?;
    save(&path,&disk)
}

pub fn rename(cmd: &clap::ArgMatches) -> STDRESULT {
    let old = cmd.get_one::<String>("file").expect(RCH);
    let new = cmd.get_one::<String>("name").expect(RCH);
    let (path,mut disk) = open(cmd)?;
    disk.rename(old,new)?;
    save(&path,&disk)
}

pub fn protect(cmd: &clap::ArgMatches) -> STDRESULT {
    let name = cmd.get_one::<String>("file").expect(RCH);
    let on = !cmd.get_flag("off");
    let (path,mut disk) = open(cmd)?;
    disk.protect(name,on)?;
    save(&path,&disk)
}
