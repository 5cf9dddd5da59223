//! ### Container comparison
//!
//! Cartridge packages are ZIP archives with one main binary entry plus auxiliary
//! metadata entries with fixed names.  Only the main entry's bytes are compared,
//! the auxiliary entries need only be present.

use std::io::{Cursor,Read,Write};
use zip::ZipArchive;
use zip::write::SimpleFileOptions;
use log::{debug,error};
use super::{Error,MaskSpec,compare_bytes};

fn entry_bytes(archive: &mut ZipArchive<Cursor<&[u8]>>,name: &str) -> Result<Vec<u8>,Error> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Err(Error::MissingEntry(name.to_string())),
        Err(e) => return Err(Error::Zip(e))
    };
    let mut ans = Vec::new();
    file.read_to_end(&mut ans)?;
    Ok(ans)
}

/// Compare the `main` entry of both containers exactly, and require every name in
/// `required` to exist in both.
pub fn compare_container(expected: &[u8],actual: &[u8],required: &[&str],main: &str) -> Result<(),Error> {
    let mut exp = ZipArchive::new(Cursor::new(expected))?;
    let mut act = ZipArchive::new(Cursor::new(actual))?;
    for name in required {
        for archive in [&exp,&act] {
            if !archive.file_names().any(|n| n==*name) {
                error!("required entry `{}` not found",name);
                return Err(Error::MissingEntry(name.to_string()));
            }
        }
    }
    let a = entry_bytes(&mut exp,main)?;
    let b = entry_bytes(&mut act,main)?;
    if let Err(e) = compare_bytes(&a,&b,&MaskSpec::new(),0) {
        return Err(Error::EntryMismatch { name: main.to_string(), detail: e.to_string() });
    }
    debug!("container entry `{}` matches",main);
    Ok(())
}

/// Package `entries` into an uncompressed container
pub fn build_container(entries: &[(&str,&[u8])]) -> Result<Vec<u8>,Error> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name,dat) in entries {
        writer.start_file(*name,opt)?;
        writer.write_all(dat)?;
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_entry_and_required_names() {
        let rom: &[u8] = &[0xaa,0x01,0x02,0x03];
        let bad: &[u8] = &[0xaa,0x01,0x02,0x04];
        let a = build_container(&[("layout.xml",b"<layout/>".as_slice()),("meta-inf.xml",b"<meta a='1'/>".as_slice()),("prog.bin",rom)]).expect("zip failed");
        let b = build_container(&[("prog.bin",rom),("meta-inf.xml",b"<meta a='2'/>".as_slice()),("layout.xml",b"".as_slice())]).expect("zip failed");
        assert!(compare_container(&a,&b,&["layout.xml","meta-inf.xml"],"prog.bin").is_ok());
        let c = build_container(&[("prog.bin",bad),("layout.xml",b"".as_slice()),("meta-inf.xml",b"".as_slice())]).expect("zip failed");
        assert!(matches!(compare_container(&a,&c,&["layout.xml"],"prog.bin"),Err(Error::EntryMismatch { .. })));
        let d = build_container(&[("prog.bin",rom)]).expect("zip failed");
        assert!(matches!(compare_container(&a,&d,&["layout.xml"],"prog.bin"),Err(Error::MissingEntry(_))));
    }
}
