//! # `ti99check` main library
//!
//! This library is a conformance harness for the TI-99 toolchain programs (assemblers,
//! disassemblers, disk and volume managers, BASIC tool).  It proves that round trips through
//! the tools reproduce the original bytes, and that bad input produces clean diagnostics.
//!
//! ## Architecture
//!
//! Data flows one way through the modules:
//! * `gen` produces memory images covering the opcode space, plus record fixtures
//! * `fs` builds and inspects TI disk volumes, `fs::recs` encodes the logical records
//! * `img` handles raw sector images and multi-volume containers
//! * `tools` runs an external program (or an in-process fake) through the `Tool` trait
//! * `compare` checks two artifacts for equality modulo declared "don't care" regions
//! * `scenario` sequences the above and guarantees the scratch workspace is removed
//!
//! ## Determinism
//!
//! Every generator is a pure function of its parameters and seed.  Scenarios run strictly one
//! after the other, and the only shared state, the scratch workspace, belongs to the scenario
//! that is running.  Default-option strings for the tools are passed to the child process
//! explicitly, the harness never changes its own environment.

pub mod config;
pub mod gen;
pub mod img;
pub mod fs;
pub mod compare;
pub mod tools;
pub mod scenario;
pub mod commands;

use std::fmt::Write;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Render binary in columns of hex and ascii, one row per 16 bytes, starting at `start_addr`.
pub fn hex_block(start_addr: usize,block: &[u8]) -> String {
    let mut ans = String::new();
    let mut slice_start = 0;
    if block.len()==0 {
        return ans;
    }
    loop {
        let row_label = start_addr + slice_start;
        let slice_end = usize::min(slice_start + 16,block.len());
        let slice = &block[slice_start..slice_end];
        let txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x<32 => '.' as u8,
            x if x<127 => x,
            _ => '.' as u8
        }).collect();
        write!(&mut ans,"{:04X} : ",row_label).expect("unreachable");
        for byte in slice {
            write!(&mut ans,"{:02X} ",byte).expect("unreachable");
        }
        for _blank in slice_end..slice_start+16 {
            ans += "   ";
        }
        writeln!(&mut ans,"| {}",String::from_utf8_lossy(&txt)).expect("unreachable");
        slice_start += 16;
        if slice_end==block.len() {
            break;
        }
    }
    ans
}

/// Display binary to stdout in columns of hex and ascii
pub fn display_block(start_addr: usize,block: &[u8]) {
    print!("{}",hex_block(start_addr,block));
}

/// Hex window of up to 16 bytes either side of `offset`, aligned to a row, for error reports
pub fn hex_window(block: &[u8],offset: usize) -> String {
    let beg = (offset / 16).saturating_sub(1) * 16;
    let end = usize::min(beg + 48,block.len());
    if beg >= end {
        return String::from("(past end of data)\n");
    }
    hex_block(beg,&block[beg..end])
}

/// This takes any bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// if `escape_cc` is true, ascii control characters are also escaped.
pub fn escaped_ascii_from_bytes(bytes: &[u8],escape_cc: bool) -> String {
    let mut result = String::new();
    let (lb,ub) = match escape_cc {
        true => (0x20,0x7e),
        false => (0x00,0x7f)
    };
    for b in bytes {
        if *b>=lb && *b<=ub && *b!=b'\\' {
            result.push(*b as char);
        } else {
            write!(&mut result,"\\x{:02X}",b).expect("unreachable");
        }
    }
    return result;
}

#[test]
fn test_hex_block() {
    let dump = hex_block(0x1000,&[0x41,0x42,0x00,0xff]);
    assert_eq!(dump,"1000 : 41 42 00 FF                                     | AB..\n");
    let long: Vec<u8> = (0..40).collect();
    let window = hex_window(&long,35);
    assert!(window.starts_with("0010 : 10 11"));
    assert_eq!(window.lines().count(),2);
}

#[test]
fn test_escaped_ascii() {
    assert_eq!(escaped_ascii_from_bytes(b"HI\x01\\",true),"HI\\x01\\x5C");
    assert_eq!(escaped_ascii_from_bytes(b"\x0d",false),"\r");
}
