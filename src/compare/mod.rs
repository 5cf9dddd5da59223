//! # Masked Comparator
//!
//! Decides whether an artifact produced by the tools matches its reference.
//! Binary artifacts are compared byte for byte outside of the `MaskSpec` ranges, which cover
//! fields that legitimately differ (dates, reserved bytes, padding).  The reconstructed side
//! may be longer than the original by up to a declared tolerance.
//!
//! * `container` compares ZIP style packages by their main entry
//! * `tokens` compares text holding escape sequences as typed token streams
//!
//! Every failure names the first offending offset, line, entry, or token.

pub mod container;
pub mod tokens;

use std::str::FromStr;
use log::{debug,error};
use crate::hex_window;

/// Enumerates comparison failures.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("length mismatch: original {original} bytes, result {result} bytes, tolerance {tolerance}")]
    LengthMismatch { original: usize, result: usize, tolerance: usize },
    #[error("mismatch at offset {offset:#06X}, original {expected:#04X}, result {actual:#04X}\noriginal:\n{expected_window}result:\n{actual_window}")]
    Mismatch { offset: usize, expected: u8, actual: u8, expected_window: String, actual_window: String },
    #[error("line {line} differs:\n  expected: {expected}\n  actual:   {actual}")]
    FormatMismatch { line: usize, expected: String, actual: String },
    #[error("container entry `{0}` is missing")]
    MissingEntry(String),
    #[error("container entry `{name}` differs: {detail}")]
    EntryMismatch { name: String, detail: String },
    #[error("token {index} differs: expected {expected}, actual {actual}")]
    TokenMismatch { index: usize, expected: String, actual: String },
    #[error("bad mask range `{0}`")]
    BadMask(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error)
}

/// Immutable set of (offset,length) ranges that are ignored by a comparison.
/// Builder methods return a new mask.
#[derive(Clone,PartialEq,Eq,Debug,Default)]
pub struct MaskSpec {
    ranges: Vec<(usize,usize)>
}

impl MaskSpec {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }
    pub fn from_ranges(ranges: &[(usize,usize)]) -> Self {
        let mut ans = Self::new();
        for (off,len) in ranges {
            ans = ans.with(*off,*len);
        }
        ans
    }
    pub fn with(&self,offset: usize,len: usize) -> Self {
        let mut ranges = self.ranges.clone();
        if len > 0 {
            ranges.push((offset,len));
            ranges.sort();
        }
        Self { ranges }
    }
    /// Union of two masks
    pub fn merge(&self,other: &MaskSpec) -> Self {
        let mut ans = self.clone();
        for (off,len) in &other.ranges {
            ans = ans.with(*off,*len);
        }
        ans
    }
    pub fn ranges(&self) -> &[(usize,usize)] {
        &self.ranges
    }
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
    pub fn contains(&self,idx: usize) -> bool {
        self.ranges.iter().any(|(off,len)| idx >= *off && idx < off + len)
    }
    /// Parse `off:len[,off:len]`, numbers are decimal or `0x` hex
    pub fn parse(s: &str) -> Result<Self,Error> {
        let mut ans = Self::new();
        for item in s.split(',').map(|x| x.trim()).filter(|x| x.len() > 0) {
            let (off,len) = match item.split_once(':') {
                Some((o,l)) => (parse_num(o),parse_num(l)),
                None => (None,None)
            };
            match (off,len) {
                (Some(o),Some(l)) => ans = ans.with(o,l),
                _ => {
                    error!("mask range should be offset:length, got `{}`",item);
                    return Err(Error::BadMask(item.to_string()));
                }
            }
        }
        Ok(ans)
    }
}

impl FromStr for MaskSpec {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        Self::parse(s)
    }
}

fn parse_num(s: &str) -> Option<usize> {
    let s = s.trim();
    match s.strip_prefix("0x").or(s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex,16).ok(),
        None => usize::from_str(s).ok()
    }
}

/// Compare `original` with the `result` of a round trip.
/// The result may be longer by up to `tolerance` bytes, the excess is not inspected.
pub fn compare_bytes(original: &[u8],result: &[u8],mask: &MaskSpec,tolerance: usize) -> Result<(),Error> {
    if original.len() > result.len() || result.len() - original.len() > tolerance {
        error!("lengths {} and {} differ by more than {}",original.len(),result.len(),tolerance);
        return Err(Error::LengthMismatch { original: original.len(), result: result.len(), tolerance });
    }
    for i in 0..original.len() {
        if mask.contains(i) {
            continue;
        }
        if original[i]!=result[i] {
            error!("first difference at offset {:#06X}",i);
            return Err(Error::Mismatch {
                offset: i,
                expected: original[i],
                actual: result[i],
                expected_window: hex_window(original,i),
                actual_window: hex_window(result,i)
            });
        }
    }
    debug!("{} bytes match, {} masked ranges",original.len(),mask.ranges().len());
    Ok(())
}

/// Declares which part of each text line is deterministic
#[derive(Clone,PartialEq,Debug,Default)]
pub struct TextMask {
    /// compare only this many leading characters, None for the whole line
    pub prefix_width: Option<usize>,
    /// 1-based line numbers that are not compared at all
    pub skip_lines: Vec<usize>
}

impl TextMask {
    pub fn prefix(width: usize) -> Self {
        Self {
            prefix_width: Some(width),
            skip_lines: Vec::new()
        }
    }
    pub fn skip(&self,line: usize) -> Self {
        let mut ans = self.clone();
        ans.skip_lines.push(line);
        ans
    }
    fn key<'a>(&self,line: &'a str) -> &'a str {
        let cut = match self.prefix_width {
            Some(w) => match line.char_indices().nth(w) {
                Some((i,_)) => &line[0..i],
                None => line
            },
            None => line
        };
        cut.trim_end()
    }
}

/// Line oriented comparison, each line is compared up to the declared prefix width,
/// line counts must agree.
pub fn compare_text(expected: &str,actual: &str,mask: &TextMask) -> Result<(),Error> {
    let exp: Vec<&str> = expected.lines().collect();
    let act: Vec<&str> = actual.lines().collect();
    for i in 0..usize::max(exp.len(),act.len()) {
        let line = i + 1;
        if mask.skip_lines.contains(&line) {
            continue;
        }
        let (e,a) = match (exp.get(i),act.get(i)) {
            (Some(e),Some(a)) => (mask.key(e),mask.key(a)),
            (Some(e),None) => (mask.key(e),"(missing)"),
            (None,Some(a)) => ("(missing)",mask.key(a)),
            (None,None) => break
        };
        if e!=a {
            error!("text differs at line {}",line);
            return Err(Error::FormatMismatch { line, expected: e.to_string(), actual: a.to_string() });
        }
    }
    Ok(())
}
