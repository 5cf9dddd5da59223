//! # File System Module
//!
//! Handles the TI disk file system and the logical records stored inside its files.
//! * `recs` encodes and decodes FIX and VAR records to and from 256 byte sectors
//! * `ti99` is the disk image builder, it owns a sector image and keeps the VIB, FDI, and FDRs consistent
//!
//! This module holds the pieces both of them need, namely the file format tag.
//! A format is either `PROGRAM` (a memory image) or a record format that combines a
//! content kind (`DIS` or `INT`) with a record family (`FIX` or `VAR`) and a record length,
//! written e.g. `DIS/VAR 80` or `INT/FIX 128`.

pub mod recs;
pub mod ti99;

use std::fmt;
use std::str::FromStr;
use log::error;

pub const SECTOR_SIZE: usize = 256;

/// Enumerates file format errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file format `{0}` is not recognized")]
    FileFormat(String),
    #[error("record length {0} is not allowed for this record family")]
    RecordLength(usize),
    #[error("file image format is wrong")]
    FileImageFormat
}

/// Content kind, display (character-oriented) or internal (binary)
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum ContentKind {
    Display,
    Internal
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum RecordFamily {
    Fixed,
    Variable
}

/// Padding policy for fixed records, follows from the content kind.
/// Space padding is stripped on decode, zero padding is kept.
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Padding {
    Space,
    Zero
}

impl Padding {
    pub fn byte(&self) -> u8 {
        match self {
            Self::Space => b' ',
            Self::Zero => 0
        }
    }
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum FileFormat {
    Program,
    Records {
        kind: ContentKind,
        family: RecordFamily,
        len: u8
    }
}

impl FileFormat {
    /// Record format, checking the length against the family's limits
    pub fn records(kind: ContentKind,family: RecordFamily,len: usize) -> Result<Self,Error> {
        let max = match family {
            RecordFamily::Fixed => 255,
            RecordFamily::Variable => 254
        };
        if len < 1 || len > max {
            error!("record length {} out of range 1..={}",len,max);
            return Err(Error::RecordLength(len));
        }
        Ok(Self::Records { kind, family, len: len as u8 })
    }
    pub fn fixed(kind: ContentKind,len: usize) -> Result<Self,Error> {
        Self::records(kind,RecordFamily::Fixed,len)
    }
    pub fn variable(kind: ContentKind,len: usize) -> Result<Self,Error> {
        Self::records(kind,RecordFamily::Variable,len)
    }
    pub fn is_program(&self) -> bool {
        *self==Self::Program
    }
    pub fn record_len(&self) -> usize {
        match self {
            Self::Program => 0,
            Self::Records { len, .. } => *len as usize
        }
    }
    pub fn padding(&self) -> Padding {
        match self {
            Self::Records { kind: ContentKind::Display, .. } => Padding::Space,
            _ => Padding::Zero
        }
    }
    /// Records per sector as stored in the FDR (a byte), 0 for programs
    pub fn records_per_sector(&self) -> usize {
        match self {
            Self::Program => 0,
            Self::Records { family: RecordFamily::Fixed, len, .. } => usize::min(255,SECTOR_SIZE / *len as usize),
            Self::Records { family: RecordFamily::Variable, len, .. } => (SECTOR_SIZE - 1) / (*len as usize + 1)
        }
    }
}

impl FromStr for FileFormat {
    type Err = Error;
    /// Accepts `PROGRAM`, `DIS/FIX 80`, `INT/VAR254`, or the bare `FIXn` (internal) and `VARn` (display)
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        let norm = s.trim().to_uppercase();
        if norm=="PROGRAM" || norm=="PRG" {
            return Ok(Self::Program);
        }
        let (kind,rest) = match norm.split_once('/') {
            Some(("DIS",r)) => (Some(ContentKind::Display),r.trim()),
            Some(("INT",r)) => (Some(ContentKind::Internal),r.trim()),
            Some(_) => return Err(Error::FileFormat(s.to_string())),
            None => (None,norm.as_str())
        };
        let (family,digits) = if let Some(d) = rest.strip_prefix("FIX") {
            (RecordFamily::Fixed,d)
        } else if let Some(d) = rest.strip_prefix("VAR") {
            (RecordFamily::Variable,d)
        } else {
            return Err(Error::FileFormat(s.to_string()));
        };
        let len = match usize::from_str(digits.trim()) {
            Ok(l) => l,
            Err(_) => return Err(Error::FileFormat(s.to_string()))
        };
        let kind = match (kind,family) {
            (Some(k),_) => k,
            (None,RecordFamily::Fixed) => ContentKind::Internal,
            (None,RecordFamily::Variable) => ContentKind::Display
        };
        Self::records(kind,family,len)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program => write!(f,"PROGRAM"),
            Self::Records { kind, family, len } => {
                let k = match kind {
                    ContentKind::Display => "DIS",
                    ContentKind::Internal => "INT"
                };
                let fam = match family {
                    RecordFamily::Fixed => "FIX",
                    RecordFamily::Variable => "VAR"
                };
                write!(f,"{}/{} {}",k,fam,len)
            }
        }
    }
}
