//! ## Record codec
//!
//! Packs logical records into 256 byte sectors, and unpacks them again.
//! Records never span a sector boundary.
//! * FIX n: `records_per_sector` slots of n bytes, each record padded per the format's policy
//! * VAR n: each record is a length byte followed by the data, the last record in a sector
//!   is followed by `0xff`, the remainder of the sector is unused
//!
//! Decoding a VAR sector trusts the length byte over any other information.  A length byte that
//! exceeds the declared maximum is a format violation for that record only, decoding continues
//! with the next record.

use log::{trace,warn,error};
use super::{FileFormat,RecordFamily,Padding,SECTOR_SIZE};

/// marks the end of the records in a VAR sector
pub const VAR_TERMINATOR: u8 = 0xff;

#[derive(thiserror::Error,Debug,PartialEq)]
pub enum Error {
    #[error("record {index} has length byte {len}, maximum is {max}")]
    FormatViolation { index: usize, len: usize, max: usize },
    #[error("record {index} of length {len} does not fit the format")]
    RecordLength { index: usize, len: usize },
    #[error("record {0} runs past the end of its sector")]
    Overflow(usize),
    #[error("{0} records or sectors exceed the 16 bit FDR count")]
    Count(usize),
    #[error("program files do not hold records")]
    NotRecords
}

fn fdr_count(n: usize) -> Result<u16,Error> {
    match u16::try_from(n) {
        Ok(c) => Ok(c),
        Err(_) => {
            error!("count {} does not fit the FDR",n);
            Err(Error::Count(n))
        }
    }
}

/// Sectors holding a file's records, along with the counts the FDR needs.
#[derive(Clone,PartialEq,Debug)]
pub struct Encoded {
    pub sectors: Vec<Vec<u8>>,
    /// offset of the first free byte in the last sector (VAR), 0 for FIX unless the disk layer records a short last slice
    pub eof: u8,
    /// FIX: number of records, VAR: number of sectors
    pub level3: u16
}

/// Encode fixed records, each record may be shorter than `len` and is padded.
pub fn encode_fixed(records: &[Vec<u8>],len: usize,pad: Padding) -> Result<Encoded,Error> {
    let rps = usize::min(255,SECTOR_SIZE / len);
    let level3 = fdr_count(records.len())?;
    let mut sectors: Vec<Vec<u8>> = Vec::new();
    for (i,rec) in records.iter().enumerate() {
        if rec.len() > len {
            error!("record {} is {} bytes, slot is {}",i,rec.len(),len);
            return Err(Error::RecordLength { index: i, len: rec.len() });
        }
        if i % rps == 0 {
            sectors.push(vec![0;SECTOR_SIZE]);
        }
        let offset = (i % rps) * len;
        let sec = sectors.len() - 1;
        let slot = &mut sectors[sec][offset..offset+len];
        slot.fill(pad.byte());
        slot[0..rec.len()].copy_from_slice(rec);
    }
    trace!("{} fixed records in {} sectors",records.len(),sectors.len());
    Ok(Encoded {
        sectors,
        eof: 0,
        level3
    })
}

/// Decode `count` fixed records.  Space padding is stripped, zero padding is kept.
pub fn decode_fixed(sectors: &[Vec<u8>],len: usize,count: usize,pad: Padding) -> Vec<Result<Vec<u8>,Error>> {
    let rps = usize::min(255,SECTOR_SIZE / len);
    let mut ans = Vec::new();
    for i in 0..count {
        let offset = (i % rps) * len;
        let rec = match sectors.get(i / rps) {
            Some(sec) if sec.len() >= offset + len => sec[offset..offset+len].to_vec(),
            _ => {
                warn!("record {} is past the last sector",i);
                ans.push(Err(Error::Overflow(i)));
                continue;
            }
        };
        ans.push(Ok(match pad {
            Padding::Space => strip_trailing(&rec,b' '),
            Padding::Zero => rec
        }));
    }
    ans
}

fn strip_trailing(rec: &[u8],pad: u8) -> Vec<u8> {
    let mut end = rec.len();
    while end > 0 && rec[end-1]==pad {
        end -= 1;
    }
    rec[0..end].to_vec()
}

/// Encode variable records of at most `max` bytes each.
pub fn encode_var(records: &[Vec<u8>],max: usize) -> Result<Encoded,Error> {
    let mut sectors: Vec<Vec<u8>> = Vec::new();
    let mut buf: Vec<u8> = Vec::new();
    for (i,rec) in records.iter().enumerate() {
        if rec.len() > max || rec.len() >= VAR_TERMINATOR as usize {
            error!("record {} is {} bytes, maximum is {}",i,rec.len(),max);
            return Err(Error::RecordLength { index: i, len: rec.len() });
        }
        // leave room for the terminator
        if buf.len() + rec.len() + 2 > SECTOR_SIZE {
            sectors.push(close_var_sector(&buf));
            buf = Vec::new();
        }
        buf.push(rec.len() as u8);
        buf.extend_from_slice(rec);
    }
    let eof = buf.len() as u8;
    if buf.len() > 0 {
        sectors.push(close_var_sector(&buf));
    }
    trace!("{} variable records in {} sectors",records.len(),sectors.len());
    Ok(Encoded {
        level3: fdr_count(sectors.len())?,
        eof: match sectors.len() { 0 => 0, _ => eof },
        sectors
    })
}

fn close_var_sector(buf: &[u8]) -> Vec<u8> {
    let mut sec = buf.to_vec();
    sec.push(VAR_TERMINATOR);
    sec.resize(SECTOR_SIZE,0);
    sec
}

/// Decode variable records from the sectors in order.
/// Each record is decoded independently, a bad length byte only spoils its own record.
pub fn decode_var(sectors: &[Vec<u8>],max: usize) -> Vec<Result<Vec<u8>,Error>> {
    let mut ans = Vec::new();
    for sec in sectors {
        let mut ptr = 0;
        while ptr < sec.len() && sec[ptr]!=VAR_TERMINATOR {
            let index = ans.len();
            let len = sec[ptr] as usize;
            if ptr + 1 + len > sec.len() {
                warn!("record {} runs past the end of the sector",index);
                ans.push(Err(Error::Overflow(index)));
                break;
            }
            if len > max {
                warn!("record {} has length byte {}, maximum is {}",index,len,max);
                ans.push(Err(Error::FormatViolation { index, len, max }));
            } else {
                ans.push(Ok(sec[ptr+1..ptr+1+len].to_vec()));
            }
            ptr += 1 + len;
        }
    }
    ans
}

/// Encode records according to a record format
pub fn encode(records: &[Vec<u8>],fmt: &FileFormat) -> Result<Encoded,Error> {
    match fmt {
        FileFormat::Program => Err(Error::NotRecords),
        FileFormat::Records { family: RecordFamily::Fixed, len, .. } => encode_fixed(records,*len as usize,fmt.padding()),
        FileFormat::Records { family: RecordFamily::Variable, len, .. } => encode_var(records,*len as usize)
    }
}

/// Decode records according to a record format, `level3` is the FDR count.
pub fn decode(sectors: &[Vec<u8>],fmt: &FileFormat,level3: usize) -> Result<Vec<Result<Vec<u8>,Error>>,Error> {
    match fmt {
        FileFormat::Program => Err(Error::NotRecords),
        FileFormat::Records { family: RecordFamily::Fixed, len, .. } => Ok(decode_fixed(sectors,*len as usize,level3,fmt.padding())),
        FileFormat::Records { family: RecordFamily::Variable, len, .. } => {
            let used = usize::min(level3,sectors.len());
            Ok(decode_var(&sectors[0..used],*len as usize))
        }
    }
}

/// Keep the good records, or return the first error
pub fn collect(decoded: Vec<Result<Vec<u8>,Error>>) -> Result<Vec<Vec<u8>>,Error> {
    decoded.into_iter().collect()
}
