//! ### TI disk structures
//!
//! On-disk layouts of the Volume Information Block (sector 0) and the File Descriptor
//! Record, read and written with `binrw`.  Multi-byte fields are big endian except the
//! level-3 record count, which is little endian.

use binrw::{BinRead,BinWrite};
use chrono::{Datelike,Timelike,NaiveDate,NaiveDateTime};
use bit_vec::BitVec;
use std::io::Cursor;
use crate::fs::{FileFormat,ContentKind,RecordFamily};
use crate::DYNERR;

pub const VIB_SECTOR: usize = 0;
pub const FDI_SECTOR: usize = 1;
/// first sector searched for FDRs
pub const FIRST_FDR_SECTOR: usize = 2;
/// first sector searched for file data
pub const FIRST_DATA_SECTOR: usize = 34;
pub const MAX_FILES: usize = 127;
pub const MAX_CLUSTERS: usize = 76;
/// sectors the bitmap can describe
pub const MAX_SECTORS: usize = 1600;
pub const BITMAP_OFFSET: usize = 0x38;
pub const BITMAP_LEN: usize = 200;
/// offset and length of the timestamps within an FDR
pub const TIMESTAMP_OFFSET: usize = 0x14;
pub const TIMESTAMP_LEN: usize = 8;

pub const FLAG_PROGRAM: u8 = 0x01;
pub const FLAG_INTERNAL: u8 = 0x02;
/// flat display payload whose last line had no newline
pub const FLAG_UNTERMINATED: u8 = 0x04;
pub const FLAG_PROTECTED: u8 = 0x08;
pub const FLAG_VARIABLE: u8 = 0x80;

/// Volume Information Block
#[derive(BinRead,BinWrite,Clone,Debug)]
#[brw(big)]
pub struct Vib {
    pub name: [u8;10],
    pub total_sectors: u16,
    pub sectors_per_track: u8,
    pub dsk: [u8;3],
    pub protection: u8,
    pub tracks_per_side: u8,
    pub sides: u8,
    pub density: u8,
    pub reserved: [u8;36],
    pub bitmap: [u8;BITMAP_LEN]
}

/// File Descriptor Record
#[derive(BinRead,BinWrite,Clone,Debug)]
#[brw(big)]
pub struct Fdr {
    pub name: [u8;10],
    pub ext_record_len: u16,
    pub flags: u8,
    pub records_per_sector: u8,
    pub data_sectors: u16,
    pub eof: u8,
    pub record_len: u8,
    #[brw(little)]
    pub level3: u16,
    pub created: [u8;4],
    pub updated: [u8;4],
    pub clusters: [u8;3*MAX_CLUSTERS]
}

pub fn from_sector<T: for<'a> BinRead<Args<'a>=()> + binrw::meta::ReadEndian>(buf: &[u8]) -> Result<T,DYNERR> {
    Ok(T::read(&mut Cursor::new(buf))?)
}

pub fn to_sector<T: for<'a> BinWrite<Args<'a>=()> + binrw::meta::WriteEndian>(obj: &T) -> Result<Vec<u8>,DYNERR> {
    let mut curs = Cursor::new(Vec::new());
    obj.write(&mut curs)?;
    Ok(curs.into_inner())
}

/// Space padded name field; returns None if the name is empty, too long, or holds a bad character
pub fn pack_name(name: &str) -> Option<[u8;10]> {
    let bytes = name.as_bytes();
    if bytes.len()==0 || bytes.len() > 10 {
        return None;
    }
    if bytes.iter().any(|b| *b<=b' ' || *b>=0x7f || *b==b'.') {
        return None;
    }
    let mut ans = [b' ';10];
    ans[0..bytes.len()].copy_from_slice(bytes);
    Some(ans)
}

pub fn unpack_name(field: &[u8]) -> String {
    String::from_utf8_lossy(field).trim_end().to_string()
}

impl Vib {
    pub fn new(name: [u8;10],total_sectors: u16,sides: u8,density: u8) -> Self {
        let sectors_per_track = match density { 1 => 9, 2 => 18, _ => 36 };
        Self {
            name,
            total_sectors,
            sectors_per_track,
            dsk: *b"DSK",
            protection: b' ',
            tracks_per_side: 40,
            sides,
            density,
            reserved: [0;36],
            bitmap: [0;BITMAP_LEN]
        }
    }
    pub fn is_formatted(&self) -> bool {
        &self.dsk==b"DSK"
    }
}

/// Allocation bitmap, bit set means the sector is in use.
/// On disk, sector `s` is bit `s%8` (LSB first) of byte `s/8`.
pub struct Bitmap {
    bits: BitVec
}

impl Bitmap {
    pub fn from_bytes(buf: &[u8]) -> Self {
        let mut bits = BitVec::new();
        for byte in buf {
            for b in 0..8 {
                bits.push((byte >> b) & 1 == 1);
            }
        }
        Self { bits }
    }
    /// Blank map for a volume of `total` sectors, sectors past the end are marked used
    pub fn new(total: usize) -> Self {
        Self {
            bits: BitVec::from_fn(BITMAP_LEN*8,|s| s >= total)
        }
    }
    pub fn to_bytes(&self) -> [u8;BITMAP_LEN] {
        let mut ans = [0;BITMAP_LEN];
        for (s,bit) in self.bits.iter().enumerate().take(BITMAP_LEN*8) {
            if bit {
                ans[s/8] |= 1 << (s%8);
            }
        }
        ans
    }
    pub fn is_used(&self,sec: usize) -> bool {
        self.bits.get(sec).unwrap_or(true)
    }
    pub fn set(&mut self,sec: usize,used: bool) {
        if sec < self.bits.len() {
            self.bits.set(sec,used);
        }
    }
    /// First free sector at or above `beg` and below `end`
    pub fn first_free(&self,beg: usize,end: usize) -> Option<usize> {
        (beg..end).find(|s| !self.is_used(*s))
    }
    pub fn count_free(&self,end: usize) -> usize {
        (0..end).filter(|s| !self.is_used(*s)).count()
    }
}

/// Run of physically adjacent sectors, `last` is the file-relative index of its final sector
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct Cluster {
    pub start: usize,
    pub last: usize
}

pub fn pack_clusters(list: &[Cluster]) -> [u8;3*MAX_CLUSTERS] {
    let mut ans = [0;3*MAX_CLUSTERS];
    for (i,c) in list.iter().take(MAX_CLUSTERS).enumerate() {
        ans[3*i] = (c.start & 0xff) as u8;
        ans[3*i+1] = ((c.start >> 8) & 0x0f) as u8 | ((c.last & 0x0f) << 4) as u8;
        ans[3*i+2] = ((c.last >> 4) & 0xff) as u8;
    }
    ans
}

/// Clusters up to the first empty slot
pub fn unpack_clusters(buf: &[u8]) -> Vec<Cluster> {
    let mut ans = Vec::new();
    for i in 0..buf.len()/3 {
        let (b0,b1,b2) = (buf[3*i] as usize,buf[3*i+1] as usize,buf[3*i+2] as usize);
        let start = b0 | (b1 & 0x0f) << 8;
        if start==0 {
            break;
        }
        ans.push(Cluster { start, last: (b1 >> 4) | b2 << 4 });
    }
    ans
}

/// Expand clusters into the list of physical data sectors in file order
pub fn cluster_sectors(list: &[Cluster]) -> Vec<usize> {
    let mut ans = Vec::new();
    let mut next_rel = 0;
    for c in list {
        for s in 0..(c.last + 1).saturating_sub(next_rel) {
            ans.push(c.start + s);
        }
        next_rel = c.last + 1;
    }
    ans
}

/// Merge a list of physical sectors into clusters
pub fn make_clusters(secs: &[usize]) -> Vec<Cluster> {
    let mut ans: Vec<Cluster> = Vec::new();
    for (rel,sec) in secs.iter().enumerate() {
        match ans.last_mut() {
            Some(c) if secs[rel-1] + 1 == *sec => c.last = rel,
            _ => ans.push(Cluster { start: *sec, last: rel })
        }
    }
    ans
}

/// Pack a timestamp as a time word (h:5 m:6 s/2:5) followed by a date word (yy:7 mm:4 dd:5)
pub fn pack_time(t: &NaiveDateTime) -> [u8;4] {
    let time = (t.hour() << 11 | t.minute() << 5 | t.second() / 2) as u16;
    let date = (((t.year() % 100) as u32) << 9 | t.month() << 5 | t.day()) as u16;
    let [t0,t1] = time.to_be_bytes();
    let [d0,d1] = date.to_be_bytes();
    [t0,t1,d0,d1]
}

pub fn unpack_time(buf: &[u8;4]) -> Option<NaiveDateTime> {
    let time = u16::from_be_bytes([buf[0],buf[1]]) as u32;
    let date = u16::from_be_bytes([buf[2],buf[3]]) as u32;
    if time==0 && date==0 {
        return None;
    }
    let yy = (date >> 9) as i32;
    let year = match yy { y if y < 70 => 2000 + y, y => 1900 + y };
    NaiveDate::from_ymd_opt(year,(date >> 5) & 0x0f,date & 0x1f)?.and_hms_opt(time >> 11,(time >> 5) & 0x3f,2*(time & 0x1f))
}

impl Fdr {
    pub fn new(name: [u8;10],fmt: &FileFormat) -> Self {
        let flags = match fmt {
            FileFormat::Program => FLAG_PROGRAM,
            FileFormat::Records { kind, family, .. } => {
                let k = match kind { ContentKind::Internal => FLAG_INTERNAL, ContentKind::Display => 0 };
                let f = match family { RecordFamily::Variable => FLAG_VARIABLE, RecordFamily::Fixed => 0 };
                k | f
            }
        };
        Self {
            name,
            ext_record_len: 0,
            flags,
            records_per_sector: fmt.records_per_sector() as u8,
            data_sectors: 0,
            eof: 0,
            record_len: fmt.record_len() as u8,
            level3: 0,
            created: [0;4],
            updated: [0;4],
            clusters: [0;3*MAX_CLUSTERS]
        }
    }
    /// Format from the status flags and record length, None if inconsistent
    pub fn format(&self) -> Option<FileFormat> {
        if self.flags & FLAG_PROGRAM > 0 {
            return Some(FileFormat::Program);
        }
        let kind = match self.flags & FLAG_INTERNAL { 0 => ContentKind::Display, _ => ContentKind::Internal };
        let family = match self.flags & FLAG_VARIABLE { 0 => RecordFamily::Fixed, _ => RecordFamily::Variable };
        FileFormat::records(kind,family,self.record_len as usize).ok()
    }
    pub fn is_protected(&self) -> bool {
        self.flags & FLAG_PROTECTED > 0
    }
    pub fn name(&self) -> String {
        unpack_name(&self.name)
    }
}
