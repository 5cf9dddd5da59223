//! ## TI disk file system
//!
//! The disk image builder.  A `Disk` owns a `SectorImage` and keeps the Volume Information
//! Block, File Descriptor Index, and File Descriptor Records consistent as files are added,
//! extracted, renamed, protected, and deleted.  Record content goes through `fs::recs`.
//!
//! Flat payloads map onto records as follows:
//! * `PROGRAM`: the bytes themselves
//! * `INT/FIX n` and `INT/VAR n`: consecutive n-byte slices, the last slice may be short.
//!   FIX keeps the length of a short last slice in the FDR EOF byte, which FIX files otherwise leave at 0.
//! * `DIS/*`: one record per `\n` terminated line, extraction joins with `\n`.
//!   A missing final newline is remembered by a status flag.  DIS/FIX lines may not end in a space,
//!   since spaces are the padding.
//!
//! Sector allocation is first fit, FDRs from sector 2 and data from sector 34, and adjacent
//! data sectors are merged into one cluster.

pub mod types;
pub mod directory;

use std::fmt;
use chrono::NaiveDateTime;
use log::{debug,info,warn,error};
use types::*;
use directory::CatalogRow;
use crate::img::SectorImage;
use crate::fs::{FileFormat,ContentKind,RecordFamily,SECTOR_SIZE};
use crate::fs::recs;
use crate::compare::MaskSpec;
use crate::{STDRESULT,DYNERR};

/// Enumerates TI file system errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("disk full")]
    DiskFull,
    #[error("file `{0}` already exists")]
    NameConflict(String),
    #[error("file `{0}` not found")]
    FileNotFound(String),
    #[error("bad file name `{0}`")]
    BadName(String),
    #[error("directory full")]
    DirectoryFull,
    #[error("file `{0}` is protected")]
    FileProtected(String),
    #[error("disk structure damaged: {0}")]
    Damaged(String),
    #[error("volume geometry not supported")]
    Geometry,
    #[error("line {0} ends in a space, which fixed display records treat as padding")]
    PaddedLine(usize)
}

/// Inconsistency between the allocation bitmap and the sectors the catalog owns
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Problem {
    /// sector owned by more than one structure
    DoubleAllocation(usize),
    /// sector owned but marked free
    Unallocated(usize),
    /// sector marked used but owned by nothing
    Leaked(usize)
}

impl fmt::Display for Problem {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleAllocation(s) => write!(f,"sector {} is allocated twice",s),
            Self::Unallocated(s) => write!(f,"sector {} is in use but marked free",s),
            Self::Leaked(s) => write!(f,"sector {} is marked used but not owned",s)
        }
    }
}

/// Split a flat payload into records
pub fn split_payload(dat: &[u8],fmt: &FileFormat) -> Result<Vec<Vec<u8>>,Error> {
    match fmt {
        FileFormat::Program => Ok(vec![dat.to_vec()]),
        FileFormat::Records { kind: ContentKind::Internal, len, .. } => {
            Ok(dat.chunks(*len as usize).map(|c| c.to_vec()).collect())
        },
        FileFormat::Records { kind: ContentKind::Display, family, .. } => {
            let mut lines: Vec<Vec<u8>> = dat.split(|b| *b==b'\n').map(|l| l.to_vec()).collect();
            if dat.len()==0 || dat[dat.len()-1]==b'\n' {
                lines.pop();
            }
            if *family==RecordFamily::Fixed {
                if let Some(i) = lines.iter().position(|l| l.last()==Some(&b' ')) {
                    error!("line {} would lose its trailing spaces",i+1);
                    return Err(Error::PaddedLine(i+1));
                }
            }
            Ok(lines)
        }
    }
}

/// Join records into a flat payload, inverse of `split_payload`
pub fn join_records(records: &[Vec<u8>],fmt: &FileFormat) -> Vec<u8> {
    match fmt {
        FileFormat::Records { kind: ContentKind::Display, .. } => {
            let mut ans = Vec::new();
            for rec in records {
                ans.extend_from_slice(rec);
                ans.push(b'\n');
            }
            ans
        },
        _ => records.concat()
    }
}

/// The TI disk file system, with its sector image as storage
pub struct Disk {
    img: SectorImage,
    vib: Vib,
    clock: Option<NaiveDateTime>
}

impl Disk {
    /// Format a blank volume of `sectors` sectors
    pub fn init(name: &str,sectors: usize,sides: u8,density: u8) -> Result<Self,DYNERR> {
        let packed = match pack_name(name) {
            Some(n) => n,
            None => return Err(Box::new(Error::BadName(name.to_string())))
        };
        if sectors <= FIRST_FDR_SECTOR || sectors > MAX_SECTORS || sides < 1 || sides > 2 || density < 1 {
            error!("cannot format {} sectors, {} sides, density {}",sectors,sides,density);
            return Err(Box::new(Error::Geometry));
        }
        let mut vib = Vib::new(packed,sectors as u16,sides,density);
        let mut map = Bitmap::new(sectors);
        map.set(VIB_SECTOR,true);
        map.set(FDI_SECTOR,true);
        vib.bitmap = map.to_bytes();
        let mut ans = Self {
            img: SectorImage::blank(sectors),
            vib,
            clock: None
        };
        ans.write_vib()?;
        info!("formatted volume {} with {} sectors",name,sectors);
        Ok(ans)
    }
    /// Adopt a copy of a formatted image, such as a blank template
    pub fn from_template(bytes: &[u8]) -> Result<Self,DYNERR> {
        Self::from_img(SectorImage::from_bytes(bytes.to_vec())?)
    }
    pub fn from_img(img: SectorImage) -> Result<Self,DYNERR> {
        let vib: Vib = from_sector(&img.read_sector(VIB_SECTOR)?)?;
        if !vib.is_formatted() {
            error!("VIB signature missing");
            return Err(Box::new(crate::fs::Error::FileImageFormat));
        }
        let total = vib.total_sectors as usize;
        if total <= FIRST_FDR_SECTOR || total > img.sector_count() || total > MAX_SECTORS {
            error!("VIB claims {} sectors, image has {}",total,img.sector_count());
            return Err(Box::new(crate::fs::Error::FileImageFormat));
        }
        Ok(Self {
            img,
            vib,
            clock: None
        })
    }
    /// Fix the time used for FDR timestamps, otherwise the local time is used
    pub fn set_clock(&mut self,t: Option<NaiveDateTime>) {
        self.clock = t;
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        self.img.to_bytes()
    }
    pub fn get_img(&self) -> &SectorImage {
        &self.img
    }
    pub fn volume_name(&self) -> String {
        unpack_name(&self.vib.name)
    }
    pub fn total_sectors(&self) -> usize {
        self.vib.total_sectors as usize
    }
    pub fn sides(&self) -> u8 {
        self.vib.sides
    }
    pub fn density(&self) -> u8 {
        self.vib.density
    }
    pub fn free_sectors(&self) -> usize {
        Bitmap::from_bytes(&self.vib.bitmap).count_free(self.total_sectors())
    }
    pub fn used_sectors(&self) -> usize {
        self.total_sectors() - self.free_sectors()
    }
    fn now(&self) -> NaiveDateTime {
        match self.clock {
            Some(t) => t,
            None => chrono::Local::now().naive_local()
        }
    }
    fn write_vib(&mut self) -> STDRESULT {
        let buf = to_sector(&self.vib)?;
        log::trace!("bitmap {}",hex::encode(&self.vib.bitmap[0..usize::min(BITMAP_LEN,(self.total_sectors()+7)/8)]));
        self.img.write_sector(VIB_SECTOR,&buf)?;
        Ok(())
    }
    fn read_fdr(&self,sec: usize) -> Result<Fdr,DYNERR> {
        from_sector(&self.img.read_sector(sec)?)
    }
    fn write_fdr(&mut self,sec: usize,fdr: &Fdr) -> STDRESULT {
        let buf = to_sector(fdr)?;
        self.img.write_sector(sec,&buf)?;
        Ok(())
    }
    /// FDR sectors and their records, in FDI order
    fn entries(&self) -> Result<Vec<(usize,Fdr)>,DYNERR> {
        let mut ans = Vec::new();
        for sec in directory::parse_fdi(&self.img.read_sector(FDI_SECTOR)?) {
            if sec >= self.total_sectors() {
                error!("FDI points to sector {} past end of volume",sec);
                return Err(Box::new(Error::Damaged(format!("FDI pointer {}",sec))));
            }
            ans.push((sec,self.read_fdr(sec)?));
        }
        Ok(ans)
    }
    fn find(&self,name: &str) -> Result<(usize,Fdr),DYNERR> {
        for (sec,fdr) in self.entries()? {
            if fdr.name()==name {
                return Ok((sec,fdr));
            }
        }
        Err(Box::new(Error::FileNotFound(name.to_string())))
    }
    fn write_fdi(&mut self,entries: &[(usize,Fdr)]) -> STDRESULT {
        let mut pairs: Vec<(String,usize)> = entries.iter().map(|(s,f)| (f.name(),*s)).collect();
        let buf = directory::build_fdi(&mut pairs);
        self.img.write_sector(FDI_SECTOR,&buf)?;
        Ok(())
    }
    /// Data sectors of a file in file order
    fn data_sectors(&self,fdr: &Fdr) -> Vec<usize> {
        let mut ans = cluster_sectors(&unpack_clusters(&fdr.clusters));
        ans.truncate(fdr.data_sectors as usize);
        ans
    }
    fn read_data(&self,fdr: &Fdr) -> Result<Vec<Vec<u8>>,DYNERR> {
        let mut ans = Vec::new();
        for sec in self.data_sectors(fdr) {
            ans.push(self.img.read_sector(sec)?);
        }
        Ok(ans)
    }
    /// Write a new file from prepared sectors and FDR counts.
    /// Nothing is changed unless the whole file fits.
    fn write_file(&mut self,name: &str,fmt: &FileFormat,sectors: &[Vec<u8>],eof: u8,level3: u16,extra_flags: u8) -> STDRESULT {
        let packed = match pack_name(name) {
            Some(n) => n,
            None => return Err(Box::new(Error::BadName(name.to_string())))
        };
        let mut entries = self.entries()?;
        if entries.iter().any(|(_s,f)| f.name()==name) {
            return Err(Box::new(Error::NameConflict(name.to_string())));
        }
        if entries.len() >= MAX_FILES {
            return Err(Box::new(Error::DirectoryFull));
        }
        let total = self.total_sectors();
        let mut map = Bitmap::from_bytes(&self.vib.bitmap);
        let fdr_sec = match map.first_free(FIRST_FDR_SECTOR,total) {
            Some(s) => s,
            None => return Err(Box::new(Error::DiskFull))
        };
        map.set(fdr_sec,true);
        let mut data_secs = Vec::new();
        for _i in 0..sectors.len() {
            let next = match map.first_free(FIRST_DATA_SECTOR,total) {
                Some(s) => Some(s),
                None => map.first_free(FIRST_FDR_SECTOR,usize::min(FIRST_DATA_SECTOR,total))
            };
            match next {
                Some(s) => {
                    map.set(s,true);
                    data_secs.push(s);
                },
                None => {
                    error!("need {} sectors for `{}`, only {} free",sectors.len()+1,name,self.free_sectors());
                    return Err(Box::new(Error::DiskFull));
                }
            }
        }
        let data_count = match u16::try_from(sectors.len()) {
            Ok(n) => n,
            Err(_) => return Err(Box::new(Error::DiskFull))
        };
        let clusters = make_clusters(&data_secs);
        if clusters.len() > MAX_CLUSTERS {
            error!("`{}` would need {} clusters",name,clusters.len());
            return Err(Box::new(Error::DiskFull));
        }
        let stamp = pack_time(&self.now());
        let mut fdr = Fdr::new(packed,fmt);
        fdr.flags |= extra_flags;
        fdr.data_sectors = data_count;
        fdr.eof = eof;
        fdr.level3 = level3;
        fdr.created = stamp;
        fdr.updated = stamp;
        fdr.clusters = pack_clusters(&clusters);
        for (sec,dat) in data_secs.iter().zip(sectors) {
            let mut buf = dat.clone();
            buf.resize(SECTOR_SIZE,0);
            self.img.write_sector(*sec,&buf)?;
        }
        self.write_fdr(fdr_sec,&fdr)?;
        entries.push((fdr_sec,fdr));
        self.write_fdi(&entries)?;
        self.vib.bitmap = map.to_bytes();
        self.write_vib()?;
        debug!("`{}` FDR at {}, data in {} clusters",name,fdr_sec,clusters.len());
        Ok(())
    }
    /// Add a file from a flat payload, see the module notes for how records are formed
    pub fn add(&mut self,name: &str,dat: &[u8],fmt: &FileFormat) -> STDRESULT {
        match fmt {
            FileFormat::Program => {
                let sectors: Vec<Vec<u8>> = dat.chunks(SECTOR_SIZE).map(|c| c.to_vec()).collect();
                self.write_file(name,fmt,&sectors,(dat.len() % SECTOR_SIZE) as u8,0,0)?;
                info!("added program `{}` of {} bytes",name,dat.len());
                Ok(())
            },
            FileFormat::Records { kind, family, len } => {
                let records = split_payload(dat,fmt)?;
                let mut enc = recs::encode(&records,fmt)?;
                let mut extra_flags = 0;
                match (kind,family) {
                    (ContentKind::Internal,RecordFamily::Fixed) => enc.eof = (dat.len() % *len as usize) as u8,
                    (ContentKind::Display,_) if dat.last().is_some_and(|b| *b!=b'\n') => extra_flags = FLAG_UNTERMINATED,
                    _ => {}
                }
                self.write_file(name,fmt,&enc.sectors,enc.eof,enc.level3,extra_flags)?;
                info!("added `{}` as {} with {} records",name,fmt,records.len());
                Ok(())
            }
        }
    }
    /// Add a file from an explicit list of records
    pub fn add_records(&mut self,name: &str,records: &[Vec<u8>],fmt: &FileFormat) -> STDRESULT {
        let enc = recs::encode(records,fmt)?;
        self.write_file(name,fmt,&enc.sectors,enc.eof,enc.level3,0)?;
        info!("added `{}` as {} with {} records",name,fmt,records.len());
        Ok(())
    }
    /// Add a deliberately malformed file: raw sectors with caller chosen counts, bypassing the codec.
    /// The EOF offset is taken from the length of `raw`.
    pub fn add_special(&mut self,name: &str,raw: &[u8],fmt: &FileFormat,level3: u16) -> STDRESULT {
        let sectors: Vec<Vec<u8>> = raw.chunks(SECTOR_SIZE).map(|c| c.to_vec()).collect();
        warn!("writing special file `{}` with level-3 count {}",name,level3);
        self.write_file(name,fmt,&sectors,(raw.len() % SECTOR_SIZE) as u8,level3,0)
    }
    /// Extract a file as a flat payload, fails if any record is malformed
    pub fn extract(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        let (_sec,fdr) = self.find(name)?;
        let fmt = match fdr.format() {
            Some(f) => f,
            None => return Err(Box::new(Error::Damaged(format!("format of `{}`",name))))
        };
        if fmt.is_program() {
            let mut ans = self.read_data(&fdr)?.concat();
            let n = fdr.data_sectors as usize;
            let size = match (n,fdr.eof) {
                (0,_) => 0,
                (n,0) => n*SECTOR_SIZE,
                (n,eof) => (n-1)*SECTOR_SIZE + eof as usize
            };
            ans.truncate(size);
            return Ok(ans);
        }
        let records = recs::collect(self.extract_records(name)?)?;
        let mut ans = join_records(&records,&fmt);
        match fmt {
            FileFormat::Records { kind: ContentKind::Internal, family: RecordFamily::Fixed, len } if fdr.eof > 0 && records.len() > 0 => {
                match (len as usize).checked_sub(fdr.eof as usize) {
                    Some(unused) => ans.truncate(ans.len() - unused),
                    None => warn!("EOF byte {} of `{}` exceeds the record length",fdr.eof,name)
                }
            },
            FileFormat::Records { kind: ContentKind::Display, .. } if fdr.flags & FLAG_UNTERMINATED > 0 => {
                if ans.last()==Some(&b'\n') {
                    ans.pop();
                }
            },
            _ => {}
        }
        Ok(ans)
    }
    /// Decode each record of a file, a malformed record does not prevent decoding the others
    pub fn extract_records(&self,name: &str) -> Result<Vec<Result<Vec<u8>,recs::Error>>,DYNERR> {
        let (_sec,fdr) = self.find(name)?;
        let fmt = match fdr.format() {
            Some(f) => f,
            None => return Err(Box::new(Error::Damaged(format!("format of `{}`",name))))
        };
        let sectors = self.read_data(&fdr)?;
        Ok(recs::decode(&sectors,&fmt,fdr.level3 as usize)?)
    }
    pub fn format_of(&self,name: &str) -> Result<FileFormat,DYNERR> {
        let (_sec,fdr) = self.find(name)?;
        match fdr.format() {
            Some(f) => Ok(f),
            None => Err(Box::new(Error::Damaged(format!("format of `{}`",name))))
        }
    }
    pub fn delete(&mut self,name: &str) -> STDRESULT {
        let (fdr_sec,fdr) = self.find(name)?;
        if fdr.is_protected() {
            return Err(Box::new(Error::FileProtected(name.to_string())));
        }
        let mut map = Bitmap::from_bytes(&self.vib.bitmap);
        map.set(fdr_sec,false);
        for sec in self.data_sectors(&fdr) {
            map.set(sec,false);
        }
        let entries: Vec<(usize,Fdr)> = self.entries()?.into_iter().filter(|(s,_f)| *s!=fdr_sec).collect();
        self.write_fdi(&entries)?;
        self.vib.bitmap = map.to_bytes();
        self.write_vib()?;
        info!("deleted `{}`",name);
        Ok(())
    }
    pub fn rename(&mut self,old: &str,new: &str) -> STDRESULT {
        let packed = match pack_name(new) {
            Some(n) => n,
            None => return Err(Box::new(Error::BadName(new.to_string())))
        };
        let (fdr_sec,mut fdr) = self.find(old)?;
        if old!=new && self.find(new).is_ok() {
            return Err(Box::new(Error::NameConflict(new.to_string())));
        }
        fdr.name = packed;
        self.write_fdr(fdr_sec,&fdr)?;
        // FDI is sorted by name
        let entries = self.entries()?;
        self.write_fdi(&entries)?;
        Ok(())
    }
    pub fn protect(&mut self,name: &str,on: bool) -> STDRESULT {
        let (fdr_sec,mut fdr) = self.find(name)?;
        match on {
            true => fdr.flags |= FLAG_PROTECTED,
            false => fdr.flags &= !FLAG_PROTECTED
        }
        self.write_fdr(fdr_sec,&fdr)
    }
    /// Catalog rows in FDI order
    pub fn list(&self) -> Result<Vec<CatalogRow>,DYNERR> {
        let mut ans = Vec::new();
        for (_sec,fdr) in self.entries()? {
            let fmt = fdr.format();
            let records = match fmt {
                Some(FileFormat::Program) | None => 0,
                Some(FileFormat::Records { family: RecordFamily::Fixed, .. }) => fdr.level3 as usize,
                Some(f) => recs::decode(&self.read_data(&fdr)?,&f,fdr.level3 as usize)?.len()
            };
            ans.push(CatalogRow {
                name: fdr.name(),
                sectors: fdr.data_sectors as usize + 1,
                format: match fmt { Some(f) => f.to_string(), None => "?".to_string() },
                bytes: fdr.data_sectors as usize * SECTOR_SIZE,
                records,
                protected: fdr.is_protected(),
                updated: unpack_time(&fdr.updated)
            });
        }
        Ok(ans)
    }
    pub fn catalog_text(&self) -> Result<String,DYNERR> {
        Ok(directory::render(&self.volume_name(),&self.list()?,self.used_sectors(),self.free_sectors()))
    }
    /// Byte ranges of the image that legitimately differ between two builds,
    /// namely the timestamps of every FDR.
    pub fn standardize(&self) -> Result<MaskSpec,DYNERR> {
        let mut ans = MaskSpec::new();
        for (sec,_fdr) in self.entries()? {
            ans = ans.with(sec*SECTOR_SIZE + TIMESTAMP_OFFSET,TIMESTAMP_LEN);
        }
        Ok(ans)
    }
    /// Compare the bitmap with the sectors owned by the VIB, FDI, FDRs, and file data
    pub fn check(&self) -> Result<Vec<Problem>,DYNERR> {
        let total = self.total_sectors();
        let mut owners = vec![0;total];
        owners[VIB_SECTOR] += 1;
        owners[FDI_SECTOR] += 1;
        for (sec,fdr) in self.entries()? {
            owners[sec] += 1;
            for d in self.data_sectors(&fdr) {
                match owners.get_mut(d) {
                    Some(count) => *count += 1,
                    None => return Err(Box::new(Error::Damaged(format!("`{}` points past end of volume",fdr.name()))))
                }
            }
        }
        let map = Bitmap::from_bytes(&self.vib.bitmap);
        let mut ans = Vec::new();
        for s in 0..total {
            match (owners[s],map.is_used(s)) {
                (n,_) if n > 1 => ans.push(Problem::DoubleAllocation(s)),
                (1,false) => ans.push(Problem::Unallocated(s)),
                (0,true) => ans.push(Problem::Leaked(s)),
                _ => {}
            }
        }
        for p in &ans {
            warn!("{}",p);
        }
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use chrono::NaiveDate;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020,1,2).expect("bad date").and_hms_opt(3,4,6).expect("bad time")
    }

    fn blank() -> Disk {
        let mut disk = Disk::init("BLANK",360,1,1).expect("format failed");
        disk.set_clock(Some(fixed_clock()));
        disk
    }

    #[test]
    fn format_blank() {
        let disk = blank();
        assert_eq!(disk.free_sectors(),358);
        assert_eq!(disk.list().expect("list failed").len(),0);
        assert_eq!(disk.check().expect("check failed"),vec![]);
        let copy = Disk::from_template(&disk.to_bytes()).expect("bad template");
        assert_eq!(copy.volume_name(),"BLANK");
        assert!(Disk::from_template(&vec![0;256*360]).is_err());
    }

    #[test]
    fn program_round_trip() {
        let mut disk = blank();
        for (name,len) in [("P0",0),("P1",1),("P256",256),("P700",700)] {
            let dat: Vec<u8> = (0..len).map(|i| (i*7 % 251) as u8).collect();
            disk.add(name,&dat,&FileFormat::Program).expect("add failed");
            assert_eq!(disk.extract(name).expect("extract failed"),dat);
        }
        assert_eq!(disk.check().expect("check failed"),vec![]);
    }

    #[test]
    fn name_rules() {
        let mut disk = blank();
        disk.add("A",b"X",&FileFormat::Program).expect("add failed");
        let e = disk.add("A",b"Y",&FileFormat::Program).expect_err("conflict missed");
        assert!(matches!(e.downcast_ref::<Error>(),Some(Error::NameConflict(_))));
        assert!(disk.add("ELEVENCHARS",b"X",&FileFormat::Program).is_err());
        assert!(disk.add("A.B",b"X",&FileFormat::Program).is_err());
        let e = disk.extract("MISSING").expect_err("missing file found");
        assert!(matches!(e.downcast_ref::<Error>(),Some(Error::FileNotFound(_))));
    }

    #[test]
    fn int_fix_128_catalog() {
        let mut disk = blank();
        let fmt = FileFormat::from_str("INT/FIX 128").expect("bad format");
        let dat: Vec<u8> = (0..128*7).map(|i| (i % 256) as u8).collect();
        disk.add("DATA",&dat,&fmt).expect("add failed");
        assert_eq!(disk.extract("DATA").expect("extract failed"),dat);
        let rows = disk.list().expect("list failed");
        // 7 records at 2 per sector is 4 data sectors, plus the FDR
        assert_eq!(rows[0].sectors,5);
        assert_eq!(rows[0].bytes,5*256-256);
        assert_eq!(rows[0].records,7);
        let txt = disk.catalog_text().expect("catalog failed");
        assert!(txt.contains("DATA          5  INT/FIX 128     1024 B     7 recs  2020-01-02 03:04:06"));
        assert!(txt.ends_with("    7 used   353 free\n"));
    }

    #[test]
    fn display_records() {
        let mut disk = blank();
        let fmt = FileFormat::from_str("DIS/VAR 80").expect("bad format");
        let txt = b"       AORG >A000\nSTART  LI   R0,1\n\n       END\n";
        disk.add("SRC",txt,&fmt).expect("add failed");
        assert_eq!(disk.extract("SRC").expect("extract failed"),txt.to_vec());
        assert_eq!(disk.list().expect("list failed")[0].records,4);
        let long = [vec![b'X';81],vec![b'\n']].concat();
        assert!(disk.add("LONG",&long,&fmt).is_err());
        assert_eq!(disk.list().expect("list failed").len(),1);
    }

    #[test]
    fn flat_payload_exact() {
        let mut disk = blank();
        let int_fix = FileFormat::from_str("INT/FIX 128").expect("bad format");
        let short: Vec<u8> = (1..=100).collect();
        disk.add("SHORT",&short,&int_fix).expect("add failed");
        assert_eq!(disk.extract("SHORT").expect("extract failed"),short);
        let uneven: Vec<u8> = (0..300).map(|i| (i % 256) as u8).collect();
        disk.add("UNEVEN",&uneven,&int_fix).expect("add failed");
        assert_eq!(disk.extract("UNEVEN").expect("extract failed"),uneven);
        // the record view still shows the zero padded slot
        let recs = recs::collect(disk.extract_records("UNEVEN").expect("extract failed")).expect("bad record");
        assert_eq!(recs[2].len(),128);
        for (name,fmt_str) in [("OPENVAR","DIS/VAR 80"),("OPENFIX","DIS/FIX 80")] {
            let fmt = FileFormat::from_str(fmt_str).expect("bad format");
            disk.add(name,b"LINE ONE\nLINE TWO",&fmt).expect("add failed");
            assert_eq!(disk.extract(name).expect("extract failed"),b"LINE ONE\nLINE TWO".to_vec());
            assert_eq!(disk.list().expect("list failed").iter().find(|r| r.name==name).expect("no row").format,fmt.to_string());
        }
        let e = disk.add("PADDED",b"TRAILING \n",&FileFormat::from_str("DIS/FIX 80").expect("bad format")).expect_err("padding accepted");
        assert!(matches!(e.downcast_ref::<Error>(),Some(Error::PaddedLine(1))));
        assert_eq!(disk.check().expect("check failed"),vec![]);
    }

    #[test]
    fn record_count_overflow() {
        // 70000 one byte records fit in 275 sectors but not in the FDR count
        let mut disk = blank();
        let before = disk.to_bytes();
        let fmt = FileFormat::from_str("INT/FIX 1").expect("bad format");
        let e = disk.add("F",&vec![0;70000],&fmt).expect_err("count truncated");
        assert_eq!(e.downcast_ref::<recs::Error>(),Some(&recs::Error::Count(70000)));
        assert_eq!(disk.to_bytes(),before);
        disk.add("F",&vec![7;65535],&fmt).expect("add failed");
        assert_eq!(disk.extract("F").expect("extract failed").len(),65535);
        assert_eq!(disk.list().expect("list failed")[0].records,65535);
    }

    #[test]
    fn delete_rename_protect() {
        let mut disk = blank();
        disk.add("ONE",&vec![1;600],&FileFormat::Program).expect("add failed");
        disk.add("TWO",&vec![2;600],&FileFormat::Program).expect("add failed");
        let free = disk.free_sectors();
        disk.protect("ONE",true).expect("protect failed");
        assert!(disk.delete("ONE").is_err());
        disk.protect("ONE",false).expect("unprotect failed");
        disk.delete("ONE").expect("delete failed");
        assert_eq!(disk.free_sectors(),free+4);
        disk.rename("TWO","AAA").expect("rename failed");
        assert_eq!(disk.extract("AAA").expect("extract failed"),vec![2;600]);
        assert!(disk.extract("TWO").is_err());
        // the freed sectors are reused first
        disk.add("THREE",&vec![3;256],&FileFormat::Program).expect("add failed");
        assert_eq!(disk.check().expect("check failed"),vec![]);
        let names: Vec<String> = disk.list().expect("list failed").iter().map(|r| r.name.clone()).collect();
        assert_eq!(names,vec!["AAA","THREE"]);
    }

    #[test]
    fn disk_full_leaves_disk_unchanged() {
        let mut disk = Disk::init("SMALL",40,1,1).expect("format failed");
        let before = disk.to_bytes();
        assert!(disk.add("BIG",&vec![0;256*40],&FileFormat::Program).is_err());
        assert_eq!(disk.to_bytes(),before);
        disk.add("FITS",&vec![0;256*37],&FileFormat::Program).expect("add failed");
        assert_eq!(disk.free_sectors(),0);
    }

    #[test]
    fn special_file_spoils_records() {
        let mut disk = blank();
        let fmt = FileFormat::from_str("DIS/VAR 10").expect("bad format");
        let mut raw = vec![0;256];
        raw[0..9].copy_from_slice(&[2,b'O',b'K',20,0,0,0,0,0]);
        raw[24] = 0xff;
        disk.add_special("BAD",&raw,&fmt,1).expect("add failed");
        let recs = disk.extract_records("BAD").expect("extract failed");
        assert_eq!(recs[0].as_ref().expect("bad record"),b"OK");
        assert!(recs[1].is_err());
        assert!(disk.extract("BAD").is_err());
    }

    #[test]
    fn timestamps_are_masked() {
        let mut a = blank();
        let mut b = blank();
        b.set_clock(Some(fixed_clock() + chrono::Duration::days(400)));
        a.add("F",b"SAME",&FileFormat::Program).expect("add failed");
        b.add("F",b"SAME",&FileFormat::Program).expect("add failed");
        let mask = a.standardize().expect("standardize failed");
        assert_ne!(a.to_bytes(),b.to_bytes());
        assert!(crate::compare::compare_bytes(&a.to_bytes(),&b.to_bytes(),&mask,0).is_ok());
    }

    #[test]
    fn check_finds_leak() {
        let mut disk = blank();
        disk.add("F",&vec![0;300],&FileFormat::Program).expect("add failed");
        let mut map = Bitmap::from_bytes(&disk.vib.bitmap);
        map.set(100,true);
        map.set(34,false);
        disk.vib.bitmap = map.to_bytes();
        let problems = disk.check().expect("check failed");
        assert!(problems.contains(&Problem::Leaked(100)));
        assert!(problems.contains(&Problem::Unallocated(34)));
    }
}
