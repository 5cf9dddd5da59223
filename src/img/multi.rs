//! ### Multi-volume containers
//!
//! A container holds equally sized volume slots back to back, numbered from 1.
//! Flash card images store every byte followed by a zero pad byte ("interleaved"),
//! this is undone on load and redone on save, so volumes are always handled as plain
//! sector images.

use log::{debug,error};
use super::{SectorImage,Error};
use crate::fs::SECTOR_SIZE;
use crate::fs::ti99::Disk;
use crate::DYNERR;

/// sectors in one volume slot unless told otherwise
pub const DEFAULT_VOLUME_SECTORS: usize = 1600;

pub struct MultiVolume {
    /// logical bytes, i.e., with interleave removed
    data: Vec<u8>,
    sectors_per_volume: usize,
    interleaved: bool
}

impl MultiVolume {
    /// Container with `count` unformatted slots
    pub fn new(count: usize,sectors_per_volume: usize,interleaved: bool) -> Self {
        Self {
            data: vec![0;count*sectors_per_volume*SECTOR_SIZE],
            sectors_per_volume,
            interleaved
        }
    }
    /// Load a container, a partial trailing slot is dropped
    pub fn from_bytes(bytes: &[u8],sectors_per_volume: usize,interleaved: bool) -> Result<Self,Error> {
        let data: Vec<u8> = match interleaved {
            true => bytes.iter().step_by(2).copied().collect(),
            false => bytes.to_vec()
        };
        let slot = sectors_per_volume*SECTOR_SIZE;
        if slot==0 || data.len() < slot {
            error!("container of {} bytes holds no volume",bytes.len());
            return Err(Error::ImageSizeMismatch(bytes.len()));
        }
        let count = data.len()/slot;
        if data.len()%slot!=0 {
            debug!("ignoring {} bytes after the last volume",data.len()%slot);
        }
        Ok(Self {
            data: data[0..count*slot].to_vec(),
            sectors_per_volume,
            interleaved
        })
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.interleaved {
            true => self.data.iter().flat_map(|b| [*b,0]).collect(),
            false => self.data.clone()
        }
    }
    pub fn volume_count(&self) -> usize {
        self.data.len()/(self.sectors_per_volume*SECTOR_SIZE)
    }
    fn slot(&self,n: usize) -> Result<std::ops::Range<usize>,Error> {
        if n < 1 || n > self.volume_count() {
            error!("volume {} not in 1..={}",n,self.volume_count());
            return Err(Error::VolumeIndex(n));
        }
        let len = self.sectors_per_volume*SECTOR_SIZE;
        Ok((n-1)*len..n*len)
    }
    /// Raw sectors of slot `n`, formatted or not
    pub fn raw_volume(&self,n: usize) -> Result<SectorImage,Error> {
        let rng = self.slot(n)?;
        SectorImage::from_bytes(self.data[rng].to_vec())
    }
    /// File system of slot `n`, fails if the slot is unformatted
    pub fn volume(&self,n: usize) -> Result<Disk,DYNERR> {
        Disk::from_img(self.raw_volume(n)?)
    }
    /// Store a volume in slot `n`, a smaller volume is zero padded to the slot size
    pub fn set_volume(&mut self,n: usize,disk: &Disk) -> Result<(),Error> {
        let rng = self.slot(n)?;
        let bytes = disk.to_bytes();
        if bytes.len() > rng.len() {
            error!("volume of {} sectors, slot holds {}",bytes.len()/SECTOR_SIZE,self.sectors_per_volume);
            return Err(Error::VolumeSize(bytes.len()/SECTOR_SIZE));
        }
        let beg = rng.start;
        self.data[rng].fill(0);
        self.data[beg..beg+bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
    /// Slot numbers with the volume name, or None for slots that do not hold a file system
    pub fn list(&self) -> Vec<(usize,Option<String>)> {
        let mut ans = Vec::new();
        for n in 1..=self.volume_count() {
            let name = match self.volume(n) {
                Ok(disk) => Some(disk.volume_name()),
                Err(_) => None
            };
            ans.push((n,name));
        }
        ans
    }
}
