//! # Disk Image Module
//!
//! TI disk images are plain sequences of 256 byte sectors, numbered from 0, with no
//! track encoding, so a `SectorImage` is all the file system needs for storage.
//! Total sectors, sides, and density are properties of the image (stored in its VIB),
//! this module never recomputes them.
//!
//! The `multi` submodule handles containers that hold many volumes back to back,
//! as used by the multi-volume manager.

pub mod multi;

pub use multi::MultiVolume;

use log::{trace,error};
use crate::fs::SECTOR_SIZE;

/// Enumerates disk image errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("sector {0} is out of range")]
    SectorAccess(usize),
    #[error("image of {0} bytes is not a whole number of sectors")]
    ImageSizeMismatch(usize),
    #[error("sector buffer of {0} bytes, expected 256")]
    BufferSize(usize),
    #[error("volume {0} is out of range")]
    VolumeIndex(usize),
    #[error("volume of {0} sectors does not fit the container slot")]
    VolumeSize(usize)
}

/// Sector addressed storage for one volume
#[derive(Clone,PartialEq,Debug)]
pub struct SectorImage {
    data: Vec<u8>
}

impl SectorImage {
    /// Zeroed image with `sectors` sectors
    pub fn blank(sectors: usize) -> Self {
        Self {
            data: vec![0;sectors*SECTOR_SIZE]
        }
    }
    /// Adopt raw image bytes, these must be a whole number of sectors
    pub fn from_bytes(data: Vec<u8>) -> Result<Self,Error> {
        if data.len()==0 || data.len()%SECTOR_SIZE!=0 {
            error!("image length {} is not a multiple of {}",data.len(),SECTOR_SIZE);
            return Err(Error::ImageSizeMismatch(data.len()));
        }
        Ok(Self { data })
    }
    pub fn sector_count(&self) -> usize {
        self.data.len()/SECTOR_SIZE
    }
    pub fn read_sector(&self,sec: usize) -> Result<Vec<u8>,Error> {
        if sec >= self.sector_count() {
            error!("read of sector {} past end of image",sec);
            return Err(Error::SectorAccess(sec));
        }
        trace!("read sector {}",sec);
        Ok(self.data[sec*SECTOR_SIZE..(sec+1)*SECTOR_SIZE].to_vec())
    }
    /// Write a whole sector, `dat` must be exactly one sector long
    pub fn write_sector(&mut self,sec: usize,dat: &[u8]) -> Result<(),Error> {
        if sec >= self.sector_count() {
            error!("write of sector {} past end of image",sec);
            return Err(Error::SectorAccess(sec));
        }
        if dat.len()!=SECTOR_SIZE {
            return Err(Error::BufferSize(dat.len()));
        }
        trace!("write sector {}",sec);
        self.data[sec*SECTOR_SIZE..(sec+1)*SECTOR_SIZE].copy_from_slice(dat);
        Ok(())
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
