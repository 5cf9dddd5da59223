//! # Vector Generator
//!
//! Produces the binary payloads that are pushed through the tools.
//! There are two strategies:
//! * exhaustive: `ChunkPlan` splits the whole 16-bit word space into images that fit a fixed
//!   capacity, so that every instruction word is visited exactly once
//! * random: `random_block` draws a block of uniform bytes from a generator seeded with the run index
//!
//! Record fixtures for the disk tools, and the error markers embedded in source fixtures,
//! are in the `fixtures` submodule.

pub mod fixtures;

use log::{debug,error};
use rand::{RngCore,SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Size of the instruction word space
pub const WORD_SPACE: u32 = 0x10000;
/// TMS9900 `NOP` (`JMP $+2`), the default filler word
pub const NOP: u16 = 0x1000;
/// filler words following every chunk
pub const FILLER_WORDS: usize = 2;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("image capacity {0} cannot hold a chunk, need an even byte count of at least 6")]
    Capacity(usize),
    #[error("image of {0} bytes at the base address runs past the end of memory")]
    AddressRange(usize),
    #[error("record {0} violates the checksum law")]
    ChecksumViolation(usize)
}

/// Bytes destined for one tool invocation, plus the address where they load.
#[derive(Clone,PartialEq,Debug)]
pub struct MemoryImage {
    pub base: u16,
    pub data: Vec<u8>
}

impl MemoryImage {
    pub fn new(base: u16,data: Vec<u8>) -> Self {
        Self {
            base,
            data
        }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    /// instruction streams must be made of whole words
    pub fn is_word_aligned(&self) -> bool {
        self.data.len()%2==0 && self.base%2==0
    }
    /// big endian words, a trailing odd byte is ignored
    pub fn words(&self) -> Vec<u16> {
        self.data.chunks_exact(2).map(|w| u16::from_be_bytes([w[0],w[1]])).collect()
    }
}

/// One image of the exhaustive plan.  The source words are `first..end`, the image holds
/// those words followed by the filler words.
#[derive(Clone,PartialEq,Debug)]
pub struct Chunk {
    pub index: usize,
    pub first: u32,
    pub end: u32,
    pub image: MemoryImage
}

impl Chunk {
    pub fn word_range(&self) -> std::ops::Range<u32> {
        self.first..self.end
    }
}

/// Partition of the word space `[0,0x10000)` into consecutive chunks sized to a fixed capacity.
pub struct ChunkPlan {
    base: u16,
    filler: u16,
    words_per_chunk: usize
}

impl ChunkPlan {
    /// `capacity` is in bytes and includes the filler words.
    /// Malformed capacity is reported here, generation itself cannot fail.
    pub fn new(capacity: usize,base: u16,filler: u16) -> Result<Self,Error> {
        if capacity%2!=0 || capacity < 2*(FILLER_WORDS+1) {
            error!("refusing image capacity {}",capacity);
            return Err(Error::Capacity(capacity));
        }
        if base as usize + capacity > WORD_SPACE as usize {
            error!("capacity {} does not fit above base {:04X}",capacity,base);
            return Err(Error::AddressRange(capacity));
        }
        Ok(Self {
            base,
            filler,
            words_per_chunk: capacity/2 - FILLER_WORDS
        })
    }
    pub fn words_per_chunk(&self) -> usize {
        self.words_per_chunk
    }
    pub fn chunk_count(&self) -> usize {
        (WORD_SPACE as usize + self.words_per_chunk - 1) / self.words_per_chunk
    }
    pub fn chunk(&self,index: usize) -> Option<Chunk> {
        if index >= self.chunk_count() {
            return None;
        }
        let first = (index*self.words_per_chunk) as u32;
        let end = u32::min(first + self.words_per_chunk as u32,WORD_SPACE);
        let mut data: Vec<u8> = Vec::with_capacity(2*(self.words_per_chunk+FILLER_WORDS));
        for w in first..end {
            data.extend_from_slice(&u16::to_be_bytes(w as u16));
        }
        for _i in 0..FILLER_WORDS {
            data.extend_from_slice(&u16::to_be_bytes(self.filler));
        }
        debug!("chunk {} covers {:04X}..{:04X}",index,first,end);
        Some(Chunk {
            index,
            first,
            end,
            image: MemoryImage::new(self.base,data)
        })
    }
    pub fn iter(&self) -> impl Iterator<Item=Chunk> + '_ {
        (0..self.chunk_count()).map(|i| self.chunk(i).expect("unreachable"))
    }
}

/// Block of `size` uniform bytes.  The generator is seeded with `seed` alone, so the same seed
/// gives the same block on every run and platform.
pub fn random_block(seed: u64,size: usize,base: u16) -> MemoryImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = vec![0;size];
    rng.fill_bytes(&mut data);
    MemoryImage::new(base,data)
}

/// One block per run, run `i` uses seed `i`
pub fn random_blocks(runs: usize,size: usize,base: u16) -> impl Iterator<Item=MemoryImage> {
    (0..runs).map(move |i| random_block(i as u64,size,base))
}

/// A generated payload together with what the tool is expected to say about it.
#[derive(Clone,Debug)]
pub struct TestVector {
    pub name: String,
    pub payload: Vec<u8>,
    /// load address of a memory image, 0 for source fixtures
    pub base: u16,
    /// diagnostics the tool must raise, empty for round-trip vectors
    pub expected: Vec<fixtures::Marker>
}

impl TestVector {
    pub fn from_image(name: &str,img: &MemoryImage) -> Self {
        Self {
            name: name.to_string(),
            payload: img.data.clone(),
            base: img.base,
            expected: Vec::new()
        }
    }
    /// Annotated source fixture, markers are extracted from the comments.
    pub fn from_source(name: &str,src: &str,style: &fixtures::MarkerStyle) -> Self {
        Self {
            name: name.to_string(),
            payload: src.as_bytes().to_vec(),
            base: 0,
            expected: fixtures::markers(src,style)
        }
    }
}
