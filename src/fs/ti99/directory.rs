//! ### Catalog and descriptor index
//!
//! The File Descriptor Index in sector 1 lists the FDR sectors sorted by file name.
//! The catalog is rendered with fixed-width columns so that a text comparison can
//! check the prefix of each row and ignore the timestamps that follow it.

use std::fmt;
use chrono::NaiveDateTime;
use super::types::MAX_FILES;

/// width of the deterministic part of a catalog row
pub const CATALOG_ROW_WIDTH: usize = 50;

/// Parse the FDI sector into FDR sector pointers, stopping at the first zero
pub fn parse_fdi(buf: &[u8]) -> Vec<usize> {
    let mut ans = Vec::new();
    for i in 0..MAX_FILES {
        let ptr = u16::from_be_bytes([buf[2*i],buf[2*i+1]]) as usize;
        if ptr==0 {
            break;
        }
        ans.push(ptr);
    }
    ans
}

/// Build the FDI sector from (name,fdr sector) pairs, sorting by name
pub fn build_fdi(entries: &mut Vec<(String,usize)>) -> Vec<u8> {
    entries.sort_by(|a,b| a.0.cmp(&b.0));
    let mut ans = vec![0;crate::fs::SECTOR_SIZE];
    for (i,(_name,sec)) in entries.iter().take(MAX_FILES).enumerate() {
        let [hi,lo] = u16::to_be_bytes(*sec as u16);
        ans[2*i] = hi;
        ans[2*i+1] = lo;
    }
    ans
}

/// One file as shown in the catalog
#[derive(Clone,PartialEq,Debug)]
pub struct CatalogRow {
    pub name: String,
    /// sectors including the FDR
    pub sectors: usize,
    pub format: String,
    /// data sectors times 256
    pub bytes: usize,
    pub records: usize,
    pub protected: bool,
    pub updated: Option<NaiveDateTime>
}

impl fmt::Display for CatalogRow {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{:<10} {:>4}  {:<12} {:>7} B {:>5} recs",self.name,self.sectors,self.format,self.bytes,self.records)?;
        if self.protected {
            write!(f," P")?;
        }
        if let Some(t) = self.updated {
            write!(f,"  {}",t.format("%Y-%m-%d %H:%M:%S"))?;
        }
        Ok(())
    }
}

/// Full listing: volume line, one row per file, then the used and free sector counts
pub fn render(volume: &str,rows: &[CatalogRow],used: usize,free: usize) -> String {
    let mut ans = format!("{:<10} (TI disk)\n",volume);
    for row in rows {
        ans += &row.to_string();
        ans += "\n";
    }
    ans += &format!("{:>5} used {:>5} free\n",used,free);
    ans
}
