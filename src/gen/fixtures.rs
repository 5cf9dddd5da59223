//! ## Record and source fixtures
//!
//! * by-length records, whose content is a pure function of the record index
//! * checksum records, whose digit values sum to 0 modulo 80
//! * markers, comments in a source fixture tagging a line that must raise a diagnostic

use regex::Regex;
use log::warn;
use crate::tools::diagnostics::Severity;
use super::Error;

/// modulus of the checksum law
pub const CHECKSUM_MODULUS: i64 = 80;

/// `count` records of length `len`, record `i` is filled with the low byte of `i`,
/// except that the last byte of each record is the low byte of `len-i`.
/// Any off-by-one in slicing moves one of these bytes into a neighbor.
pub fn by_length_records(count: usize,len: usize) -> Vec<Vec<u8>> {
    let mut ans = Vec::new();
    for i in 0..count {
        let mut rec = vec![(i & 0xff) as u8;len];
        if len > 0 {
            rec[len-1] = (len.wrapping_sub(i) & 0xff) as u8;
        }
        ans.push(rec);
    }
    ans
}

/// Records of every length from 1 to `max_len`, used to exercise the boundaries of a record format.
pub fn boundary_records(max_len: usize) -> Vec<Vec<u8>> {
    (1..=max_len).map(|l| (0..l).map(|j| b'A' + (j%26) as u8).collect()).collect()
}

/// Sum of the bytes read as digit values, i.e., each byte less ASCII `0`
pub fn digit_sum(rec: &[u8]) -> i64 {
    rec.iter().map(|b| *b as i64 - b'0' as i64).sum()
}

pub fn is_checksum_ok(rec: &[u8]) -> bool {
    digit_sum(rec).rem_euclid(CHECKSUM_MODULUS)==0
}

/// Printable record of length `len` (at least 1) that obeys the checksum law.
/// The body is a digit pattern seeded by `index`, the final character balances the sum.
pub fn checksum_record(index: usize,len: usize) -> Vec<u8> {
    let mut rec: Vec<u8> = (0..len.saturating_sub(1)).map(|j| b'0' + ((index + 3*j) % 10) as u8).collect();
    let balance = (CHECKSUM_MODULUS - digit_sum(&rec).rem_euclid(CHECKSUM_MODULUS)) % CHECKSUM_MODULUS;
    rec.push(b'0' + balance as u8);
    rec
}

/// Verify, not enforce: the first record breaking the law is reported with its index.
pub fn verify_checksums(records: &[Vec<u8>]) -> Result<(),Error> {
    for (i,rec) in records.iter().enumerate() {
        if !is_checksum_ok(rec) {
            warn!("record {} has digit sum {}",i,digit_sum(rec));
            return Err(Error::ChecksumViolation(i));
        }
    }
    Ok(())
}

/// How markers are written in a source fixture, e.g. `; ERROR` in assembly
#[derive(Clone,Debug)]
pub struct MarkerStyle {
    pub comment: String,
    pub error_tag: String,
    pub warning_tag: String
}

impl MarkerStyle {
    pub fn new(comment: &str,error_tag: &str,warning_tag: &str) -> Self {
        Self {
            comment: comment.to_string(),
            error_tag: error_tag.to_string(),
            warning_tag: warning_tag.to_string()
        }
    }
    fn pattern(&self,tag: &str) -> Regex {
        let src = [r"(?i)",&regex::escape(&self.comment),r"\s*",&regex::escape(tag),r"\b"].concat();
        Regex::new(&src).expect("unreachable")
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self::new(";","ERROR","WARN")
    }
}

/// A line in the source fixture that must produce a diagnostic
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct Marker {
    /// 1-based line number
    pub line: usize,
    pub severity: Severity
}

/// Extract markers in line order
pub fn markers(src: &str,style: &MarkerStyle) -> Vec<Marker> {
    let err_patt = style.pattern(&style.error_tag);
    let warn_patt = style.pattern(&style.warning_tag);
    let mut ans = Vec::new();
    for (i,line) in src.lines().enumerate() {
        if err_patt.is_match(line) {
            ans.push(Marker { line: i+1, severity: Severity::Error });
        } else if warn_patt.is_match(line) {
            ans.push(Marker { line: i+1, severity: Severity::Warning });
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_law() {
        for i in 0..50 {
            for len in [1,2,7,80,128,254] {
                let rec = checksum_record(i,len);
                assert_eq!(rec.len(),len);
                assert!(is_checksum_ok(&rec),"record {} len {}",i,len);
                assert!(rec.iter().all(|b| *b>=b'0' && *b<0x80));
            }
        }
        let mut recs: Vec<Vec<u8>> = (0..5).map(|i| checksum_record(i,20)).collect();
        assert!(verify_checksums(&recs).is_ok());
        recs[3][0] += 1;
        assert!(matches!(verify_checksums(&recs),Err(Error::ChecksumViolation(3))));
    }

    #[test]
    fn by_length_content() {
        let recs = by_length_records(3,4);
        assert_eq!(recs,vec![vec![0,0,0,4],vec![1,1,1,3],vec![2,2,2,2]]);
        assert_eq!(boundary_records(3),vec![b"A".to_vec(),b"AB".to_vec(),b"ABC".to_vec()]);
    }

    #[test]
    fn find_markers() {
        let src = "       AORG >A000\n       LI   R0,1\n       BADOP R1 ; ERROR\n       MOV  R1,R2  ;warn: unused\n       END\n";
        let found = markers(src,&MarkerStyle::default());
        assert_eq!(found,vec![
            Marker { line: 3, severity: Severity::Error },
            Marker { line: 4, severity: Severity::Warning }
        ]);
        let basic = "10 PRINT \"HI\"\n20 GOTO ! error\n";
        let style = MarkerStyle::new("!","ERROR","WARNING");
        assert_eq!(markers(basic,&style),vec![Marker { line: 2, severity: Severity::Error }]);
    }
}
