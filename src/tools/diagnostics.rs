//! ### Diagnostics stream
//!
//! Tools report problems on stderr, one per line, as
//! `[0012] Error: message` or `[0012] Warning: message`.  A version banner may come first,
//! and a summary such as `2 errors, 1 warning` may come last.  Any other line is context
//! (e.g. an echo of the offending source line) and is kept but not interpreted.

use std::fmt;
use std::str::FromStr;
use regex::Regex;
use log::{debug,warn};
use crate::gen::fixtures::Marker;
use super::Error;

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Severity {
    Error,
    Warning
}

impl fmt::Display for Severity {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f,"Error"),
            Self::Warning => write!(f,"Warning")
        }
    }
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub message: String
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize
}

/// Parsed stderr of one run
#[derive(Clone,PartialEq,Debug,Default)]
pub struct Report {
    pub banner: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Option<Summary>,
    pub context: Vec<String>
}

impl Report {
    pub fn count(&self,severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity==severity).count()
    }
}

fn diagnostic(caps: &regex::Captures) -> Option<Diagnostic> {
    let severity = match caps[2].to_lowercase().as_str() {
        "error" => Severity::Error,
        _ => Severity::Warning
    };
    Some(Diagnostic {
        line: usize::from_str(&caps[1]).ok()?,
        severity,
        message: caps[3].to_string()
    })
}

fn summary(caps: &regex::Captures) -> Option<Summary> {
    Some(Summary {
        errors: usize::from_str(&caps[1]).ok()?,
        warnings: usize::from_str(&caps[2]).ok()?
    })
}

/// Split stderr into banner, diagnostics, summary, and context lines.
/// A diagnostic or summary whose numbers do not fit is kept as context.
pub fn parse(stderr: &str) -> Report {
    let diag_patt = Regex::new(r"^\[(\d+)\]\s+(?i)(error|warning):?\s*(.*)$").expect("unreachable");
    let sum_patt = Regex::new(r"^(?i)(\d+)\s+errors?,\s*(\d+)\s+warnings?").expect("unreachable");
    let mut ans = Report::default();
    for (i,line) in stderr.lines().enumerate() {
        let line = line.trim_end();
        if let Some(caps) = diag_patt.captures(line) {
            match diagnostic(&caps) {
                Some(d) => ans.diagnostics.push(d),
                None => {
                    warn!("line number out of range: {}",line);
                    ans.context.push(line.to_string());
                }
            }
        } else if let Some(caps) = sum_patt.captures(line) {
            match summary(&caps) {
                Some(sum) => ans.summary = Some(sum),
                None => {
                    warn!("summary count out of range: {}",line);
                    ans.context.push(line.to_string());
                }
            }
        } else if i==0 && line.len() > 0 {
            ans.banner = Some(line.to_string());
        } else if line.len() > 0 {
            ans.context.push(line.to_string());
        }
    }
    debug!("{} diagnostics, banner {}",ans.diagnostics.len(),ans.banner.is_some());
    ans
}

/// Diagnostics must agree with the markers in number, order, line, and severity.
/// If the tool printed a summary it must agree with the diagnostics.
pub fn compare_markers(report: &Report,markers: &[Marker]) -> Result<(),Error> {
    if report.diagnostics.len()!=markers.len() {
        let lines: Vec<usize> = report.diagnostics.iter().map(|d| d.line).collect();
        let expected: Vec<usize> = markers.iter().map(|m| m.line).collect();
        return Err(Error::MarkerMismatch(format!("expected diagnostics at lines {:?}, got {:?}",expected,lines)));
    }
    for (i,(d,m)) in report.diagnostics.iter().zip(markers).enumerate() {
        if d.line!=m.line || d.severity!=m.severity {
            return Err(Error::MarkerMismatch(format!("diagnostic {} is {} at line {}, expected {} at line {}",
                i+1,d.severity,d.line,m.severity,m.line)));
        }
    }
    if let Some(sum) = report.summary {
        let (e,w) = (report.count(Severity::Error),report.count(Severity::Warning));
        if sum.errors!=e || sum.warnings!=w {
            return Err(Error::MarkerMismatch(format!("summary claims {} errors and {} warnings, found {} and {}",
                sum.errors,sum.warnings,e,w)));
        }
    }
    Ok(())
}
