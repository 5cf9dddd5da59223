//! ### Disk round trip scenarios
//!
//! Files cross the boundary between the harness's disk image builder and the disk manager
//! under test, in either direction:
//! * `ToolExtracts`: the harness builds the image, the tool extracts the file
//! * `ToolAdds`: the tool adds the file to a copy of the template, the harness extracts it,
//!   checks the image for consistency, and optionally compares it with an image the harness
//!   built itself, masking the timestamps

use log::debug;
use super::{Scenario,Run,Phase,Failure,Step};
use crate::fs::FileFormat;
use crate::fs::ti99::Disk;
use crate::compare::{MaskSpec,compare_bytes};
use crate::tools::ExitClass;

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Direction {
    ToolExtracts,
    ToolAdds
}

pub struct DiskRoundTrip<'a> {
    pub name: String,
    /// blank volume the image is copied from
    pub template: Vec<u8>,
    pub file_name: String,
    pub payload: Vec<u8>,
    pub format: FileFormat,
    pub step: Step<'a>,
    pub direction: Direction,
    /// compare the tool's image with the harness's (`ToolAdds` only)
    pub compare_image: bool
}

impl<'a> DiskRoundTrip<'a> {
    pub fn new(name: &str,template: &[u8],file_name: &str,payload: &[u8],format: FileFormat,step: Step<'a>,direction: Direction) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_vec(),
            file_name: file_name.to_string(),
            payload: payload.to_vec(),
            format,
            step,
            direction,
            compare_image: false
        }
    }
    pub fn with_image_compare(mut self,on: bool) -> Self {
        self.compare_image = on;
        self
    }
    fn reference_disk(&self,run: &Run) -> Result<Disk,Failure> {
        let mut disk = Disk::from_template(&self.template).map_err(|e| run.fail("template","disk.dsk",e))?;
        disk.add(&self.file_name,&self.payload,&self.format).map_err(|e| run.fail("add file",&self.file_name,e))?;
        Ok(disk)
    }
    fn tool_extracts(&self,run: &mut Run) -> Result<(),Failure> {
        run.enter(Phase::Generate);
        let disk = self.reference_disk(run)?;
        run.ws.write("disk.dsk",&disk.to_bytes()).map_err(|e| run.fail("write image","disk.dsk",e))?;
        run.enter(Phase::Invoke);
        let vars = [
            ("disk",run.path_var("disk.dsk")),
            ("name",self.file_name.clone()),
            ("out",run.path_var("extracted.out"))
        ];
        let out = run.invoke(&self.step,&vars,ExitClass::Success)?;
        let result = match self.step.writes_file() {
            true => run.ws.read("extracted.out").map_err(|e| run.fail("read result","extracted.out",e))?,
            false => out.stdout
        };
        run.enter(Phase::Compare);
        compare_bytes(&self.payload,&result,&MaskSpec::new(),0).map_err(|e| run.fail("file content",&self.file_name,e))
    }
    fn tool_adds(&self,run: &mut Run) -> Result<(),Failure> {
        run.enter(Phase::Generate);
        run.ws.write("disk.dsk",&self.template).map_err(|e| run.fail("write image","disk.dsk",e))?;
        run.ws.write("payload.in",&self.payload).map_err(|e| run.fail("write payload","payload.in",e))?;
        run.enter(Phase::Invoke);
        let vars = [
            ("disk",run.path_var("disk.dsk")),
            ("name",self.file_name.clone()),
            ("in",run.path_var("payload.in")),
            ("format",self.format.to_string())
        ];
        run.invoke(&self.step,&vars,ExitClass::Success)?;
        run.enter(Phase::Compare);
        let bytes = run.ws.read("disk.dsk").map_err(|e| run.fail("read image","disk.dsk",e))?;
        let disk = Disk::from_template(&bytes).map_err(|e| run.fail("image structure","disk.dsk",e))?;
        let problems = disk.check().map_err(|e| run.fail("image structure","disk.dsk",e))?;
        if let Some(p) = problems.first() {
            return Err(run.fail("allocation bitmap","disk.dsk",p));
        }
        match disk.format_of(&self.file_name) {
            Ok(f) if f==self.format => {},
            Ok(f) => return Err(run.fail("file format",&self.file_name,format!("expected {}, found {}",self.format,f))),
            Err(e) => return Err(run.fail("catalog",&self.file_name,e))
        }
        let result = disk.extract(&self.file_name).map_err(|e| run.fail("extract",&self.file_name,e))?;
        compare_bytes(&self.payload,&result,&MaskSpec::new(),0).map_err(|e| run.fail("file content",&self.file_name,e))?;
        if self.compare_image {
            let reference = self.reference_disk(run)?;
            let mask = reference.standardize().map_err(|e| run.fail("standardize","disk.dsk",e))?
                .merge(&disk.standardize().map_err(|e| run.fail("standardize","disk.dsk",e))?);
            debug!("image compare with {} masked ranges",mask.ranges().len());
            compare_bytes(&reference.to_bytes(),&bytes,&mask,0).map_err(|e| run.fail("image compare","disk.dsk",e))?;
        }
        Ok(())
    }
}

impl<'a> Scenario for DiskRoundTrip<'a> {
    fn name(&self) -> &str {
        &self.name
    }
    fn execute(&self,run: &mut Run) -> Result<(),Failure> {
        match self.direction {
            Direction::ToolExtracts => self.tool_extracts(run),
            Direction::ToolAdds => self.tool_adds(run)
        }
    }
}
