//! ### Round trip scenarios
//!
//! The payload is written to the workspace, transformed by the forward tool, transformed back
//! by the inverse tool, and compared with the original modulo the mask and length tolerance.
//! For example disassemble then reassemble a memory image.
//! Both steps may use `{base}`, the load address of the image as four hex digits.

use log::debug;
use super::{Scenario,Run,Phase,Failure,Step};
use crate::gen::{ChunkPlan,TestVector,random_block};
use crate::compare::{MaskSpec,compare_bytes};
use crate::tools::{ExitClass,ToolOutput};

pub struct RoundTrip<'a> {
    pub name: String,
    pub vector: TestVector,
    pub forward: Step<'a>,
    pub inverse: Option<Step<'a>>,
    pub mask: MaskSpec,
    pub tolerance: usize
}

impl<'a> RoundTrip<'a> {
    pub fn new(vector: TestVector,forward: Step<'a>,inverse: Option<Step<'a>>,tolerance: usize) -> Self {
        Self {
            name: vector.name.clone(),
            vector,
            forward,
            inverse,
            mask: MaskSpec::new(),
            tolerance
        }
    }
    pub fn with_mask(mut self,mask: MaskSpec) -> Self {
        self.mask = mask;
        self
    }
    /// One scenario per chunk of the exhaustive plan
    pub fn exhaustive(plan: &ChunkPlan,forward: &Step<'a>,inverse: &Step<'a>,tolerance: usize) -> Vec<Self> {
        plan.iter().map(|chunk| {
            let name = format!("chunk {:04} words {:04X}..{:04X}",chunk.index,chunk.first,chunk.end - 1);
            Self::new(TestVector::from_image(&name,&chunk.image),forward.clone(),Some(inverse.clone()),tolerance)
        }).collect()
    }
    /// One scenario per seeded random block, run `i` uses seed `i`
    pub fn random(runs: usize,size: usize,base: u16,forward: &Step<'a>,inverse: &Step<'a>,tolerance: usize) -> Vec<Self> {
        (0..runs).map(|i| {
            let name = format!("random seed {} size {}",i,size);
            let img = random_block(i as u64,size,base);
            Self::new(TestVector::from_image(&name,&img),forward.clone(),Some(inverse.clone()),tolerance)
        }).collect()
    }
}

/// Output of a step: the `{out}` file if the step writes one, otherwise stdout
fn result_bytes(run: &Run,step: &Step,out_file: &str,out: ToolOutput) -> Result<Vec<u8>,Failure> {
    if step.writes_file() {
        run.ws.read(out_file).map_err(|e| run.fail("read result",out_file,e))
    } else {
        Ok(out.stdout)
    }
}

impl<'a> Scenario for RoundTrip<'a> {
    fn name(&self) -> &str {
        &self.name
    }
    fn execute(&self,run: &mut Run) -> Result<(),Failure> {
        run.enter(Phase::Generate);
        run.ws.write("input.bin",&self.vector.payload).map_err(|e| run.fail("write payload","input.bin",e))?;
        run.enter(Phase::Invoke);
        let base = format!("{:04X}",self.vector.base);
        let vars = [("in",run.path_var("input.bin")),("out",run.path_var("stage1.out")),("base",base.clone())];
        let out = run.invoke(&self.forward,&vars,ExitClass::Success)?;
        let mut result = result_bytes(run,&self.forward,"stage1.out",out)?;
        if let Some(inverse) = &self.inverse {
            run.enter(Phase::InvokeInverse);
            if !self.forward.writes_file() {
                run.ws.write("stage1.out",&result).map_err(|e| run.fail("write intermediate","stage1.out",e))?;
            }
            let vars = [("in",run.path_var("stage1.out")),("out",run.path_var("result.bin")),("base",base)];
            let out = run.invoke(inverse,&vars,ExitClass::Success)?;
            result = result_bytes(run,inverse,"result.bin",out)?;
        }
        run.enter(Phase::Compare);
        debug!("comparing {} bytes with {} bytes",self.vector.payload.len(),result.len());
        compare_bytes(&self.vector.payload,&result,&self.mask,self.tolerance).map_err(|e| run.fail("binary compare",&self.name,e))
    }
}
