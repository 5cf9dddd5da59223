//! ### Error path scenarios
//!
//! The tool is run on a source fixture with markers.  It must exit with the expected code,
//! print no raw fault, and print exactly the diagnostics the markers call for, in order.

use super::{Scenario,Run,Phase,Failure,Step};
use crate::gen::TestVector;
use crate::gen::fixtures::MarkerStyle;
use crate::tools::ExitClass;
use crate::tools::diagnostics;

pub struct ErrorPath<'a> {
    pub vector: TestVector,
    /// name of the fixture file in the workspace, also `{name}` in the arguments
    pub file_name: String,
    pub step: Step<'a>,
    pub expect: ExitClass
}

impl<'a> ErrorPath<'a> {
    pub fn new(name: &str,file_name: &str,source: &str,style: &MarkerStyle,step: Step<'a>,expect: ExitClass) -> Self {
        Self {
            vector: TestVector::from_source(name,source,style),
            file_name: file_name.to_string(),
            step,
            expect
        }
    }
}

impl<'a> Scenario for ErrorPath<'a> {
    fn name(&self) -> &str {
        &self.vector.name
    }
    fn execute(&self,run: &mut Run) -> Result<(),Failure> {
        run.enter(Phase::Generate);
        run.ws.write(&self.file_name,&self.vector.payload).map_err(|e| run.fail("write fixture",&self.file_name,e))?;
        run.enter(Phase::Invoke);
        let vars = [
            ("in",run.path_var(&self.file_name)),
            ("out",run.path_var("error.out")),
            ("name",self.file_name.clone())
        ];
        let out = run.invoke(&self.step,&vars,self.expect)?;
        run.enter(Phase::Diagnose);
        let report = diagnostics::parse(&out.stderr_text());
        diagnostics::compare_markers(&report,&self.vector.expected).map_err(|e| run.fail("diagnostics",&self.file_name,e))
    }
}
