#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;

use runboard::fs::FileSystem;
use runboard::fs::mock::MockFileSystem;
use runboard::status::{BuildOptions, BuildStatusCalculator};

pub type TestResult = Result<(), Box<dyn Error>>;

pub const PROGRESS_OUTPUT: &str =
    "10% building modules 3/3 modules 0 active\n15% building modules 30/37 modules 0 active\n";

pub const SUMMARY_OUTPUT: &str =
    "Hash: abc\nchunk {main} main.js, main.js.map (main) 381 kB [initial] [rendered]\n";

pub const FATAL_OUTPUT: &str = "ERROR in src/app/app.module.ts(12,5): error TS2304: Cannot find name 'Foo'.\n    src/app/app.module.ts:12:5\n\n";

pub const KARMA_FAILURE_OUTPUT: &str = "\
Chrome 71.0.3578 (Mac OS X 10.14.2) AppComponent should render title FAILED
\tExpected 'Welcome to app!' to contain 'Welcome'.
\t    at UserContext.<anonymous> (src/app/app.component.spec.ts:30:64)
";

pub fn mock_fs() -> (MockFileSystem, Arc<dyn FileSystem>) {
    let fs = MockFileSystem::new();
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, shared)
}

pub fn build_calculator(fs: Arc<dyn FileSystem>, output_path: Option<&str>) -> BuildStatusCalculator {
    BuildStatusCalculator::new(
        BuildOptions {
            cwd: "/work/app".into(),
            output_path: output_path.map(str::to_string),
            index: None,
            is_for_production: false,
        },
        fs,
    )
}
