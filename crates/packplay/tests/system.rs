//! End-to-end runs against the fixture packages with the real toolchain.
//!
//! These need `npm` and `node` on PATH and registry access for samples with
//! dependencies, so they are ignored by default:
//! `cargo test -p packplay --test system -- --ignored`

use packplay::{
    CodeSample, PackNTest, Phase, SystemHost, TarballPacker, TestOptions, Toolchain, pack_n_test,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[tokio::test]
#[ignore = "requires npm and node"]
async fn test_javascript_sample_passes() {
    let sample = CodeSample::javascript(
        "works from plain js",
        "const { doStuff } = require('pass');\n\
         doStuff().then(value => { if (value !== 'stuff') process.exit(1); });\n",
    );
    pack_n_test(TestOptions::new(sample).package_dir(fixture("pass")))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires npm, node and registry access"]
async fn test_typescript_sample_passes() {
    let sample = CodeSample::typescript(
        "basic passing sample",
        "import { doStuff } from 'pass';\n\
         \n\
         export class Example {\n\
           #value = 0;\n\
           getValue() {\n\
             return this.#value;\n\
           }\n\
         }\n\
         \n\
         doStuff().then(console.log);\n",
    );
    pack_n_test(TestOptions::new(sample).package_dir(fixture("pass")))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires npm and node"]
async fn test_unpublished_files_are_absent() {
    let sample = CodeSample::javascript(
        "notes are not shipped",
        "const fs = require('fs');\nconst p = require.resolve('pass').replace('index.js', 'notes.txt');\nif (fs.existsSync(p)) process.exit(1);\n",
    );
    pack_n_test(TestOptions::new(sample).package_dir(fixture("pass")))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires npm, node and registry access"]
async fn test_leaked_type_dependency_fails_compilation() {
    let sample = CodeSample::typescript(
        "a bad import",
        "import { getLong } from 'leaky';\ngetLong().then(console.log);\n",
    );
    let failure = pack_n_test(TestOptions::new(sample).package_dir(fixture("leaky")))
        .await
        .unwrap_err();

    assert_eq!(failure.phase(), Some(Phase::Compile));
    assert!(failure.output().contains("Cannot find module 'long'"));
}

#[tokio::test]
#[ignore = "requires npm and node"]
async fn test_undeclared_runtime_dependency_fails_execution() {
    let sample = CodeSample::commonjs(
        "a bad require",
        "const { getLong } = require('leaky');\ngetLong().then(console.log);\n",
    );
    let failure = pack_n_test(TestOptions::new(sample).package_dir(fixture("leaky")))
        .await
        .unwrap_err();

    assert_eq!(failure.phase(), Some(Phase::Execute));
    assert!(failure.output().contains("Cannot find module 'long'"));
}

#[tokio::test]
#[ignore = "requires npm, node and registry access"]
async fn test_leaked_express_types_are_reported() {
    let sample = CodeSample::typescript(
        "test for leaky dependencies",
        "import { makeHttpRequestData } from 'leaky-express';\n\
         const result = makeHttpRequestData({} as any, {} as any, 5);\n\
         console.log(result);\n",
    );
    let failure = pack_n_test(TestOptions::new(sample).package_dir(fixture("leaky-express")))
        .await
        .unwrap_err();

    assert_eq!(failure.phase(), Some(Phase::Compile));
    assert!(failure.output().contains("TS7016"));
}

#[tokio::test]
#[ignore = "requires npm and node"]
async fn test_esm_sample_imports_esm_package() {
    let sample = CodeSample::esm(
        "esm import",
        "import { res } from 'esm-package';\nif (res !== 'foo') process.exit(1);\n",
    );
    pack_n_test(TestOptions::new(sample).package_dir(fixture("esm-package")))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires npm and node"]
async fn test_workspace_is_removed_after_failure() {
    let root = tempfile::TempDir::new().unwrap();
    let runner = PackNTest::with_parts(
        SystemHost::with_temp_root(root.path()),
        TarballPacker::default(),
        Toolchain::default(),
    );
    let sample = CodeSample::javascript("throws", "throw new Error('boom');");

    let failure = runner
        .run(&TestOptions::new(sample).package_dir(fixture("pass")))
        .await
        .unwrap_err();

    assert_eq!(failure.phase(), Some(Phase::Execute));
    assert!(failure.output().contains("boom"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
