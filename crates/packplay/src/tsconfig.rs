//! Compiler configuration written next to typed samples.

use serde_json::{Value, json};
use std::path::Path;

pub const TSCONFIG_FILE_NAME: &str = "tsconfig.json";

/// Configuration compiling only `entry`, in strict mode, emitting the
/// compiled file next to it.
///
/// Without `alternate` the built-in defaults are used. With it, the generated
/// file extends the caller's configuration and pins the options the pipeline
/// relies on (strict checking, output beside the source).
pub fn compiler_config(entry: &str, alternate: Option<&Path>) -> Value {
    match alternate {
        None => json!({
            "compilerOptions": {
                "strict": true,
                "target": "es2020",
                "module": "commonjs",
                "moduleResolution": "node",
                "esModuleInterop": true
            },
            "files": [entry]
        }),
        Some(path) => json!({
            "extends": path.to_string_lossy(),
            "compilerOptions": {
                "strict": true,
                "noEmit": false,
                "outDir": "."
            },
            "files": [entry]
        }),
    }
}

/// Pretty-printed [`compiler_config`].
pub fn render_compiler_config(entry: &str, alternate: Option<&Path>) -> String {
    format!("{:#}\n", compiler_config(entry, alternate))
}
