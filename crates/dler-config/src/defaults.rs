//! Hard-coded lowest-precedence layer of the merge.

use std::path::Path;

use serde_json::{Value, json};

use crate::manifest::PackageManifest;

/// Node.js built-in modules, bare spellings.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Built-ins that only exist behind the `node:` scheme.
const NODE_PREFIXED_ONLY: &[&str] = &["node:sea", "node:sqlite", "node:test", "node:test/reporters"];

pub const DEFAULT_OUT_DIR: &str = "dist";

/// Every built-in spelling, bare and `node:`-prefixed.
pub fn builtin_externals() -> Vec<String> {
    NODE_BUILTINS
        .iter()
        .map(|name| name.to_string())
        .chain(NODE_BUILTINS.iter().map(|name| format!("node:{name}")))
        .chain(NODE_PREFIXED_ONLY.iter().map(|name| name.to_string()))
        .collect()
}

/// Defaults layer for a package rooted at `root_dir`.
pub fn default_options(root_dir: &Path, pkg: &PackageManifest) -> Value {
    json!({
        "name": pkg.short_name().unwrap_or("default"),
        "rootDir": root_dir.to_string_lossy(),
        "outDir": DEFAULT_OUT_DIR,
        "entries": [],
        "externals": builtin_externals(),
        "dependencies": [],
        "peerDependencies": [],
        "devDependencies": [],
        "clean": false,
        "parallel": false,
        "transpileFailOnWarn": true,
        "transpileStub": false,
        "transpileWatch": false,
        "sourcemap": "none",
        "minify": false,
        "bundler": {
            "inlineDependencies": false,
            "format": "esm",
            "platform": "node",
        },
        "mirror": {
            "ext": "js",
        },
    })
}
