#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two-package npm workspace:
///
/// - `pkg-b`: `src/index.ts` re-exports `./math`, with `src/math.test.ts`.
/// - `app`: `src/app.ts` imports `pkg-b`, `src/app.test.ts` imports `./app`, and
///   `src/unrelated.test.ts` imports nothing.
pub fn monorepo() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write(
        root,
        "package.json",
        r#"{ "name": "monorepo", "private": true, "workspaces": ["packages/*"] }"#,
    );

    write(
        root,
        "packages/pkg-b/package.json",
        r#"{ "name": "pkg-b", "main": "src/index.ts" }"#,
    );
    write(root, "packages/pkg-b/src/index.ts", "export { add } from './math';\n");
    write(
        root,
        "packages/pkg-b/src/math.ts",
        "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
    );
    write(
        root,
        "packages/pkg-b/src/math.test.ts",
        "import { add } from './math';\n\nif (add(1, 2) !== 3) throw new Error('math');\n",
    );

    write(
        root,
        "packages/app/package.json",
        r#"{ "name": "app", "dependencies": { "pkg-b": "*" } }"#,
    );
    write(
        root,
        "packages/app/src/app.ts",
        "import { add } from 'pkg-b';\n\nexport const run = () => add(2, 2);\n",
    );
    write(
        root,
        "packages/app/src/app.test.ts",
        "import { run } from './app';\n\nrun();\n",
    );
    write(root, "packages/app/src/unrelated.test.ts", "export {};\n");
    dir
}
