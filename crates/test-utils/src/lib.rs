pub mod builders;
pub mod fakes;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Write `(relative path, contents)` pairs under `root`, creating directories.
pub fn write_tree<'a, I>(root: &Path, files: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write fixture file");
    }
}

/// Every file under `dir`, keyed by forward-slash relative path.
///
/// A missing `dir` yields an empty map.
pub fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack: Vec<PathBuf> = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries {
            let path = entry.expect("read dir entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path
                    .strip_prefix(dir)
                    .expect("entry below dir")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.insert(rel, fs::read(&path).expect("read file"));
            }
        }
    }
    out
}

/// A small project matching the built-in configuration layout.
pub fn sample_project(root: &Path) {
    write_tree(
        root,
        [
            (
                "src/index.html",
                "<html><body>{% include \"partials/nav.html\" %}<p>{{ mode }}</p></body></html>\n",
            ),
            ("src/partials/nav.html", "<nav>home</nav>"),
            (
                "src/styles/main.scss",
                "@import 'base';\n.page {\n  .title { color: $accent; user-select: none; }\n}\n",
            ),
            ("src/styles/_base.scss", "$accent: #336699;\n"),
            ("src/scripts/app.js", "function greet(name) {\n  return 'hi ' + name;\n}\ngreet('x');\n"),
            ("src/scripts/lib/util.js", "var util = { answer: 42 };\n"),
            ("src/images/logo.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            ("src/fonts/body.woff2", "not really a font"),
        ],
    );
}
