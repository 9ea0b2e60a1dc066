//! Build script for regen: embeds build date, source repository and, outside
//! of `--features release` builds, the git commit hash (`VERGEN_GIT_SHA`).

use std::env;
use std::process::Command;

/// Current date in YYYY-MM-DD format
fn build_date() -> String {
    Command::new("date")
        .arg("+%Y-%m-%d")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// "owner/repo" of the `origin` remote, else of the manifest `repository`
fn repo_name() -> String {
    let remote = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).into_owned());

    remote
        .into_iter()
        .chain(env::var("CARGO_PKG_REPOSITORY").ok())
        .find_map(|url| owner_and_repo(&url))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Last two path segments of `scheme://host/owner/repo(.git)` or
/// `user@host:owner/repo(.git)`
fn owner_and_repo(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/').trim_end_matches(".git");
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => url.split_once(':')?.1,
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., owner, repo] => Some(format!("{}/{}", owner, repo)),
        _ => None,
    }
}

fn main() {
    println!("cargo:rustc-env=REGEN_REPO_NAME={}", repo_name());
    println!("cargo:rustc-env=REGEN_BUILD_DATE={}", build_date());

    #[cfg(not(feature = "release"))]
    {
        use vergen_gitcl::{Emitter, GitclBuilder};

        let emitted = GitclBuilder::default()
            .sha(true)
            .build()
            .map_err(|e| e.to_string())
            .and_then(|git| {
                Emitter::default()
                    .add_instructions(&git)
                    .and_then(|emitter| emitter.emit())
                    .map_err(|e| e.to_string())
            });

        // Outside a git checkout
        if let Err(e) = emitted {
            println!("cargo:warning=Failed to get git info: {}", e);
            println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
        }
    }
}
