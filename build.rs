use std::process::Command;

/// `git <args>` stdout, or `None` outside a checkout
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    // Reported by the health endpoint and the startup log line
    let revision = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|s| !s.is_empty());
            if dirty { format!("{}-dirty", hash) } else { hash }
        }
        None => "unknown".to_string(),
    };
    println!(
        "cargo:rustc-env=GIT_HASH={}+{}",
        env!("CARGO_PKG_VERSION"),
        revision
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    // sqlx::migrate! embeds the SQL at compile time
    println!("cargo:rerun-if-changed=migrations");
}
