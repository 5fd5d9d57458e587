use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let commit = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT_HASH={commit}");
    println!("cargo:rerun-if-changed=build.rs");

    // Rebuild when HEAD or refs move, including worktree setups.
    if let Ok(git_dir) = git_dir() {
        emit_rerun_if_head_changes(&git_dir);
    }
}

fn git(args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|err| err.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).to_string());
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(format!("git {} printed nothing", args.join(" ")));
    }
    Ok(value)
}

fn git_dir() -> Result<PathBuf, String> {
    let git_dir = PathBuf::from(git(&["rev-parse", "--git-dir"])?);
    if git_dir.is_absolute() {
        return Ok(git_dir);
    }
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").map_err(|e| e.to_string())?;
    Ok(PathBuf::from(manifest_dir).join(git_dir))
}

fn emit_rerun_if_head_changes(git_dir: &Path) {
    let head_path = git_dir.join("HEAD");
    println!("cargo:rerun-if-changed={}", head_path.display());

    let common_dir = fs::read_to_string(git_dir.join("commondir"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| git_dir.join(s))
        .unwrap_or_else(|| git_dir.to_path_buf());
    println!(
        "cargo:rerun-if-changed={}",
        common_dir.join("packed-refs").display()
    );

    if let Ok(head) = fs::read_to_string(&head_path) {
        if let Some(reference) = head.trim().strip_prefix("ref: ") {
            println!(
                "cargo:rerun-if-changed={}",
                common_dir.join(reference).display()
            );
        }
    }
}
