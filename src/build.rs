use std::process::Command;

fn main() {
    let git_hash = match Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output(){
            Ok(output) if output.status.success() => {
                match String::from_utf8(output.stdout){
                    Ok(stdout) => stdout,
                    Err(_) => "Git Hash parsing Error".to_owned()
                }
            },
            _ => "unknown-revision".to_owned()
    };
    println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());
    println!("cargo:rustc-env=BUILD_TIME_CHRONO={}", chrono::offset::Local::now());
}
