use crate::config::APP_NAME;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;
use tracing::info;

pub const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

pub fn add_args(exe: &Path) -> Vec<String> {
    vec![
        "add".to_string(),
        RUN_KEY.to_string(),
        "/v".to_string(),
        APP_NAME.to_string(),
        "/t".to_string(),
        "REG_SZ".to_string(),
        "/d".to_string(),
        format!("\"{}\"", exe.display()),
        "/f".to_string(),
    ]
}

pub fn delete_args() -> Vec<String> {
    vec![
        "delete".to_string(),
        RUN_KEY.to_string(),
        "/v".to_string(),
        APP_NAME.to_string(),
        "/f".to_string(),
    ]
}

fn run_reg(args: &[String]) -> Result<()> {
    let output = Command::new("reg")
        .args(args)
        .output()
        .context("failed to launch reg.exe")?;
    if !output.status.success() {
        bail!(
            "reg {} failed: {}",
            args.first().map(String::as_str).unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Registers the current executable to start at login. Returns a message for
/// the user.
pub fn enable() -> Result<String> {
    if !cfg!(windows) {
        return Ok("Auto-start is only available on Windows; nothing changed.".to_string());
    }
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    run_reg(&add_args(&exe))?;
    info!("Auto-start enabled for {}", exe.display());
    Ok(format!("{} will start at login.", APP_NAME))
}

pub fn disable() -> Result<String> {
    if !cfg!(windows) {
        return Ok("Auto-start is only available on Windows; nothing changed.".to_string());
    }
    run_reg(&delete_args())?;
    info!("Auto-start disabled");
    Ok(format!("{} will no longer start at login.", APP_NAME))
}
