use rhai::{Engine, EvalAltResult};
use std::process::Command;

/// Registers the file and shell helpers used by the built-in function library.
///
/// Scripts run with the privileges of the editor process.
pub fn register_host_functions(engine: &mut Engine) {
    engine.register_fn(
        "read_file",
        |path: &str| -> Result<String, Box<EvalAltResult>> {
            std::fs::read_to_string(path).map_err(|e| format!("read_file('{path}'): {e}").into())
        },
    );

    engine.register_fn(
        "write_file",
        |path: &str, content: &str| -> Result<bool, Box<EvalAltResult>> {
            std::fs::write(path, content)
                .map(|_| true)
                .map_err(|e| format!("write_file('{path}'): {e}").into())
        },
    );

    engine.register_fn(
        "run_command",
        |command: &str| -> Result<String, Box<EvalAltResult>> {
            let output = shell(command)
                .output()
                .map_err(|e| format!("run_command('{command}'): {e}"))?;
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        },
    );
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
