//! External processor step.
//!
//! Pipes module content through a program's stdin and takes its stdout as the
//! step output. Used for compilers that live outside the pipeline, such as a
//! Sass compiler or a syntax-lowering tool.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::StepFailure;
use super::steps::StepContext;

/// Run `program` with `args`, feeding `input` on stdin.
///
/// The process runs in the project root and inherits the environment, plus:
/// - `HASHPACK_RESOURCE`: absolute path of the module being transformed
/// - `HASHPACK_MODE`: the build mode
/// - `NODE_ENV`: the mode, when the mode defines one
pub async fn run_command(
  program: &str,
  args: &[String],
  input: &[u8],
  ctx: &StepContext<'_>,
) -> Result<Vec<u8>, StepFailure> {
  info!(program = %program, module = %ctx.module.display(), "running external processor");

  let mut command = Command::new(program);
  command
    .args(args)
    .current_dir(ctx.root)
    .env("HASHPACK_RESOURCE", ctx.module)
    .env("HASHPACK_MODE", ctx.mode.as_str())
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(node_env) = ctx.mode.node_env() {
    command.env("NODE_ENV", node_env);
  }

  let mut child = command.spawn().map_err(|e| StepFailure::Spawn {
    program: program.to_string(),
    source: e,
  })?;

  let stdin = child.stdin.take();
  let feed = async move {
    if let Some(mut stdin) = stdin {
      stdin.write_all(input).await?;
      // Dropping stdin closes the pipe so the program sees EOF.
    }
    Ok::<_, std::io::Error>(())
  };

  let (fed, output) = tokio::join!(feed, child.wait_with_output());
  let output = output.map_err(|e| StepFailure::Spawn {
    program: program.to_string(),
    source: e,
  })?;

  if let Err(e) = fed {
    // A program may exit before reading all of stdin; its exit status decides.
    debug!(program = %program, error = %e, "stdin closed early");
  }

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    return Err(StepFailure::CommandFailed {
      program: program.to_string(),
      code: output.status.code(),
      stderr,
    });
  }

  debug!(program = %program, bytes = output.stdout.len(), "external processor finished");

  Ok(output.stdout)
}
