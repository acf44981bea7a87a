use std::fs;
use std::io::{BufRead, Write};

use anyhow::{bail, Context};

use crate::config::Config;
use crate::interpreter::{Object, Runtime};

/// Runs the read-eval-print loop until `input` is exhausted.
///
/// Lines with syntax errors are reported and skipped. Bindings persist from
/// one line to the next.
pub fn start(input: impl BufRead, mut output: impl Write, config: &Config) -> anyhow::Result<()> {
    let mut runtime = Runtime::with_config(config);
    if let Some(path) = &config.prelude {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read prelude {}", path.display()))?;
        let result = runtime
            .eval_source(&source)
            .with_context(|| format!("failed to parse prelude {}", path.display()))?;
        if let Object::Error(message) = &result {
            bail!("prelude {} failed: {message}", path.display());
        }
    }

    write!(output, "{}", config.prompt)?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        tracing::debug!(%line, "evaluating line");
        match runtime.eval_line(&line) {
            Err(error) => writeln!(output, "{error}")?,
            Ok(None) => {}
            Ok(Some(result)) => writeln!(output, "{result}")?,
        }
        write!(output, "{}", config.prompt)?;
        output.flush()?;
    }
    Ok(())
}
