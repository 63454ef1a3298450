//! The rendering and shell-open collaborators of the command line: diagrams are drawn by the
//! Graphviz `dot` program and opened with the platform's default viewer.

use automython::{InterpreterError, Opener, RenderRequest, Renderer};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Pipes render requests through `dot`.
pub struct GraphvizRenderer {
    program: String,
}

impl Default for GraphvizRenderer {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
        }
    }
}

/// The `dot -T` output format for a diagram path.
pub fn output_format(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| automython::types::DIAGRAM_EXTENSIONS.contains(&ext.as_str()))
}

impl Renderer for GraphvizRenderer {
    fn render(&mut self, request: &RenderRequest) -> Result<(), InterpreterError> {
        let format = output_format(&request.output_path).ok_or_else(|| {
            InterpreterError::RenderError(format!(
                "Unsupported diagram format: {}",
                request.output_path
            ))
        })?;

        let mut child = Command::new(&self.program)
            .arg(format!("-T{format}"))
            .arg("-o")
            .arg(&request.output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                InterpreterError::RenderError(format!("Failed to run {}: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.to_dot().as_bytes())
                .map_err(|e| InterpreterError::RenderError(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| InterpreterError::RenderError(e.to_string()))?;
        if !output.status.success() {
            return Err(InterpreterError::RenderError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        log::info!("Saved diagram to {}", request.output_path);
        Ok(())
    }
}

/// Opens files with `open` on macOS, `start` on Windows and `xdg-open` elsewhere.
#[derive(Default)]
pub struct ShellOpener;

impl Opener for ShellOpener {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]);
            command
        } else {
            Command::new("xdg-open")
        };

        let status = command
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("viewer exited with {status}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format() {
        assert_eq!(output_format("m.PNG").as_deref(), Some("png"));
        assert_eq!(output_format("dir/m.svg").as_deref(), Some("svg"));
        assert_eq!(output_format("m.txt"), None);
        assert_eq!(output_format("m"), None);
    }

    #[test]
    fn test_missing_renderer_program() {
        let mut renderer = GraphvizRenderer {
            program: "automython-no-such-program".to_string(),
        };
        let request = RenderRequest {
            nodes: vec![],
            edges: vec![],
            tape_annotation: None,
            layout_direction: automython::graph::LayoutDirection::LeftToRight,
            output_path: "m.png".to_string(),
        };
        assert!(matches!(
            renderer.render(&request),
            Err(InterpreterError::RenderError(_))
        ));
    }
}
