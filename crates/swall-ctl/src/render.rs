//! Human-readable output for compositor replies

use miette::IntoDiagnostic;
use swall_control::{AppConfig, Reply};

/// Which command a reply answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Spawn,
    Kill,
    List,
    ScreenSize,
    Move,
}

/// Print the command-specific part of a reply followed by its outcome
///
/// Returns the compositor's error message, if any.
pub fn reply(action: Action, reply: &Reply) -> miette::Result<Option<String>> {
    if let Some(error) = reply.error() {
        println!("Error occurred on action: {}", error);
        return Ok(Some(error.to_string()));
    }

    match action {
        Action::Spawn => {
            let pid = reply.pid().into_diagnostic()?;
            let executable = reply
                .config()
                .into_diagnostic()?
                .map(|config| config.executable)
                .unwrap_or_default();
            match pid {
                Some(pid) => println!("\nSpawned application {} with PID {}\n", executable, pid),
                None => println!("\nSpawned application {}\n", executable),
            }
        }
        Action::List => {
            let processes = reply.process_ids().into_diagnostic()?.unwrap_or_default();
            print!("{}", process_table(&processes));
        }
        Action::ScreenSize => match reply.screen_size().into_diagnostic()? {
            Some((width, height)) => println!("\nWIDTH {} HEIGHT {}\n", width, height),
            None => println!("\nScreen size not reported\n"),
        },
        Action::Kill | Action::Move => {}
    }

    if reply.success() == Some(true) {
        println!("Success\n");
    }

    Ok(None)
}

/// Format `(pid, config)` pairs as an aligned table
pub fn process_table(processes: &[(u32, AppConfig)]) -> String {
    const HEADERS: [&str; 7] = ["PID", "EXECUTABLE", "X", "Y", "WIDTH", "HEIGHT", "ARGS"];

    let rows: Vec<[String; 7]> = processes
        .iter()
        .map(|(pid, config)| {
            [
                pid.to_string(),
                config.executable.clone(),
                config.area.x.to_string(),
                config.area.y.to_string(),
                config.area.width.to_string(),
                config.area.height.to_string(),
                config.args.join(" "),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(header.as_slice()).chain(rows.iter().map(|r| r.as_slice())) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    if rows.is_empty() {
        out.push_str("(no applications running)\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use swall_control::Rect;

    #[test]
    fn test_process_table_aligns_columns() {
        let processes = vec![
            (
                4000,
                AppConfig {
                    executable: "weston-terminal".to_string(),
                    args: vec![],
                    area: Rect::new(500, 500, 100, 100),
                },
            ),
            (
                4001,
                AppConfig {
                    executable: "foot".to_string(),
                    args: vec!["-e".to_string(), "htop".to_string()],
                    area: Rect::new(0, 0, 1920, 1080),
                },
            ),
        ];

        let table = process_table(&processes);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PID   EXECUTABLE"));
        assert!(lines[1].starts_with("4000  weston-terminal  500"));
        assert!(lines[2].starts_with("4001  foot             0"));
        assert!(lines[2].ends_with("-e htop"));
    }

    #[test]
    fn test_structured_error_is_reported() {
        let rejected: Reply =
            serde_json::from_value(serde_json::json!({"error": {"code": 3}})).unwrap();

        let error = reply(Action::Kill, &rejected).unwrap();
        assert_eq!(error.as_deref(), Some(r#"{"code":3}"#));
    }

    #[test]
    fn test_wrongly_typed_field_is_an_error() {
        let malformed: Reply =
            serde_json::from_value(serde_json::json!({"success": true, "screen_width": "wide"}))
                .unwrap();

        assert!(reply(Action::ScreenSize, &malformed).is_err());
    }

    #[test]
    fn test_empty_process_table() {
        let table = process_table(&[]);
        assert!(table.contains("no applications running"));
    }
}
