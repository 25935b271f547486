//! Interactive controller session
//!
//! Reads commands from stdin one at a time, prompts for their fields, and
//! prints each reply. Invalid numbers are asked for again rather than
//! ending the session; end of input quits.

use std::io::Write;

use miette::IntoDiagnostic;
use swall_control::{CommandClient, ControlError, Rect, Reply};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::render::{self, Action};

const COMMANDS: &str = "SPAWN   KILL   LIST   SCREEN_SIZE   MOVE   HELP   QUIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Run(Action),
    Help,
    Quit,
    Empty,
    Unknown,
}

fn parse_choice(input: &str) -> Choice {
    match input.trim().to_lowercase().as_str() {
        "spawn" => Choice::Run(Action::Spawn),
        "kill" => Choice::Run(Action::Kill),
        "list" => Choice::Run(Action::List),
        "screen_size" => Choice::Run(Action::ScreenSize),
        "move" => Choice::Run(Action::Move),
        "help" => Choice::Help,
        "quit" => Choice::Quit,
        "" => Choice::Empty,
        _ => Choice::Unknown,
    }
}

struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` at end of input
    async fn line(&mut self, prompt: &str) -> miette::Result<Option<String>> {
        print!("{}: ", prompt);
        std::io::stdout().flush().into_diagnostic()?;
        self.lines.next_line().await.into_diagnostic()
    }

    async fn number(&mut self, prompt: &str) -> miette::Result<Option<u32>> {
        loop {
            let Some(line) = self.line(prompt).await? else {
                return Ok(None);
            };
            match line.trim().parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => println!("Invalid input"),
            }
        }
    }

    async fn area(&mut self) -> miette::Result<Option<Rect>> {
        let Some(x) = self.number("Enter x coordinate").await? else {
            return Ok(None);
        };
        let Some(y) = self.number("Enter y coordinate").await? else {
            return Ok(None);
        };
        let Some(width) = self.number("Enter width").await? else {
            return Ok(None);
        };
        let Some(height) = self.number("Enter height").await? else {
            return Ok(None);
        };
        Ok(Some(Rect::new(x, y, width, height)))
    }
}

/// Run the interactive session until QUIT or end of input
pub async fn run(client: &mut CommandClient) -> miette::Result<()> {
    let mut input = Input::new();

    println!("\nSWALL APP CONTROLLER\n");

    loop {
        println!("List of valid commands are [ {} ]", COMMANDS);

        let Some(choice) = input.line("\nEnter a command").await? else {
            break;
        };

        let action = match parse_choice(&choice) {
            Choice::Run(action) => action,
            Choice::Help => {
                print_help();
                continue;
            }
            Choice::Quit => break,
            Choice::Empty => continue,
            Choice::Unknown => {
                println!("Invalid command entered. Try again\n");
                continue;
            }
        };

        let result = match action {
            Action::Spawn => {
                let Some(area) = input.area().await? else { break };
                let Some(command) = input.line("Enter the full executable command").await? else {
                    break;
                };
                let mut parts = command.split_whitespace();
                let Some(executable) = parts.next() else {
                    println!("No executable given\n");
                    continue;
                };
                client
                    .spawn(area.x, area.y, area.width, area.height, executable, parts)
                    .await
            }
            Action::Kill => {
                let Some(pid) = input.number("Enter the pid").await? else { break };
                client.kill(pid).await
            }
            Action::List => client.list().await,
            Action::ScreenSize => client.screen_size().await,
            Action::Move => {
                println!("NOTICE: the compositor may only move windows, not resize them");
                let Some(pid) = input.number("Enter the pid").await? else { break };
                let Some(area) = input.area().await? else { break };
                client
                    .move_window(pid, area.x, area.y, area.width, area.height)
                    .await
            }
        };

        match result {
            Ok(reply) => {
                show_reply(action, &reply);
            }
            Err(e) => report_failure(client, e).await?,
        }

        println!("{}", "=".repeat(60));
    }

    client.close();
    Ok(())
}

/// Print a reply; a malformed one is reported and the session goes on
///
/// Returns whether the reply rendered cleanly.
fn show_reply(action: Action, reply: &Reply) -> bool {
    match render::reply(action, reply) {
        Ok(_) => true,
        Err(e) => {
            println!("Unexpected reply from compositor: {}", e);
            false
        }
    }
}

/// Print a failed request and reconnect if the link is gone
async fn report_failure(client: &mut CommandClient, error: ControlError) -> miette::Result<()> {
    println!("Request failed: {}", error);

    if error.is_transport() {
        println!("Reconnecting to {}...", client.connection().endpoint().display());
        client.reconnect().await.into_diagnostic()?;
    }

    Ok(())
}

fn print_help() {
    println!("SPAWN       - Spawns an application via its command line launch arguments\n");
    println!("KILL        - Kills an application given a specific process id\n");
    println!("LIST        - Lists all running applications with their process ids\n");
    println!("SCREEN_SIZE - Returns the current screen size of the compositor\n");
    println!("MOVE        - Moves an application's window to a new position\n");
    println!("QUIT        - Ends the session\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choices_are_case_insensitive() {
        assert_eq!(parse_choice("SPAWN"), Choice::Run(Action::Spawn));
        assert_eq!(parse_choice("Kill"), Choice::Run(Action::Kill));
        assert_eq!(parse_choice("  list \n"), Choice::Run(Action::List));
        assert_eq!(parse_choice("screen_size"), Choice::Run(Action::ScreenSize));
        assert_eq!(parse_choice("MoVe"), Choice::Run(Action::Move));
        assert_eq!(parse_choice("help"), Choice::Help);
        assert_eq!(parse_choice("QUIT"), Choice::Quit);
    }

    #[test]
    fn test_malformed_reply_does_not_end_session() {
        let reply: Reply = serde_json::from_value(serde_json::json!({
            "success": true,
            "pid": "not a number",
            "error": null
        }))
        .unwrap();

        assert!(!show_reply(Action::Spawn, &reply));

        let reply: Reply = serde_json::from_value(serde_json::json!({"success": true})).unwrap();
        assert!(show_reply(Action::Kill, &reply));
    }

    #[test]
    fn test_blank_and_unknown_choices() {
        assert_eq!(parse_choice("   "), Choice::Empty);
        assert_eq!(parse_choice("resize"), Choice::Unknown);
        assert_eq!(parse_choice("screen size"), Choice::Unknown);
    }
}
