// Console loop module
// Line-oriented question/answer prompt on the terminal


use anyhow::Result;
use console::style;
use dialoguer::Input;
use tracing::debug;

use crate::chain::AnswerChain;

/// Sentinel input that terminates the loop
const QUIT_COMMAND: &str = "quit";

/// What to do with one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction {
    /// Forward the question to the answer chain
    Ask(String),
    /// Leave the loop without invoking the chain
    Quit,
}

/// Classify a line of input. The literal `quit` (after trimming) exits;
/// everything else is a question.
#[inline]
pub fn parse_input(line: &str) -> ReplAction {
    let trimmed = line.trim();
    if trimmed == QUIT_COMMAND {
        ReplAction::Quit
    } else {
        ReplAction::Ask(trimmed.to_string())
    }
}

/// Run the blocking question/answer loop until the user quits.
/// One question at a time; no history is carried between turns.
#[inline]
pub async fn run(chain: &AnswerChain) -> Result<()> {
    eprintln!("Ask questions. Type '{}' to exit.", style(QUIT_COMMAND).bold());
    eprintln!();

    loop {
        let line: String = match Input::new().with_prompt("You").interact_text() {
            Ok(line) => line,
            Err(e) => {
                // stdin closed or terminal went away; treat like quit
                debug!("Input ended: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            ReplAction::Quit => break,
            ReplAction::Ask(question) => {
                let answer = chain.ask(&question).await?;
                println!("Answer: {}", answer);
                println!();
            }
        }
    }

    Ok(())
}
