//! Terminal implementations of the prompt and remote-run context.

use async_trait::async_trait;
use prerun_vcs::{RemoteRunContext, UserPrompt};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

const SELECTION_HINT: &str = "Files to include (e.g. 1,3-5; empty for all; q to cancel): ";

/// Prompts on stdout and reads answers from stdin
pub struct TerminalPrompt;

impl TerminalPrompt {
    async fn read_line(question: String) -> Option<String> {
        let answer = tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stdout = io::stdout();
            write!(stdout, "{}", question)?;
            stdout.flush()?;

            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
        })
        .await;

        match answer {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                warn!("Failed to read answer: {}", e);
                None
            }
            Err(e) => {
                warn!("Prompt task failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl UserPrompt for TerminalPrompt {
    async fn input_box(&self, prompt: &str, default: &str) -> Option<String> {
        let question = if default.is_empty() {
            format!("{}: ", prompt)
        } else {
            format!("{} [{}]: ", prompt, default)
        };

        let answer = Self::read_line(question).await?;
        if answer.is_empty() {
            Some(default.to_string())
        } else {
            Some(answer)
        }
    }

    async fn pick_many(&self, title: &str, items: &[String]) -> Option<Vec<usize>> {
        println!("{}", title);
        for (i, item) in items.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, item);
        }

        loop {
            let answer = Self::read_line(SELECTION_HINT.to_string()).await?;
            match parse_selection(&answer, items.len()) {
                Ok(selection) => return selection,
                Err(msg) => println!("{}", msg),
            }
        }
    }
}

/// Parse a selection such as `1,3-5` into zero-based indices.
///
/// Empty input selects everything, `q` cancels (`Ok(None)`).
pub fn parse_selection(input: &str, count: usize) -> Result<Option<Vec<usize>>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return Ok(Some((0..count).collect()));
    }

    let number = |s: &str| -> Result<usize, String> {
        let n: usize = s
            .trim()
            .parse()
            .map_err(|_| format!("Not a number: {}", s.trim()))?;
        if n == 0 || n > count {
            return Err(format!("Out of range: {} (1-{})", n, count));
        }
        Ok(n - 1)
    };

    let mut selected = Vec::new();
    for part in input.split(',').filter(|p| !p.trim().is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (number(start)?, number(end)?),
            None => {
                let n = number(part)?;
                (n, n)
            }
        };
        for index in start.min(end)..=start.max(end) {
            if !selected.contains(&index) {
                selected.push(index);
            }
        }
    }
    selected.sort_unstable();
    Ok(Some(selected))
}

/// The terminal has no remote-run button; the state is only logged
pub struct TerminalContext;

impl RemoteRunContext for TerminalContext {
    fn set_show_remote_run_button(&self, show: bool) {
        debug!("Remote run available: {}", show);
    }
}
