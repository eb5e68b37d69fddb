use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use client_core::{
    view::{render_to_string, DisplayMode, ResultsView},
    MatchClient, UploadSession,
};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the matching service.
    #[arg(long, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    /// Show every candidate as a flat list instead of the carousel.
    #[arg(long)]
    list: bool,
    /// Image to upload. Without one the session starts idle.
    image: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Next,
    Previous,
    Upload(PathBuf),
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mode = if args.list {
        DisplayMode::List
    } else {
        DisplayMode::Carousel
    };
    let mut session = UploadSession::new(MatchClient::new(args.server_url), mode);
    let mut views = session.subscribe();

    session.submit(args.image);

    println!("Commands: n = next, p = previous, u <path> = upload, q = quit");
    let mut view = views.borrow().clone();
    present(&view);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                view = views.borrow_and_update().clone();
                present(&view);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(line.trim()) {
                    Some(Command::Next) => {
                        if let ResultsView::Carousel(carousel) = &mut view {
                            carousel.next();
                        }
                        present(&view);
                    }
                    Some(Command::Previous) => {
                        if let ResultsView::Carousel(carousel) = &mut view {
                            carousel.previous();
                        }
                        present(&view);
                    }
                    Some(Command::Upload(path)) => {
                        session.submit(Some(path));
                    }
                    Some(Command::Quit) => break,
                    None => {
                        println!("Commands: n = next, p = previous, u <path> = upload, q = quit");
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_command(line: &str) -> Option<Command> {
    match line {
        "n" => Some(Command::Next),
        "p" => Some(Command::Previous),
        "q" => Some(Command::Quit),
        _ => {
            let path = line.strip_prefix("u ")?.trim();
            if path.is_empty() {
                return None;
            }
            Some(Command::Upload(PathBuf::from(path)))
        }
    }
}

fn present(view: &ResultsView) {
    let frame = render_to_string(view);
    if frame.is_empty() {
        println!("(no results yet; upload with: u <path>)");
    } else {
        println!("{frame}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(parse_command("n"), Some(Command::Next));
        assert_eq!(parse_command("p"), Some(Command::Previous));
        assert_eq!(parse_command("q"), Some(Command::Quit));
    }

    #[test]
    fn parses_upload_commands_with_a_path() {
        assert_eq!(
            parse_command("u ./me.jpg"),
            Some(Command::Upload(PathBuf::from("./me.jpg")))
        );
        assert_eq!(parse_command("u "), None);
        assert_eq!(parse_command("upload"), None);
    }
}
