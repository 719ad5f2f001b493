mod clipboard;
mod config;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use colored::Colorize;
use lexchat_cache::LocalCache;
use lexchat_session::{
    ChatSession, ClientIdentity, IdentityStore, Message, Role, SendOutcome, SendRejection,
    SessionDirectory, SessionEvent,
};
use lexchat_transport::{ChatBackend, HttpBackend, LocalAttachment};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::clipboard::Osc52Clipboard;
use crate::config::CliConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load();
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(config.transport())?);
    let cache = LocalCache::new(config.cache_dir());
    let directory = SessionDirectory::new(backend.clone(), cache, config.directory());
    let identity = IdentityStore::new(config.identity_path()).load_or_create()?;
    banner(&identity);

    let mut session = ChatSession::new(backend, directory, identity);
    session.set_clipboard(Box::new(Osc52Clipboard));

    // Tracks how much of each running total is already on screen so only
    // the fresh tail gets printed.
    let printed: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = printed.clone();
    session.set_observer(Box::new(move |event| render_event(event, &sink)));

    let mut pending_files: Vec<LocalAttachment> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let mut parts = rest.splitn(2, ' ');
            let command = parts.next().unwrap_or("");
            let argument = parts.next().unwrap_or("").trim();
            match command {
                "quit" | "q" => break,
                "attach" => attach(&mut pending_files, argument).await,
                "ask" => match session.ask(argument).await {
                    Ok(outcome) => report_rejection(outcome),
                    Err(error) => eprintln!("{} {error}", "error:".red()),
                },
                "history" => {
                    let loaded = session.load_history().await;
                    match loaded {
                        Ok(_) => render_transcript(session.messages()),
                        Err(error) => eprintln!("{} {error}", "error:".red()),
                    }
                }
                "sessions" => {
                    let user_id = session.identity().user_id.clone();
                    match session.directory().user_sessions(&user_id).await {
                        Ok(sessions) => {
                            for summary in sessions {
                                println!(
                                    "{}  {}  {}",
                                    summary.session_id.cyan(),
                                    summary.timestamp.dimmed(),
                                    summary.last_message
                                );
                            }
                        }
                        Err(error) => eprintln!("{} {error}", "error:".red()),
                    }
                }
                "resume" => {
                    let resumed = session.resume(argument).await;
                    match resumed {
                        Ok(count) => {
                            println!("{} {count} message(s)", "resumed".green());
                            render_transcript(session.messages());
                        }
                        Err(error) => eprintln!("{} {error}", "error:".red()),
                    }
                }
                "new" => match session.new_conversation() {
                    Ok(()) => println!("{} {}", "new session".green(), session.identity().session_id),
                    Err(error) => eprintln!("{} {error}", "error:".red()),
                },
                "delete" => match session.delete_conversation(argument).await {
                    Ok(()) => println!("{} {argument}", "deleted".green()),
                    Err(error) => eprintln!("{} {error}", "error:".red()),
                },
                "copy" => match session.last_assistant_content() {
                    Some(text) => {
                        let text = text.to_string();
                        session.copy_to_clipboard(&text);
                        println!("{}", "copied last reply".green());
                    }
                    None => println!("{}", "nothing to copy yet".yellow()),
                },
                _ => help(),
            }
        } else {
            let files = std::mem::take(&mut pending_files);
            match session.send(line, files).await {
                Ok(outcome) => report_rejection(outcome),
                Err(error) => eprintln!("{} {error}", "error:".red()),
            }
        }
        prompt();
    }

    Ok(())
}

fn banner(identity: &ClientIdentity) {
    println!(
        "{}  {}  {}",
        "lexchat".bold(),
        identity.user_id.dimmed(),
        identity.session_id.dimmed()
    );
    println!("{}", "type a message, or /help for commands".dimmed());
}

fn help() {
    println!("commands:");
    println!("  /attach <path>   queue a file for the next message");
    println!("  /ask <text>      one-shot question without streaming");
    println!("  /history         reload and print this session's transcript");
    println!("  /sessions        list your recent sessions");
    println!("  /resume <id>     switch to an existing session");
    println!("  /new             start a fresh session");
    println!("  /delete <id>     delete a stored session");
    println!("  /copy            copy the last reply to the clipboard");
    println!("  /quit            exit");
}

fn prompt() {
    print!("{} ", ">".dimmed());
    let _ = std::io::stdout().flush();
}

async fn attach(pending: &mut Vec<LocalAttachment>, path: &str) {
    if path.is_empty() {
        println!("{}", "usage: /attach <path>".yellow());
        return;
    }
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let path = Path::new(path);
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("attachment")
                .to_string();
            println!("{} {name} ({} bytes)", "queued".green(), bytes.len());
            pending.push(LocalAttachment {
                mime_type: mime_for(path).to_string(),
                name,
                bytes,
            });
        }
        Err(error) => eprintln!("{} could not read {path}: {error}", "error:".red()),
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "doc" | "docx" => "application/msword",
        _ => "application/octet-stream",
    }
}

fn report_rejection(outcome: SendOutcome) {
    if let SendOutcome::Rejected(reason) = outcome {
        let text = match reason {
            SendRejection::EmptyInput => "nothing to send",
            SendRejection::SendInProgress => "a reply is still in flight",
            SendRejection::MissingIdentity => "no client identity available",
        };
        println!("{} {text}", "note:".yellow());
    }
}

fn render_transcript(messages: &[Message]) {
    for message in messages {
        let label = match message.role {
            Role::User => "you:".cyan().bold(),
            Role::Assistant => "assistant:".green().bold(),
        };
        println!("{label} {}", message.content);
        for file in &message.files {
            println!("  {} {} ({} bytes)", "attachment".dimmed(), file.name, file.size);
        }
    }
}

fn render_event(event: &SessionEvent, printed: &Arc<Mutex<HashMap<String, usize>>>) {
    match event {
        SessionEvent::MessageAppended(id) => {
            if id.as_str().starts_with("msg_") {
                print!("{} ", "assistant:".green().bold());
                let _ = std::io::stdout().flush();
            }
        }
        SessionEvent::AssistantContentUpdated { id, content } => {
            if let Ok(mut printed) = printed.lock() {
                let seen = printed.entry(id.to_string()).or_insert(0);
                if content.len() > *seen {
                    print!("{}", &content[*seen..]);
                    let _ = std::io::stdout().flush();
                    *seen = content.len();
                }
            }
        }
        SessionEvent::StreamCompleted(id) => {
            println!();
            if let Ok(mut printed) = printed.lock() {
                printed.remove(id.as_str());
            }
        }
        SessionEvent::StreamFailed { id, notice } => {
            println!();
            println!("{} {notice}", "reply failed:".red().bold());
            if let Ok(mut printed) = printed.lock() {
                printed.remove(id.as_str());
            }
        }
        SessionEvent::Notice(text) => println!("{} {text}", "note:".yellow()),
    }
}
