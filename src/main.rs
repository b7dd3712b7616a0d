// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Proteus CLI entrypoint.
//!
//! Replays a JSONL transcript of selection and stream events against an
//! HTML document and prints the mutated markup, exactly as a host UI
//! driving the engine would have left it.

use std::error::Error;

use serde::Deserialize;

use proteus::format::html::{parse_fragment, serialize_fragment};
use proteus::model::{FixId, LiveDocument, NodePath, Selection};
use proteus::session::{ApplyPolicy, FixSession};
use proteus::store::{HistoryStore, WriteDurability};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <document.html> [<transcript.jsonl>] [--state <dir>] [--durable-writes] [--confirm-applies] [--show-history]\n\nReplays a transcript of selection and stream events against the document\nand prints the mutated markup to stdout.\n\nTranscript lines are JSON objects tagged with \"event\":\n  {{\"event\":\"select\",\"path\":[0,1]}}      begin a fix cycle (omit path for whole document)\n  {{\"event\":\"submit\",\"prompt\":\"...\"}}    log the exchange and build the outbound request\n  {{\"event\":\"chunk\",\"text\":\"...\"}}       append streamed reply content\n  {{\"event\":\"finalize\"}}                 settle the reply and extract its fragment\n  {{\"event\":\"error\",\"message\":\"...\"}}    record a transport failure\n  {{\"event\":\"confirm\"}}                  apply a parked proposal (--confirm-applies)\n  {{\"event\":\"toggle\",\"fixId\":\"f:0001\"}}  swap an applied fix's displayed side\n  {{\"event\":\"discard\",\"fixId\":\"f:0001\"}} restore the original markup\n\nIf --state is omitted, history persists in the current working directory.\n--confirm-applies parks extracted fragments until a confirm event.\n--show-history prints the conversation log after the document.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    document: Option<String>,
    transcript: Option<String>,
    state_dir: Option<String>,
    durable_writes: bool,
    confirm_applies: bool,
    show_history: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--state" => {
                if options.state_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.state_dir = Some(dir);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            "--confirm-applies" => {
                if options.confirm_applies {
                    return Err(());
                }
                options.confirm_applies = true;
            }
            "--show-history" => {
                if options.show_history {
                    return Err(());
                }
                options.show_history = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.document.is_none() {
                    options.document = Some(arg);
                } else if options.transcript.is_none() {
                    options.transcript = Some(arg);
                } else {
                    return Err(());
                }
            }
        }
    }

    if options.document.is_none() {
        return Err(());
    }

    Ok(options)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum ReplayEvent {
    Select {
        #[serde(default)]
        path: Option<Vec<usize>>,
    },
    Submit {
        prompt: String,
    },
    Chunk {
        text: String,
    },
    Finalize,
    Error {
        message: String,
    },
    Confirm,
    Toggle {
        #[serde(rename = "fixId")]
        fix_id: String,
    },
    Discard {
        #[serde(rename = "fixId")]
        fix_id: String,
    },
}

fn apply_event(session: &mut FixSession, event: ReplayEvent) -> Result<(), Box<dyn Error>> {
    match event {
        ReplayEvent::Select { path } => {
            let mut selection = Selection::new();
            selection.set_target(path.map(NodePath::new));
            session.begin_selection(&selection)?;
        }
        ReplayEvent::Submit { prompt } => {
            session.submit(&prompt)?;
        }
        ReplayEvent::Chunk { text } => session.on_chunk(&text)?,
        ReplayEvent::Finalize => {
            session.on_finalize()?;
        }
        ReplayEvent::Error { message } => session.on_error(&message)?,
        ReplayEvent::Confirm => {
            session.confirm_pending_fix()?;
        }
        ReplayEvent::Toggle { fix_id } => {
            let fix_id = FixId::new(fix_id)?;
            session.toggle_fix(&fix_id)?;
        }
        ReplayEvent::Discard { fix_id } => {
            let fix_id = FixId::new(fix_id)?;
            session.discard_fix(&fix_id)?;
        }
    }
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "proteus".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let document_path = match options.document {
            Some(path) => path,
            None => {
                print_usage(&program);
                std::process::exit(2);
            }
        };
        let markup = std::fs::read_to_string(&document_path)?;
        let document = LiveDocument::from_nodes(parse_fragment(&markup)?);

        let state_dir = options.state_dir.unwrap_or_else(|| ".".to_owned());
        let store = if options.durable_writes {
            HistoryStore::new(state_dir).with_durability(WriteDurability::Durable)
        } else {
            HistoryStore::new(state_dir)
        };

        let mut session = FixSession::new(document, store);
        if options.confirm_applies {
            session = session.with_policy(ApplyPolicy::ManualConfirm);
        }
        session.load_history()?;

        if let Some(transcript_path) = options.transcript {
            let transcript = std::fs::read_to_string(&transcript_path)?;
            for (index, line) in transcript.lines().enumerate() {
                let line_no = index + 1;
                if line.trim().is_empty() {
                    continue;
                }
                let event: ReplayEvent = serde_json::from_str(line)
                    .map_err(|err| format!("transcript line {line_no}: {err}"))?;
                apply_event(&mut session, event)
                    .map_err(|err| format!("transcript line {line_no}: {err}"))?;
                for warning in session.take_warnings() {
                    eprintln!("{program}: {warning}");
                }
            }
        }

        println!("{}", serialize_fragment(session.document().roots()));

        if options.show_history {
            println!();
            for item in session.history().items() {
                let mut line = format!("[{}] {}", item.kind, item.content);
                if item.is_streaming {
                    line.push_str(" (streaming)");
                }
                if let Some(fix) = &item.fix {
                    line.push_str(&format!(" [fix {}]", fix.fix_id));
                }
                println!("{line}");
            }
        }

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("proteus: {err}");
        std::process::exit(1);
    }
}
