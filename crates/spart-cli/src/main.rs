//! `spart`: terminal chat with the Spart assistant.
//!
//! ```bash
//! spart ask "Como faço backup?"           # stream one reply
//! spart ask --no-stream --speak "Oi"      # blocking answer, read aloud
//! spart chat                              # interactive session
//! spart status                            # backend status
//! ```

mod config;
mod interrupt;
mod observability;
mod render;
mod speech;

use std::io::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use spart_chat::prelude::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, BufReader};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::interrupt::Interrupts;
use crate::speech::CommandSynthesizer;

#[derive(Parser, Debug)]
#[command(name = "spart")]
#[command(version, about = "Chat with the Spart assistant", long_about = None)]
struct Cli {
    /// Base URL of the assistant backend
    #[arg(long, env = "SPART_BASE_URL")]
    base_url: String,

    /// HTTP timeout in seconds
    #[arg(long, env = "SPART_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question
    Ask {
        question: String,

        /// Use the blocking endpoint and type the answer out
        #[arg(long)]
        no_stream: bool,

        /// Read the reply aloud
        #[arg(long)]
        speak: bool,

        /// Continue an existing session
        #[arg(long)]
        session: Option<String>,
    },
    /// Interactive chat (`/clear`, `/stop`, `/quit`)
    Chat {
        /// Read replies aloud
        #[arg(long)]
        speak: bool,

        /// Use the blocking endpoint
        #[arg(long)]
        no_stream: bool,
    },
    /// Show the backend status
    Status,
}

/// Options and shared state used by every turn of a run.
struct Frontend {
    typewriter: Typewriter,
    narrator: Option<Narrator>,
    synthesizer: Option<Arc<CommandSynthesizer>>,
    streaming: bool,
    interrupts: Interrupts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    observability::init();
    let cli = Cli::parse();
    let settings = Settings::load();

    let mut client_config = ClientConfig::new(cli.base_url.trim()).with_env_overrides()?;
    if let Some(secs) = cli.timeout_secs {
        client_config = client_config.timeout(Duration::from_secs(secs));
    }
    let client = AssistantClient::http(client_config).context("building assistant client")?;

    match cli.command {
        Command::Ask {
            question,
            no_stream,
            speak,
            session,
        } => {
            let mut frontend = Frontend::new(&settings, !no_stream, speak, Interrupts::listen())?;
            let mut conversation = match session {
                Some(id) => Conversation::with_session(client, id),
                None => Conversation::new(client),
            };
            frontend.answer(&mut conversation, &question).await?;
            if let Some(id) = conversation.session_id() {
                debug!(session_id = %id, "session");
            }
        }
        Command::Chat { speak, no_stream } => {
            let mut frontend = Frontend::new(&settings, !no_stream, speak, Interrupts::listen())?;
            let stdin = BufReader::new(tokio::io::stdin());
            chat(&mut frontend, Conversation::new(client), stdin).await?;
        }
        Command::Status => {
            let status = client.status().await?;
            render::write_status(&status, &mut io::stdout())?;
        }
    }
    Ok(())
}

impl Frontend {
    fn new(
        settings: &Settings,
        streaming: bool,
        speak: bool,
        interrupts: Interrupts,
    ) -> anyhow::Result<Self> {
        let synthesizer = if speak {
            Some(Arc::new(CommandSynthesizer::from_command_line(
                &settings.speech_command,
            )?))
        } else {
            None
        };
        let narrator = synthesizer
            .clone()
            .map(|synth| Narrator::new(synth as Arc<dyn SpeechSynthesizer>));
        Ok(Self {
            typewriter: Typewriter::new(settings.typing_delay),
            narrator,
            synthesizer,
            streaming,
            interrupts,
        })
    }

    /// Asks one question and renders the reply; speaks it when enabled.
    ///
    /// Ctrl-C ends the reply early and returns `Ok`.
    async fn answer(&mut self, conversation: &mut Conversation, question: &str) -> anyhow::Result<()> {
        let text = if self.streaming {
            match stream_reply(conversation, question, &mut self.interrupts).await {
                Ok(reply) => reply.text,
                Err(ClientError::RunFailed(ReplyFailure::Cancelled)) => {
                    eprintln!("(interrompido)");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        } else {
            let typewriter = &self.typewriter;
            let typed = async {
                let answer = conversation.ask_blocking(question).await?;
                render::write_answer(&answer, typewriter, &mut io::stdout()).await?;
                anyhow::Ok(answer.text)
            };
            tokio::select! {
                text = typed => text?,
                () = self.interrupts.recv() => {
                    debug!("ctrl-c, dropping answer");
                    println!();
                    eprintln!("(interrompido)");
                    return Ok(());
                }
            }
        };
        if let Some(narrator) = &self.narrator
            && let Err(err) = narrator.narrate(&text)
        {
            warn!(error = %err, "speech failed");
        }
        Ok(())
    }

    fn stop_speaking(&self) {
        if let Some(narrator) = &self.narrator {
            narrator.stop();
        }
    }

    fn reap_speech(&self) {
        if let Some(synthesizer) = &self.synthesizer {
            synthesizer.reap_finished();
        }
    }
}

/// Streams a turn to stdout. Ctrl-C aborts the reply instead of the process.
async fn stream_reply(
    conversation: &mut Conversation,
    question: &str,
    interrupts: &mut Interrupts,
) -> Result<AssembledReply, ClientError> {
    let mut turn = conversation.ask(question).await?;
    let abort = turn.abort_handle();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = turn.next_event() => {
                let Some(event) = event else { break };
                if let Err(err) = render::write_event(&event, &mut io::stdout()) {
                    warn!(error = %err, "stdout write failed, aborting reply");
                    abort.abort();
                }
                if event.is_terminal() {
                    break;
                }
            }
            () = interrupts.recv(), if !interrupted => {
                debug!("ctrl-c, aborting reply");
                interrupted = true;
                abort.abort();
            }
        }
    }
    turn.finish().await
}

/// Interactive loop. Ctrl-C at the prompt ends the chat.
async fn chat<R>(
    frontend: &mut Frontend,
    mut conversation: Conversation,
    input: R,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("Olá! Sou o Spart. Digite sua pergunta (/clear, /stop, /quit).");
    let mut lines = input.lines();
    loop {
        frontend.reap_speech();
        print!("Você: ");
        io::stdout().flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = frontend.interrupts.recv() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                frontend.stop_speaking();
                conversation.reset();
                println!("Nova conversa iniciada.");
            }
            "/stop" => frontend.stop_speaking(),
            question => {
                if let Err(err) = frontend.answer(&mut conversation, question).await {
                    eprintln!("Erro: {err}");
                }
            }
        }
    }
    frontend.stop_speaking();
    Ok(())
}
