//! Terminal rendering of replies, answers and service status.

use std::io::{self, Write};

use spart_chat::{Answer, AssembledReply, ReplyEvent, ServiceStatus, Typewriter};
use tracing::debug;

pub const BOT_LABEL: &str = "Spart";

/// Writes one reply event. Text deltas are flushed immediately.
pub fn write_event<W: Write>(event: &ReplyEvent, out: &mut W) -> io::Result<()> {
    match event {
        ReplyEvent::Started { request_id, .. } => {
            debug!(request_id = %request_id, "reply started");
            write!(out, "{BOT_LABEL}: ")?;
        }
        ReplyEvent::TextDelta { delta, .. } => write!(out, "{delta}")?,
        ReplyEvent::SessionUpdated { session_id, .. } => {
            debug!(session_id = %session_id, "session updated");
        }
        ReplyEvent::Completed { reply, .. } => {
            writeln!(out)?;
            write_attachments(reply, out)?;
        }
        ReplyEvent::Failed { .. } => writeln!(out)?,
    }
    out.flush()
}

pub fn write_attachments<W: Write>(reply: &AssembledReply, out: &mut W) -> io::Result<()> {
    for attachment in &reply.attachments {
        if attachment.alt_text.trim().is_empty() {
            writeln!(out, "  [image] {}", attachment.url)?;
        } else {
            writeln!(out, "  [image] {} <{}>", attachment.alt_text, attachment.url)?;
        }
    }
    Ok(())
}

/// Writes a non-streamed answer through the typewriter, then its side notes.
pub async fn write_answer<W: Write>(
    answer: &Answer,
    typewriter: &Typewriter,
    out: &mut W,
) -> io::Result<()> {
    write!(out, "{BOT_LABEL}: ")?;
    typewriter.write_to(&answer.text, out).await?;
    writeln!(out)?;
    if let Some(audio) = answer.audio_link() {
        writeln!(out, "  [audio] {audio}")?;
    }
    for note in answer.notes() {
        writeln!(out, "  {note}")?;
    }
    if let Some(manual) = answer.manual_link() {
        writeln!(out, "  Manual: {manual}")?;
    }
    out.flush()
}

pub fn write_status<W: Write>(status: &ServiceStatus, out: &mut W) -> io::Result<()> {
    writeln!(out, "status: {} (version {})", status.status, status.version)?;
    if let Some(description) = status.description.as_deref() {
        writeln!(out, "{description}")?;
    }
    let mut endpoints: Vec<_> = status.endpoints.iter().collect();
    endpoints.sort();
    for (name, path) in endpoints {
        writeln!(out, "  {name}: {path}")?;
    }
    for feature in &status.features {
        writeln!(out, "  - {feature}")?;
    }
    Ok(())
}
