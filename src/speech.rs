//! # Spoken Playback
//!
//! Optional text-to-speech for returned descriptions, via the platform's TTS
//! command. Prefers a Spanish voice when one is installed, since the default
//! instruction prompt asks the model for Spanish, and falls back to the
//! system default voice otherwise.
//!
//! Playback is best-effort: a missing TTS command is a warning, never a
//! failed session.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::{DescribeError, DescribeResult};

/// Speak `text` aloud, returning an error if no TTS backend worked.
pub async fn speak(text: &str) -> DescribeResult<()> {
    #[cfg(target_os = "linux")]
    return speak_espeak(text).await;
    #[cfg(target_os = "macos")]
    return speak_say(text).await;
    #[cfg(target_os = "windows")]
    return speak_sapi(text).await;

    #[allow(unreachable_code)]
    {
        let _ = text;
        Err(DescribeError::speech("no TTS backend for this platform"))
    }
}

/// Speak `text`, downgrading any failure to a stderr warning.
pub async fn speak_best_effort(text: &str) {
    if let Err(e) = speak(text).await {
        eprintln!("Warning: {e}");
    }
}

#[cfg(target_os = "linux")]
async fn speak_espeak(text: &str) -> DescribeResult<()> {
    // espeak-ng ships a Spanish voice as "es"; older systems only have espeak.
    for command in ["espeak-ng", "espeak"] {
        let status = Command::new(command)
            .args(["-v", "es"])
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => return Ok(()),
            _ => continue,
        }
    }
    Err(DescribeError::speech(
        "no working espeak-ng/espeak installation found",
    )
    .with_recovery_suggestion("Install espeak-ng, or run with --no-speak"))
}

#[cfg(target_os = "macos")]
async fn speak_say(text: &str) -> DescribeResult<()> {
    let voice = spanish_say_voice().await;

    let mut command = Command::new("say");
    if let Some(voice) = &voice {
        command.args(["-v", voice]);
    }
    let status = command
        .arg(text)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| DescribeError::speech(format!("failed to run say: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(DescribeError::speech(format!("say exited with {status}")))
    }
}

/// First installed `say` voice with a Spanish locale, if any.
#[cfg(target_os = "macos")]
async fn spanish_say_voice() -> Option<String> {
    let out = Command::new("say")
        .args(["-v", "?"])
        .output()
        .await
        .ok()?;
    let listing = String::from_utf8_lossy(&out.stdout);
    listing.lines().find_map(|line| {
        if line.contains("es_") {
            line.split_whitespace().next().map(str::to_string)
        } else {
            None
        }
    })
}

#[cfg(target_os = "windows")]
async fn speak_sapi(text: &str) -> DescribeResult<()> {
    // SAPI via PowerShell; SelectVoiceByHints picks a Spanish voice when
    // one is installed and leaves the default otherwise.
    let script = format!(
        "Add-Type -AssemblyName System.Speech; \
         $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
         try {{ $s.SelectVoiceByHints('NotSet', 'NotSet', 0, [System.Globalization.CultureInfo]'es-ES') }} catch {{}}; \
         $s.Speak('{}')",
        text.replace('\'', "''")
    );
    let status = Command::new("powershell")
        .args(["-NoProfile", "-Command", &script])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| DescribeError::speech(format!("failed to run powershell: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(DescribeError::speech(format!(
            "powershell TTS exited with {status}"
        )))
    }
}
