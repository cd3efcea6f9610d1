//! Native platform TTS engine
//!
//! Drives the platform's own speech front end as a child process and waits
//! for it to finish, so each utterance is fully spoken before `speak` returns.

use crate::config::VoiceConfig;
use crate::engines::{sanitize_text, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest voice list returned
const MAX_VOICES: usize = 1000;

/// Native TTS engine (platform-specific)
pub struct NativeTtsEngine {
    available: bool,
    rate: u32,
    volume: f32,
    pitch: f32,
}

#[async_trait]
impl TtsEngine for NativeTtsEngine {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Engine("Native TTS engine not available".to_string()));
        }

        let text = sanitize_text(text)?;
        let mut cmd = self.speak_command(&text, voice)?;
        debug!("Speaking {:?}", text);

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to run TTS front end: {}", e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "TTS front end failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        if !self.available {
            return Ok(vec![]);
        }

        let output = platform::list_voices_command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to list voices: {}", e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine("Failed to list voices".to_string()));
        }

        let mut voices = platform::parse_voices(&String::from_utf8_lossy(&output.stdout));
        voices.retain(|v| v.len() <= 256 && !v.chars().any(|c| c.is_control()));
        voices.truncate(MAX_VOICES);
        Ok(voices)
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

impl NativeTtsEngine {
    pub fn new() -> Self {
        Self::new_with_config(150, 0.8, 0.0)
    }

    pub fn new_with_config(rate: u32, volume: f32, pitch: f32) -> Self {
        let available = platform::probe();
        if available {
            info!("Native TTS engine initialized ({})", platform::FRONT_END);
        } else {
            warn!("Native TTS front end {} not found", platform::FRONT_END);
        }

        Self {
            available,
            rate,
            volume,
            pitch,
        }
    }

    fn speak_command(&self, text: &str, voice: &VoiceConfig) -> Result<Command, SpeechError> {
        platform::speak_command(text, voice, self.rate, self.volume, self.pitch)
    }
}

impl Default for NativeTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only characters that are safe in a voice name
fn sanitize_voice_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_' || *c == '.')
        .take(256)
        .collect()
}

/// espeak-ng amplitude (0-200, 100 is normal) from a 0.0-1.0 volume
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn espeak_amplitude(volume: f32) -> u32 {
    ((volume.clamp(0.0, 1.0) * 200.0).round() as u32).min(200)
}

/// espeak-ng pitch (0-99, 50 is normal) from a -1.0..1.0 adjustment
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn espeak_pitch(pitch: f32) -> u32 {
    ((50.0 + pitch.clamp(-1.0, 1.0) * 49.0).round() as u32).min(99)
}

/// System.Speech rate (-10..10, 0 is normal) from words per minute
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn sapi_rate(rate: u32) -> i32 {
    ((rate as i32 - 150) / 15).clamp(-10, 10)
}

#[cfg(target_os = "macos")]
mod platform {
    use super::*;

    pub const FRONT_END: &str = "say";

    pub fn probe() -> bool {
        std::process::Command::new("say")
            .arg("-v")
            .arg("?")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn speak_command(
        text: &str,
        voice: &VoiceConfig,
        rate: u32,
        _volume: f32,
        _pitch: f32,
    ) -> Result<Command, SpeechError> {
        let mut cmd = Command::new("say");
        if let Some(ref name) = voice.name {
            let name = sanitize_voice_name(name);
            if !name.is_empty() {
                cmd.arg("-v").arg(name);
            }
        }
        // say has no volume or pitch flags
        cmd.arg("-r").arg(rate.min(500).to_string());
        cmd.arg(text);
        Ok(cmd)
    }

    pub fn list_voices_command() -> Command {
        let mut cmd = Command::new("say");
        cmd.arg("-v").arg("?");
        cmd
    }

    /// Lines look like `Alex    en_US    # Most people recognize me by my voice.`
    pub fn parse_voices(output: &str) -> Vec<String> {
        output
            .lines()
            .filter_map(|line| line.split('#').next())
            .filter_map(|line| line.split_whitespace().next())
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;

    pub const FRONT_END: &str = "espeak-ng";

    pub fn probe() -> bool {
        std::process::Command::new("espeak-ng")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn speak_command(
        text: &str,
        voice: &VoiceConfig,
        rate: u32,
        volume: f32,
        pitch: f32,
    ) -> Result<Command, SpeechError> {
        let mut cmd = Command::new("espeak-ng");
        cmd.arg("-s").arg(rate.to_string());
        cmd.arg("-a").arg(espeak_amplitude(volume).to_string());
        cmd.arg("-p").arg(espeak_pitch(pitch).to_string());

        let selected = voice
            .name
            .as_deref()
            .map(sanitize_voice_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| voice.language.to_lowercase());
        if !selected.is_empty() {
            cmd.arg("-v").arg(selected);
        }

        cmd.arg(text);
        Ok(cmd)
    }

    pub fn list_voices_command() -> Command {
        let mut cmd = Command::new("espeak-ng");
        cmd.arg("--voices");
        cmd
    }

    /// Columns: Pty Language Age/Gender VoiceName File Other Languages
    pub fn parse_voices(output: &str) -> Vec<String> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;

    pub const FRONT_END: &str = "System.Speech";

    pub fn probe() -> bool {
        std::process::Command::new("powershell")
            .args(["-NoProfile", "-Command", "Add-Type -AssemblyName System.Speech"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Single quotes are the only special character inside a PowerShell single-quoted string
    fn quote(s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    pub fn speak_command(
        text: &str,
        voice: &VoiceConfig,
        rate: u32,
        volume: f32,
        _pitch: f32,
    ) -> Result<Command, SpeechError> {
        let mut script = String::from(
            "Add-Type -AssemblyName System.Speech; \
             $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; ",
        );
        if let Some(ref name) = voice.name {
            let name = sanitize_voice_name(name);
            if !name.is_empty() {
                script.push_str(&format!("$s.SelectVoice({}); ", quote(&name)));
            }
        }
        script.push_str(&format!(
            "$s.Rate = {}; $s.Volume = {}; $s.Speak({}); $s.Dispose()",
            sapi_rate(rate),
            (volume.clamp(0.0, 1.0) * 100.0).round() as u32,
            quote(text)
        ));

        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command"]).arg(script);
        Ok(cmd)
    }

    pub fn list_voices_command() -> Command {
        let mut cmd = Command::new("powershell");
        cmd.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Add-Type -AssemblyName System.Speech; \
             (New-Object System.Speech.Synthesis.SpeechSynthesizer).GetInstalledVoices() | \
             ForEach-Object { $_.VoiceInfo.Name }",
        ]);
        cmd
    }

    pub fn parse_voices(output: &str) -> Vec<String> {
        output
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect()
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
mod platform {
    use super::*;

    pub const FRONT_END: &str = "none";

    pub fn probe() -> bool {
        false
    }

    pub fn speak_command(
        _text: &str,
        _voice: &VoiceConfig,
        _rate: u32,
        _volume: f32,
        _pitch: f32,
    ) -> Result<Command, SpeechError> {
        Err(SpeechError::Engine("Native TTS not supported on this platform".to_string()))
    }

    pub fn list_voices_command() -> Command {
        Command::new("true")
    }

    pub fn parse_voices(_output: &str) -> Vec<String> {
        vec![]
    }
}
