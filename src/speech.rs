use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::logging;
use crate::settings::{Settings, TTS_PRESET_LIST};

/// Language tag every utterance carries.
pub const UTTERANCE_LANG: &str = "fr-FR";

/// French voices edge-tts ships with; the engine has no cheap listing command.
const EDGE_FRENCH_VOICES: &[&str] = &[
    "fr-FR-DeniseNeural",
    "fr-FR-HenriNeural",
    "fr-FR-EloiseNeural",
    "fr-FR-RemyMultilingualNeural",
    "fr-FR-VivienneMultilingualNeural",
    "fr-CA-SylvieNeural",
    "fr-BE-CharlineNeural",
    "fr-CH-ArianeNeural",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Value handed to the engine's voice flag.
    pub id: String,
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn is_french(&self) -> bool {
        let lang = self.lang.to_lowercase();
        lang == "fr" || lang.starts_with("fr-") || lang.starts_with("fr_")
    }

    /// Plain `fr` or `fr-FR`, as opposed to a regional variant.
    pub fn is_france_french(&self) -> bool {
        let lang = self.lang.to_lowercase().replace('_', "-");
        lang == "fr" || lang == "fr-fr"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
}

/// French voice from a preferred provider, else a France French voice, else
/// any French voice, else none.
pub fn select_voice<'a>(voices: &'a [Voice], providers: &[String]) -> Option<&'a Voice> {
    let french = || voices.iter().filter(|v| v.is_french());
    french()
        .find(|v| {
            providers
                .iter()
                .any(|p| !p.is_empty() && v.name.to_lowercase().contains(&p.to_lowercase()))
        })
        .or_else(|| french().find(|v| v.is_france_french()))
        .or_else(|| french().next())
}

pub trait SpeechEngine {
    fn voices(&mut self) -> Vec<Voice>;
    /// Start playback and return without waiting for it to finish.
    fn speak(&mut self, utterance: &Utterance) -> eyre::Result<()>;
    fn cancel(&mut self);
    fn is_speaking(&mut self) -> bool;
}

/// Pronounces selected words. Holds at most one utterance in flight.
pub struct SpeechTrigger {
    engine: Option<Box<dyn SpeechEngine>>,
    providers: Vec<String>,
    voices: Option<Vec<Voice>>,
    catalog: Option<Receiver<Vec<Voice>>>,
}

impl SpeechTrigger {
    pub fn new(engine: Option<Box<dyn SpeechEngine>>, providers: Vec<String>) -> Self {
        Self {
            engine,
            providers,
            voices: None,
            catalog: None,
        }
    }

    /// Voices arrive on `catalog` later; until then the engine's default voice is used.
    pub fn with_catalog(
        engine: Box<dyn SpeechEngine>,
        providers: Vec<String>,
        catalog: Receiver<Vec<Voice>>,
    ) -> Self {
        Self {
            engine: Some(engine),
            providers,
            voices: None,
            catalog: Some(catalog),
        }
    }

    /// Detect an engine and list its voices on a background thread.
    pub fn from_settings(settings: &Settings) -> Self {
        let providers = settings.preferred_voice_providers.clone();
        let Some(engine) = CommandEngine::detect(
            settings.preferred_tts_engine.as_deref(),
            settings.tts_engine_args.clone(),
        ) else {
            return Self::new(None, providers);
        };

        let kind = engine.kind.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(kind.voices());
        });
        Self::with_catalog(Box::new(engine), providers, rx)
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Fire and forget. Failures are logged, never returned.
    pub fn speak(&mut self, word: &str) {
        let Some(engine) = self.engine.as_mut() else {
            logging::debug("No speech engine available");
            return;
        };
        engine.cancel();

        if self.voices.is_none() {
            self.voices = match self.catalog.as_ref() {
                Some(catalog) => match catalog.try_recv() {
                    Ok(voices) => Some(voices),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(Vec::new()),
                },
                None => Some(engine.voices()),
            };
            if self.voices.is_some() {
                self.catalog = None;
            }
        }
        let utterance = Utterance {
            text: word.trim().to_string(),
            lang: UTTERANCE_LANG.to_string(),
            voice: self
                .voices
                .as_deref()
                .and_then(|voices| select_voice(voices, &self.providers))
                .cloned(),
        };
        if let Err(err) = engine.speak(&utterance) {
            logging::warn(format!("Speech failed for '{}': {err}", utterance.text));
        }
    }

    pub fn cancel(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
    }
}

impl Drop for SpeechTrigger {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineKind {
    EdgePlayback,
    /// `espeak` or `espeak-ng`.
    Espeak(String),
    Say,
    /// A command line where `{}` stands for the text; without it the text is appended.
    Custom(String),
}

impl EngineKind {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "edge-playback" => EngineKind::EdgePlayback,
            "espeak" | "espeak-ng" => EngineKind::Espeak(name.trim().to_string()),
            "say" => EngineKind::Say,
            other => EngineKind::Custom(other.to_string()),
        }
    }

    pub fn program(&self) -> Option<String> {
        match self {
            EngineKind::EdgePlayback => Some("edge-playback".to_string()),
            EngineKind::Espeak(program) => Some(program.clone()),
            EngineKind::Say => Some("say".to_string()),
            EngineKind::Custom(template) => template.split_whitespace().next().map(str::to_string),
        }
    }

    /// The voices this engine offers. Runs the engine's listing command, so
    /// it can take a while.
    pub fn voices(&self) -> Vec<Voice> {
        match self {
            EngineKind::EdgePlayback => EDGE_FRENCH_VOICES
                .iter()
                .map(|name| Voice {
                    id: name.to_string(),
                    name: name.to_string(),
                    lang: name.splitn(3, '-').take(2).collect::<Vec<_>>().join("-"),
                })
                .collect(),
            EngineKind::Espeak(program) => list_voices(program, &["--voices=fr"])
                .map(|out| parse_espeak_voices(&out))
                .unwrap_or_default(),
            EngineKind::Say => list_voices("say", &["-v", "?"])
                .map(|out| parse_say_voices(&out))
                .unwrap_or_default(),
            EngineKind::Custom(_) => Vec::new(),
        }
    }
}

fn list_voices(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Speaks by spawning an external TTS program in its own process group.
pub struct CommandEngine {
    kind: EngineKind,
    extra_args: Vec<String>,
    child: Option<Child>,
}

impl CommandEngine {
    pub fn new(kind: EngineKind, extra_args: Vec<String>) -> Self {
        Self {
            kind,
            extra_args,
            child: None,
        }
    }

    /// Use the configured engine, or search `PATH` for a known one.
    pub fn detect(preferred: Option<&str>, extra_args: Vec<String>) -> Option<Self> {
        let kind = match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => EngineKind::parse(name),
            None => TTS_PRESET_LIST
                .iter()
                .find(|program| find_in_path(program).is_some())
                .map(|program| EngineKind::parse(program))?,
        };

        let program = kind.program()?;
        if find_in_path(&program).is_none() {
            logging::warn(format!("Speech engine '{program}' not found in PATH"));
            return None;
        }
        logging::info(format!("Using speech engine '{program}'"));
        Some(Self::new(kind, extra_args))
    }

    pub fn build_command(&self, utterance: &Utterance) -> Option<(String, Vec<String>)> {
        let text = utterance.text.clone();
        let voice = utterance.voice.as_ref().map(|v| v.id.clone());
        let mut args = self.extra_args.clone();

        let program = match &self.kind {
            EngineKind::EdgePlayback => {
                if let Some(voice) = voice {
                    args.extend(["--voice".to_string(), voice]);
                }
                args.extend(["--text".to_string(), text]);
                "edge-playback".to_string()
            }
            EngineKind::Espeak(program) => {
                let lang = utterance.lang.split(['-', '_']).next().unwrap_or("fr");
                args.extend(["-v".to_string(), voice.unwrap_or_else(|| lang.to_string())]);
                args.push(text);
                program.clone()
            }
            EngineKind::Say => {
                if let Some(voice) = voice {
                    args.extend(["-v".to_string(), voice]);
                }
                args.push(text);
                "say".to_string()
            }
            EngineKind::Custom(template) => {
                let mut parts = template.split_whitespace();
                let program = parts.next()?.to_string();
                let mut templated: Vec<String> = parts
                    .map(|part| part.replace("{}", &text))
                    .collect();
                if !template.contains("{}") {
                    templated.push(text);
                }
                args.extend(templated);
                program
            }
        };
        Some((program, args))
    }

}

impl SpeechEngine for CommandEngine {
    fn voices(&mut self) -> Vec<Voice> {
        self.kind.voices()
    }

    fn speak(&mut self, utterance: &Utterance) -> eyre::Result<()> {
        let (program, args) = self
            .build_command(utterance)
            .ok_or_else(|| eyre::eyre!("Empty speech command"))?;

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let child = cmd.spawn()?;
        logging::debug(format!("Speaking '{}' with {program} (pid {})", utterance.text, child.id()));
        self.child = Some(child);
        Ok(())
    }

    /// Kill the whole process group so helpers such as mpv die with it.
    fn cancel(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        #[cfg(unix)]
        unsafe {
            libc::kill(-(child.id() as i32), libc::SIGKILL);
        }
        let _ = child.kill();
        let _ = child.wait();
    }

    fn is_speaking(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Parse `espeak --voices` output: `Pty Language Age/Gender VoiceName File ...`.
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(Voice {
                id: cols[1].to_string(),
                name: cols[3].replace('_', " "),
                lang: cols[1].to_string(),
            })
        })
        .collect()
}

/// Parse `say -v ?` output: `Name   fr_FR    # sample sentence`.
pub fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim_end();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || lang.is_empty() {
                return None;
            }
            Some(Voice {
                id: name.to_string(),
                name: name.to_string(),
                lang: lang.replace('_', "-"),
            })
        })
        .collect()
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
