//! CLI surface (spec.md §6.2), consumed only as the initial-parameter
//! source for [`crate::params::Parameters`] and logging setup. Structured
//! the way the teacher pack's `dd6ds-cw-qso-sim::config::Cli` lays out a
//! `clap::Parser` struct, minus the TOML file layer — the original
//! cwdaemon has no config file, CLI + built-in defaults only.

use clap::Parser;

use crate::params::{self, Parameters, SoundSystem};

#[derive(Parser, Debug)]
#[command(name = "cwdaemon-rs", about = "UDP-controlled CW keying daemon", version)]
pub struct Cli {
    /// UDP port to listen on
    #[arg(short = 'p', long, default_value_t = params::DEFAULT_NETWORK_PORT)]
    pub port: u16,

    /// Morse speed in words per minute
    #[arg(short = 's', long = "wpm", default_value_t = params::DEFAULT_MORSE_SPEED)]
    pub wpm: u8,

    /// PTT turn-on delay in milliseconds (0..50)
    #[arg(short = 't', long = "pttdelay", default_value_t = params::DEFAULT_PTT_DELAY_MS)]
    pub ptt_delay: u32,

    /// Sidetone frequency in Hz (0 = off)
    #[arg(short = 'T', long = "tone", default_value_t = params::DEFAULT_TONE_HZ)]
    pub tone: u16,

    /// Sidetone volume, percent
    #[arg(short = 'v', long, default_value_t = params::DEFAULT_VOLUME_PCT)]
    pub volume: u8,

    /// Weighting, -50..50
    #[arg(short = 'w', long, default_value_t = params::DEFAULT_WEIGHTING)]
    pub weighting: i8,

    /// Sound backend: n(one) c(onsole) o(ss) a(lsa) p(ulseaudio) s(oundcard)
    #[arg(short = 'x', long = "system", default_value = "n")]
    pub system: char,

    /// Keying device name or path (tty, parport, or "null")
    #[arg(short = 'd', long, default_value = "null")]
    pub cwdevice: String,

    /// Serial pin assignment, repeatable: key=dtr|rts|none, ptt=dtr|rts|none
    #[arg(short = 'o', long = "options")]
    pub options: Vec<String>,

    /// Run in the foreground instead of daemonizing
    #[arg(short = 'n', long)]
    pub nofork: bool,

    /// Process scheduling priority, -20..20
    #[arg(short = 'P', long)]
    pub priority: Option<i32>,

    /// Log verbosity: n(one) e(rror) w(arn) i(nfo) d(ebug)
    #[arg(short = 'y', long, default_value = "w")]
    pub verbosity: char,

    /// Pass extra flags through to the tone library
    #[arg(short = 'I', long = "libcwflags")]
    pub libcwflags: Option<String>,

    /// Where to send log output: stdout, stderr, or a file path
    #[arg(short = 'f', long, default_value = "stderr")]
    pub debugfile: String,
}

impl Cli {
    pub fn verbosity_filter(&self) -> &'static str {
        match self.verbosity {
            'n' => "off",
            'e' => "error",
            'w' => "warn",
            'i' => "info",
            'd' => "debug",
            _ => "warn",
        }
    }

    /// Parse `key=value`/`ptt=value` pairs, handing each back as
    /// `(key, value)` for the serial driver to consume (spec.md §6.2,
    /// §6.3). Malformed entries are skipped rather than rejected — the
    /// whole CLI surface is out of core scope.
    pub fn parsed_options(&self) -> Vec<(String, String)> {
        self.options
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Build the startup [`Parameters`] set (the "defaults" half of
    /// spec.md §3). Out-of-range CLI values fall back to the library
    /// default rather than panicking — this mirrors the protocol's own
    /// silent-noop-on-out-of-range policy (§4.1).
    pub fn to_parameters(&self) -> Parameters {
        let mut params = Parameters {
            sound_system: SoundSystem::from_letter(self.system as u8).unwrap_or_default(),
            ..Parameters::default()
        };
        if !params.set_speed(self.wpm) {
            tracing::warn!(wpm = self.wpm, "CLI speed out of range, using default");
        }
        if !params.set_tone(self.tone, params::DEFAULT_VOLUME_PCT) {
            tracing::warn!(tone = self.tone, "CLI tone out of range, using default");
        }
        params.set_volume(self.volume);
        params.set_weighting(self.weighting);
        params.set_ptt_delay_ms(self.ptt_delay);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_options_splits_key_value() {
        let cli = Cli {
            port: params::DEFAULT_NETWORK_PORT,
            wpm: params::DEFAULT_MORSE_SPEED,
            ptt_delay: 0,
            tone: params::DEFAULT_TONE_HZ,
            volume: params::DEFAULT_VOLUME_PCT,
            weighting: 0,
            system: 'n',
            cwdevice: "null".into(),
            options: vec!["key=dtr".into(), "ptt=rts".into(), "garbage".into()],
            nofork: false,
            priority: None,
            verbosity: 'w',
            libcwflags: None,
            debugfile: "stderr".into(),
        };
        let opts = cli.parsed_options();
        assert_eq!(opts, vec![("key".into(), "dtr".into()), ("ptt".into(), "rts".into())]);
    }

    #[test]
    fn verbosity_letters_map_to_filters() {
        let mut cli_base = Cli {
            port: params::DEFAULT_NETWORK_PORT,
            wpm: params::DEFAULT_MORSE_SPEED,
            ptt_delay: 0,
            tone: params::DEFAULT_TONE_HZ,
            volume: params::DEFAULT_VOLUME_PCT,
            weighting: 0,
            system: 'n',
            cwdevice: "null".into(),
            options: vec![],
            nofork: false,
            priority: None,
            verbosity: 'd',
            libcwflags: None,
            debugfile: "stderr".into(),
        };
        assert_eq!(cli_base.verbosity_filter(), "debug");
        cli_base.verbosity = 'n';
        assert_eq!(cli_base.verbosity_filter(), "off");
    }
}
