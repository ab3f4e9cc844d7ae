//! Optional CLI flags supported by a given `llama-cli` build.
//!
//! Different builds and versions of the external binary expose different flag
//! sets. The runtime discovers them by scanning `--help` output for known
//! tokens; this module holds the pure part of that detection.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Known optional flags. Declaration order is the order in which the
    /// command builder appends them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CapabilityFlags: u32 {
        /// Nucleus sampling threshold (`--top-p`).
        const TOP_P = 0b0000_0001;
        /// Suppress echoing the prompt (`--no-display-prompt`).
        const NO_DISPLAY_PROMPT = 0b0000_0010;
        /// Disable memory-mapping the model (`--no-mmap`).
        const NO_MMAP = 0b0000_0100;
        /// Exit after one response instead of entering interactive mode (`--single-turn`).
        const SINGLE_TURN = 0b0000_1000;
        /// Disable conversation mode (`-no-cnv`).
        const NO_CONVERSATION = 0b0001_0000;
    }
}

/// Help-text substrings that reveal each capability.
const PROBE_TOKENS: &[(CapabilityFlags, &[&str])] = &[
    (CapabilityFlags::TOP_P, &["--top-p"]),
    (CapabilityFlags::NO_DISPLAY_PROMPT, &["--no-display-prompt"]),
    (CapabilityFlags::NO_MMAP, &["--no-mmap"]),
    (CapabilityFlags::SINGLE_TURN, &["--single-turn"]),
    (CapabilityFlags::NO_CONVERSATION, &["--no-conversation", "-no-cnv"]),
];

/// Set of optional flags discovered for one invocation of the binary.
///
/// Created fresh per query and discarded once the argument vector is built;
/// never cached, because the binary can be swapped at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    flags: CapabilityFlags,
}

impl CapabilitySet {
    /// The maximally-compatible set: no optional flags at all.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            flags: CapabilityFlags::empty(),
        }
    }

    /// Wrap an explicit flag set.
    #[must_use]
    pub const fn from_flags(flags: CapabilityFlags) -> Self {
        Self { flags }
    }

    /// Detect capabilities by substring search over help output.
    #[must_use]
    pub fn from_help_text(help: &str) -> Self {
        let flags = PROBE_TOKENS
            .iter()
            .filter(|(_, tokens)| tokens.iter().any(|t| help.contains(t)))
            .fold(CapabilityFlags::empty(), |acc, (flag, _)| acc | *flag);
        Self { flags }
    }

    /// Whether the given capability is present.
    #[must_use]
    pub const fn supports(&self, flag: CapabilityFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Raw flags.
    #[must_use]
    pub const fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    /// Whether no optional capability was detected.
    #[must_use]
    pub const fn is_minimal(&self) -> bool {
        self.flags.is_empty()
    }

    /// Human-readable names of the detected capabilities, in builder order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.flags.iter_names().map(|(name, _)| name).collect()
    }
}
