//! Per-instance pass configuration.

use std::fmt;
use std::str::FromStr;

/// How `dist.all_reduce` is lowered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllReduceLowering {
    /// Replace with an identity `tensor.cast` of the input tensor.
    #[default]
    Cast,
    /// Forward the input directly, without a cast.
    Forward,
    /// Emit a `func.call @printf` marker before the cast and make sure the
    /// module declares `@printf`.
    TraceCall,
}

impl AllReduceLowering {
    pub const ALL: [AllReduceLowering; 3] = [
        AllReduceLowering::Cast,
        AllReduceLowering::Forward,
        AllReduceLowering::TraceCall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AllReduceLowering::Cast => "cast",
            AllReduceLowering::Forward => "forward",
            AllReduceLowering::TraceCall => "trace-call",
        }
    }
}

impl fmt::Display for AllReduceLowering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllReduceLowering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lowering| lowering.as_str() == s)
            .ok_or_else(|| format!("unknown all_reduce lowering `{s}`"))
    }
}

/// Options for one [`crate::DistElimPass`] instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElimConfig {
    pub all_reduce: AllReduceLowering,
    /// Run use-chain and scope validation on the module after the commit.
    pub verify_after_commit: bool,
}

impl Default for ElimConfig {
    fn default() -> Self {
        Self {
            all_reduce: AllReduceLowering::default(),
            verify_after_commit: true,
        }
    }
}

impl ElimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all_reduce(mut self, lowering: AllReduceLowering) -> Self {
        self.all_reduce = lowering;
        self
    }

    pub fn with_verify_after_commit(mut self, verify: bool) -> Self {
        self.verify_after_commit = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowering_names_parse_back() {
        for lowering in AllReduceLowering::ALL {
            assert_eq!(lowering.as_str().parse::<AllReduceLowering>(), Ok(lowering));
        }
        assert!("broadcast".parse::<AllReduceLowering>().is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ElimConfig::new()
            .with_all_reduce(AllReduceLowering::TraceCall)
            .with_verify_after_commit(false);
        assert_eq!(config.all_reduce, AllReduceLowering::TraceCall);
        assert!(!config.verify_after_commit);
        assert_eq!(ElimConfig::default().all_reduce, AllReduceLowering::Cast);
    }
}
