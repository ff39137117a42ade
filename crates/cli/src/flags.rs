use assetpack_protocol::Verbosity;
use clap::ValueEnum;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum VerbosityFlag {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl VerbosityFlag {
    pub(crate) const fn as_domain(self) -> Verbosity {
        match self {
            VerbosityFlag::Trace => Verbosity::Trace,
            VerbosityFlag::Debug => Verbosity::Debug,
            VerbosityFlag::Info => Verbosity::Info,
            VerbosityFlag::Warn => Verbosity::Warn,
            VerbosityFlag::Error => Verbosity::Error,
        }
    }
}
