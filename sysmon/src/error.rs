use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("collector {0} was started without captured {1}")]
    MissingPipe(String, &'static str),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SupervisorError {
    pub(crate) fn spawn<S: Into<String>>(program: S, source: io::Error) -> Self {
        SupervisorError::Spawn {
            program: program.into(),
            source,
        }
    }

    pub(crate) fn missing_pipe<S: Into<String>>(program: S, pipe: &'static str) -> Self {
        SupervisorError::MissingPipe(program.into(), pipe)
    }
}
