use std::fmt;

use crate::error::BuildError;

/// Programa más argumentos; se ejecuta sin shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self { program: program.into(),
               args: args.iter().map(|a| a.to_string()).collect() }
    }

    /// Separa por espacios; no interpreta comillas.
    pub fn parse(line: &str, what: &'static str) -> Result<Self, BuildError> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(BuildError::EmptyCommand(what))?;
        Ok(Self { program,
                  args: parts.collect() })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
