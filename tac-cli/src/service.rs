//! Execution service: compile once, run many times.
//!
//! Compiling stores a verified [`Executable`] under an [`ArtifactHandle`]
//! derived from the program text. Each run gets fresh frames, memory and
//! output, so one artifact can be executed repeatedly (or from several
//! threads through a shared `&Service`).

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tac_assembler::AsmError;
use tac_common::Executable;
use tac_verifier::{Location, VerifyError};
use tac_vm::{RunOutput, RuntimeError, VmConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// Hex digits kept from the program digest (48 bits).
const HANDLE_HEX_LEN: usize = 12;

/// Identifies a compiled artifact.
///
/// The first 48 bits of the blake3 digest of the program text, in hex.
/// Compiling identical text yields the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn for_text(text: &str) -> Self {
        Self::from_digest(&blake3::hash(text.as_bytes()))
    }

    fn from_digest(digest: &blake3::Hash) -> Self {
        ArtifactHandle(digest.to_hex().as_str()[..HANDLE_HEX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which stage rejected a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    SyntaxError,
    DeclarationError,
    TypeError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::SyntaxError => "syntax error",
            DiagnosticKind::DeclarationError => "declaration error",
            DiagnosticKind::TypeError => "type error",
        })
    }
}

/// Why a program was rejected, with whatever location is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub function: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl From<&AsmError> for Diagnostic {
    fn from(error: &AsmError) -> Self {
        let line = error.line();
        let text = error.to_string();
        let message = match text.strip_prefix(&format!("line {line}: ")) {
            Some(rest) => rest.to_string(),
            None => text,
        };
        Diagnostic {
            kind: DiagnosticKind::SyntaxError,
            function: None,
            line: Some(line),
            message,
        }
    }
}

impl From<&VerifyError> for Diagnostic {
    fn from(error: &VerifyError) -> Self {
        let (kind, message) = match error {
            VerifyError::Declaration { error, .. } => {
                (DiagnosticKind::DeclarationError, error.to_string())
            }
            VerifyError::Type { error, .. } => (DiagnosticKind::TypeError, error.to_string()),
        };
        let at = error.location();
        Diagnostic {
            kind,
            function: at.function.clone(),
            line: at.line,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = Location {
            function: self.function.clone(),
            line: self.line,
        };
        write!(f, "{} in {}: {}", self.kind, at, self.message)
    }
}

/// Result of [`Service::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Compiled {
        handle: ArtifactHandle,
        /// Number of functions in the program.
        functions: usize,
    },
    Rejected(Diagnostic),
    /// A different program already holds this handle. Release it first.
    Collision { handle: ArtifactHandle },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Halted,
    Failed(RuntimeError),
}

/// Everything one run produced. Output written before a failure is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output: String,
    pub outcome: Outcome,
    pub steps: u64,
}

impl From<RunOutput> for RunReport {
    fn from(run: RunOutput) -> Self {
        RunReport {
            output: run.output,
            outcome: match run.result {
                Ok(()) => Outcome::Halted,
                Err(error) => Outcome::Failed(error),
            },
            steps: run.steps,
        }
    }
}

impl RunReport {
    pub fn halted(&self) -> bool {
        self.outcome == Outcome::Halted
    }
}

/// Errors from the service API itself, as opposed to program faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("no artifact with handle {0}")]
    UnknownHandle(ArtifactHandle),

    #[error("no program has been compiled")]
    NothingCompiled,
}

/// A stored executable and the full digest of its text.
#[derive(Debug)]
struct Artifact {
    digest: blake3::Hash,
    exe: Arc<Executable>,
}

/// Compiled artifacts keyed by handle.
#[derive(Debug, Default)]
pub struct Service {
    artifacts: HashMap<ArtifactHandle, Artifact>,
    config: VmConfig,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose runs use `config`.
    pub fn with_config(config: VmConfig) -> Self {
        Self {
            artifacts: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    /// Parse and verify `text`. Stops at the first error.
    pub fn compile(&mut self, text: &str) -> CompileResult {
        let program = match tac_assembler::assemble(text) {
            Ok(program) => program,
            Err(error) => return self.reject(Diagnostic::from(&error)),
        };
        let exe = match tac_verifier::verify(&program) {
            Ok(exe) => exe,
            Err(error) => return self.reject(Diagnostic::from(&error)),
        };

        let digest = blake3::hash(text.as_bytes());
        let handle = ArtifactHandle::from_digest(&digest);
        let functions = exe.routines.len();
        match self.artifacts.entry(handle.clone()) {
            Entry::Occupied(stored) if stored.get().digest != digest => {
                warn!(%handle, "handle collision");
                return CompileResult::Collision { handle };
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(Artifact {
                    digest,
                    exe: Arc::new(exe),
                });
            }
        }
        debug!(%handle, functions, "compiled");
        CompileResult::Compiled { handle, functions }
    }

    /// Drop the artifact behind `handle`. Returns whether one was stored.
    pub fn release(&mut self, handle: &ArtifactHandle) -> bool {
        let released = self.artifacts.remove(handle).is_some();
        debug!(%handle, released, "release");
        released
    }

    fn reject(&self, diagnostic: Diagnostic) -> CompileResult {
        debug!(%diagnostic, "rejected");
        CompileResult::Rejected(diagnostic)
    }

    /// The verified executable behind `handle`.
    pub fn executable(&self, handle: &ArtifactHandle) -> Result<Arc<Executable>, ServiceError> {
        self.artifacts
            .get(handle)
            .map(|artifact| Arc::clone(&artifact.exe))
            .ok_or_else(|| ServiceError::UnknownHandle(handle.clone()))
    }

    /// Run a compiled artifact against `input` with fresh state.
    pub fn execute(&self, handle: &ArtifactHandle, input: &str) -> Result<RunReport, ServiceError> {
        let exe = self.executable(handle)?;
        let report = RunReport::from(tac_vm::run_with_config(&exe, input, self.config));
        debug!(%handle, steps = report.steps, halted = report.halted(), "executed");
        Ok(report)
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Two-step protocol over a [`Service`]: compile a program, stage some
/// input, then run the latest program against the latest input.
#[derive(Debug, Default)]
pub struct Session {
    service: Service,
    current: Option<ArtifactHandle>,
    input: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            service: Service::with_config(config),
            ..Self::default()
        }
    }

    /// Compile `text` and make it the current program.
    ///
    /// A rejected program clears the current one, so a later `run` cannot
    /// silently execute stale code.
    pub fn compile(&mut self, text: &str) -> CompileResult {
        let result = self.service.compile(text);
        self.current = match &result {
            CompileResult::Compiled { handle, .. } => Some(handle.clone()),
            CompileResult::Rejected(_) | CompileResult::Collision { .. } => None,
        };
        result
    }

    /// Replace the staged input.
    pub fn stage_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn current(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    /// Run the current program against the staged input.
    pub fn run(&self) -> Result<RunReport, ServiceError> {
        let handle = self.current.as_ref().ok_or(ServiceError::NothingCompiled)?;
        self.service.execute(handle, &self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: &str = "\
#start_function
void main():
int-list: n
    callr, n, geti
    call, puti, n
#end_function
";

    fn compiled(service: &mut Service, text: &str) -> ArtifactHandle {
        match service.compile(text) {
            CompileResult::Compiled { handle, .. } => handle,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    fn rejected(text: &str) -> Diagnostic {
        match Service::new().compile(text) {
            CompileResult::Rejected(d) => d,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn handle_is_48_bit_hex() {
        let handle = ArtifactHandle::for_text(ECHO);
        assert_eq!(handle.as_str().len(), 12);
        assert!(handle.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(handle, ArtifactHandle::for_text(ECHO));
        assert_ne!(handle, ArtifactHandle::for_text("other"));
    }

    #[test]
    fn compile_twice_reuses_artifact() {
        let mut service = Service::new();
        let a = compiled(&mut service, ECHO);
        let b = compiled(&mut service, ECHO);
        assert_eq!(a, b);
        assert_eq!(service.len(), 1);
    }

    #[test]
    fn execute_many_times_with_fresh_state() {
        let mut service = Service::new();
        let handle = compiled(&mut service, ECHO);
        let first = service.execute(&handle, "7").unwrap();
        let second = service.execute(&handle, "-3").unwrap();
        assert_eq!(first.output, "7");
        assert_eq!(second.output, "-3");
        assert!(first.halted() && second.halted());
        assert_eq!(first.steps, 2);
    }

    #[test]
    fn execute_failure_is_a_report() {
        let mut service = Service::new();
        let handle = compiled(&mut service, ECHO);
        let report = service.execute(&handle, "").unwrap();
        assert_eq!(report.output, "");
        assert!(matches!(report.outcome, Outcome::Failed(ref e) if e.is_io()));
    }

    #[test]
    fn unknown_handle() {
        let service = Service::new();
        let handle = ArtifactHandle::for_text(ECHO);
        assert_eq!(
            service.execute(&handle, ""),
            Err(ServiceError::UnknownHandle(handle))
        );
    }

    #[test]
    fn syntax_diagnostic() {
        let d = rejected("#start_function\nvoid main():\nmov, x, y\n#end_function\n");
        assert_eq!(d.kind, DiagnosticKind::SyntaxError);
        assert_eq!(d.line, Some(3));
        assert_eq!(d.function, None);
        assert_eq!(d.message, "unknown opcode 'mov'");
        assert_eq!(d.to_string(), "syntax error in line 3: unknown opcode 'mov'");
    }

    #[test]
    fn declaration_diagnostic() {
        let d = rejected("#start_function\nvoid main():\nassign, x, 1\n#end_function\n");
        assert_eq!(d.kind, DiagnosticKind::DeclarationError);
        assert_eq!(d.function.as_deref(), Some("main"));
        assert_eq!(d.line, Some(3));
    }

    #[test]
    fn type_diagnostic() {
        let text = "#start_function\nvoid main():\nint-list: n\nassign, n, 1.5\n#end_function\n";
        let d = rejected(text);
        assert_eq!(d.kind, DiagnosticKind::TypeError);
        assert_eq!(d.line, Some(4));
    }

    #[test]
    fn release_forgets_the_artifact() {
        let mut service = Service::new();
        let handle = compiled(&mut service, ECHO);
        assert!(service.release(&handle));
        assert!(service.is_empty());
        assert!(!service.release(&handle));
        assert_eq!(
            service.execute(&handle, "1"),
            Err(ServiceError::UnknownHandle(handle.clone()))
        );

        // Compiling again brings it back under the same handle.
        assert_eq!(compiled(&mut service, ECHO), handle);
    }

    #[test]
    fn handle_collision_is_refused() {
        let mut service = Service::new();
        let other = ECHO.replace("call, puti, n", "call, putc, n");
        let other_handle = compiled(&mut service, &other);
        let other_exe = service.executable(&other_handle).unwrap();

        // Occupy ECHO's handle with a different program's digest.
        let handle = ArtifactHandle::for_text(ECHO);
        service.artifacts.insert(
            handle.clone(),
            Artifact {
                digest: blake3::hash(other.as_bytes()),
                exe: other_exe,
            },
        );

        assert_eq!(
            service.compile(ECHO),
            CompileResult::Collision {
                handle: handle.clone()
            }
        );
        assert!(service.release(&handle));
        assert_eq!(compiled(&mut service, ECHO), handle);
        assert_eq!(service.execute(&handle, "5").unwrap().output, "5");
    }

    #[test]
    fn session_requires_a_program() {
        let session = Session::new();
        assert_eq!(session.run(), Err(ServiceError::NothingCompiled));
    }

    #[test]
    fn session_runs_latest_program_on_latest_input() {
        let mut session = Session::new();
        session.compile(ECHO);
        session.stage_input("1");
        session.stage_input("2");
        assert_eq!(session.run().unwrap().output, "2");

        let doubled = ECHO.replace("call, puti, n", "add, n, n, n\ncall, puti, n");
        session.compile(&doubled);
        assert_eq!(session.run().unwrap().output, "4");
    }

    #[test]
    fn session_rejection_clears_current() {
        let mut session = Session::new();
        session.compile(ECHO);
        assert!(session.current().is_some());
        assert!(matches!(session.compile("junk"), CompileResult::Rejected(_)));
        assert_eq!(session.run(), Err(ServiceError::NothingCompiled));
    }

    #[test]
    fn service_config_applies_to_runs() {
        let text = "#start_function\nvoid main():\ntop:\ngoto, top\n#end_function\n";
        let mut service = Service::with_config(VmConfig {
            instruction_budget: Some(10),
            ..VmConfig::default()
        });
        let handle = compiled(&mut service, text);
        let report = service.execute(&handle, "").unwrap();
        assert!(matches!(
            report.outcome,
            Outcome::Failed(RuntimeError::BudgetExhausted { budget: 10, .. })
        ));
    }
}
